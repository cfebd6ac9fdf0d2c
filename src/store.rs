//! File storage for uploads and rendered artifacts.
//!
//! An [`ArtifactStore`] owns one directory. Rendered files are named
//! `{base}_{n}.{ext}` where `n` is one more than the largest number already
//! used by any file with that base name, whatever its extension. That keeps a
//! DOCX and the PDF derived from it on the same number.
//!
//! ## Sequence allocation under concurrency
//!
//! Two guards make allocation race-free:
//!
//! 1. a mutex per base name, held while scanning and reserving, so renders in
//!    the same process queue up instead of colliding;
//! 2. the target file is opened with `create_new`, so a name taken by another
//!    process (or another store over the same directory) is detected and the
//!    next number is tried.

use crate::error::{DocGenError, RenderError};
use crate::output::ArtifactInfo;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Names tried after the scanned maximum before giving up.
const MAX_RESERVE_ATTEMPTS: u32 = 64;

/// Fallback base name when sanitising leaves nothing.
const DEFAULT_BASE_NAME: &str = "document";

/// A directory of stored files.
#[derive(Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Next free sequence number for `base`: `max(existing) + 1`, or 1.
    ///
    /// A missing directory counts as empty.
    pub fn next_sequence(&self, base: &str) -> Result<u32, RenderError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(1),
            Err(source) => {
                return Err(RenderError::Scan {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut max = 0u32;
        for entry in entries {
            let entry = entry.map_err(|source| RenderError::Scan {
                path: self.dir.clone(),
                source,
            })?;
            if let Some(n) = sequence_of(&entry.path(), base) {
                max = max.max(n);
            }
        }
        Ok(max.saturating_add(1))
    }

    /// Write `bytes` to `{base}_{n}.{extension}` with a freshly allocated `n`.
    ///
    /// `base` must already be sanitised (see [`sanitize_base_name`]).
    pub fn persist(&self, base: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(&self.dir).map_err(|source| RenderError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let lock = self.base_lock(base);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut seq = self.next_sequence(base)?;
        for _ in 0..MAX_RESERVE_ATTEMPTS {
            let path = self.dir.join(format!("{base}_{seq}.{extension}"));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Err(source) = file.write_all(bytes).and_then(|_| file.sync_all()) {
                        let _ = fs::remove_file(&path);
                        return Err(RenderError::Write { path, source });
                    }
                    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} already taken, trying next number", path.display());
                    seq = seq.saturating_add(1);
                }
                Err(source) => return Err(RenderError::Write { path, source }),
            }
        }

        Err(RenderError::SequenceExhausted {
            base: base.to_string(),
            attempts: MAX_RESERVE_ATTEMPTS,
        })
    }

    /// All regular files in the directory, sorted by name.
    ///
    /// A missing directory is created and reported as empty.
    pub fn list(&self) -> Result<Vec<ArtifactInfo>, DocGenError> {
        self.ensure_dir()?;
        let entries = fs::read_dir(&self.dir).map_err(|source| self.storage_err(source))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| self.storage_err(source))?;
            let path = entry.path();
            if path.is_file() {
                files.push(file_info(&path));
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Delete the file called `name`. Returns `false` if it did not exist.
    pub fn delete(&self, name: &str) -> Result<bool, DocGenError> {
        let path = self.resolve_name(name)?;
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| DocGenError::Storage {
            path: path.clone(),
            source,
        })?;
        info!("Deleted {}", path.display());
        Ok(true)
    }

    /// Remove files last modified more than `older_than` ago.
    ///
    /// Returns the names that were removed.
    pub fn clean(&self, older_than: Duration) -> Result<Vec<String>, DocGenError> {
        let now = SystemTime::now();
        let mut removed = Vec::new();
        for info in self.list()? {
            let modified = fs::metadata(&info.path)
                .and_then(|m| m.modified())
                .map_err(|source| DocGenError::Storage {
                    path: info.path.clone(),
                    source,
                })?;
            let age = now.duration_since(modified).unwrap_or_default();
            if age > older_than {
                match fs::remove_file(&info.path) {
                    Ok(()) => removed.push(info.name),
                    Err(e) => warn!("Could not remove {}: {}", info.path.display(), e),
                }
            }
        }
        if !removed.is_empty() {
            info!("Cleaned {} files from {}", removed.len(), self.dir.display());
        }
        Ok(removed)
    }

    /// Copy `source` into the store under its own file name, replacing any
    /// file of the same name.
    pub fn save_upload(&self, source: &Path) -> Result<ArtifactInfo, DocGenError> {
        if !source.is_file() {
            return Err(DocGenError::FileNotFound {
                path: source.to_path_buf(),
            });
        }
        let name = source
            .file_name()
            .ok_or_else(|| DocGenError::InvalidInput {
                input: source.display().to_string(),
            })?;
        self.ensure_dir()?;
        let dest = self.dir.join(name);
        fs::copy(source, &dest).map_err(|e| DocGenError::Storage {
            path: dest.clone(),
            source: e,
        })?;
        info!("Stored upload {}", dest.display());
        Ok(file_info(&dest))
    }

    fn ensure_dir(&self) -> Result<(), DocGenError> {
        fs::create_dir_all(&self.dir).map_err(|source| self.storage_err(source))
    }

    fn storage_err(&self, source: std::io::Error) -> DocGenError {
        DocGenError::Storage {
            path: self.dir.clone(),
            source,
        }
    }

    /// Map a bare file name to a path inside the store.
    fn resolve_name(&self, name: &str) -> Result<PathBuf, DocGenError> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && Path::new(name).file_name().is_some();
        if !plain {
            return Err(DocGenError::InvalidArtifactName {
                name: name.to_string(),
            });
        }
        Ok(self.dir.join(name))
    }

    fn base_lock(&self, base: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(base.to_string()).or_default())
    }
}

/// Turn a user-supplied name into a safe base name: directories and the
/// extension are dropped, spaces become underscores.
pub fn sanitize_base_name(requested: &str) -> String {
    let stem = Path::new(requested.trim())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = stem.trim().replace(' ', "_");
    if name.is_empty() {
        DEFAULT_BASE_NAME.to_string()
    } else {
        name
    }
}

/// The `n` in `{base}_{n}.{ext}`, if `path` has that shape.
fn sequence_of(path: &Path, base: &str) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix(base)?.strip_prefix('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn file_info(path: &Path) -> ArtifactInfo {
    let metadata = fs::metadata(path).ok();
    ArtifactInfo {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: path.to_path_buf(),
        size: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
        kind: path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase()),
        modified: metadata
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Local>::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn sanitize_strips_extension_and_spaces() {
        assert_eq!(sanitize_base_name("master document.docx"), "master_document");
        assert_eq!(sanitize_base_name("plans/county plan.pdf"), "county_plan");
        assert_eq!(sanitize_base_name("final_output"), "final_output");
        assert_eq!(sanitize_base_name("   "), "document");
        assert_eq!(sanitize_base_name(""), "document");
    }

    #[test]
    fn sequence_parsing_requires_exact_base() {
        assert_eq!(sequence_of(Path::new("X_3.docx"), "X"), Some(3));
        assert_eq!(sequence_of(Path::new("X_12.pdf"), "X"), Some(12));
        assert_eq!(sequence_of(Path::new("X_Y_2.docx"), "X"), None);
        assert_eq!(sequence_of(Path::new("XY_2.docx"), "X"), None);
        assert_eq!(sequence_of(Path::new("X_.docx"), "X"), None);
        assert_eq!(sequence_of(Path::new("X_+4.docx"), "X"), None);
        assert_eq!(sequence_of(Path::new("X_Y_2.docx"), "X_Y"), Some(2));
    }

    #[test]
    fn next_sequence_on_missing_dir_is_one() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path().join("missing"));
        assert_eq!(store.next_sequence("X").unwrap(), 1);
    }

    #[test]
    fn next_sequence_follows_the_maximum() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "X_3.docx");
        touch(tmp.path(), "X_7.pdf");
        touch(tmp.path(), "Y_40.docx");
        let store = ArtifactStore::new(tmp.path());
        assert_eq!(store.next_sequence("X").unwrap(), 8);
        assert_eq!(store.next_sequence("Y").unwrap(), 41);
        assert_eq!(store.next_sequence("Z").unwrap(), 1);
    }

    #[test]
    fn persist_allocates_increasing_names() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path().join("out"));
        let a = store.persist("brief", "docx", b"one").unwrap();
        let b = store.persist("brief", "docx", b"two").unwrap();
        assert_eq!(a.file_name().unwrap(), "brief_1.docx");
        assert_eq!(b.file_name().unwrap(), "brief_2.docx");
        assert_eq!(fs::read(&b).unwrap(), b"two");
    }

    #[test]
    fn list_delete_and_reject_traversal() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.pdf");
        touch(tmp.path(), "a.docx");
        fs::create_dir(tmp.path().join("nested")).unwrap();
        let store = ArtifactStore::new(tmp.path());

        let names: Vec<_> = store.list().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["a.docx", "b.pdf"]);
        let info = &store.list().unwrap()[0];
        assert_eq!(info.kind.as_deref(), Some("docx"));
        assert_eq!(info.size, 1);

        assert!(store.delete("a.docx").unwrap());
        assert!(!store.delete("a.docx").unwrap());
        assert!(matches!(
            store.delete("../etc/passwd"),
            Err(DocGenError::InvalidArtifactName { .. })
        ));
        assert!(matches!(
            store.delete(".."),
            Err(DocGenError::InvalidArtifactName { .. })
        ));
    }

    #[test]
    fn clean_respects_age() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "fresh.docx");
        let store = ArtifactStore::new(tmp.path());
        assert!(store.clean(Duration::from_secs(3600)).unwrap().is_empty());
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.clean(Duration::ZERO).unwrap(), vec!["fresh.docx"]);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn save_upload_copies_by_name() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("plan.docx");
        fs::write(&src, b"PK").unwrap();
        let store = ArtifactStore::new(tmp.path().join("uploads"));
        let info = store.save_upload(&src).unwrap();
        assert_eq!(info.name, "plan.docx");
        assert!(info.path.starts_with(tmp.path().join("uploads")));
        assert!(matches!(
            store.save_upload(&tmp.path().join("nope.pdf")),
            Err(DocGenError::FileNotFound { .. })
        ));
    }
}
