//! Input resolution: normalise a user-supplied path or URL to a local file
//! and decide whether it is a PDF or a DOCX.
//!
//! URLs are downloaded into a `TempDir` that lives as long as the
//! [`ResolvedInput`], so pdfium and docx-rs always get a real path and the
//! download is cleaned up on drop.
//!
//! The kind is decided from the first four bytes, not the extension alone:
//! `%PDF` is a PDF. A ZIP header (`PK\x03\x04`) is accepted as DOCX only when
//! the name ends in `.docx`, since spreadsheets and archives share it.

use crate::error::DocGenError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";
const DOCX_CONTENT_TYPE: &str = "wordprocessingml";

/// Supported source document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Classify a file from its leading bytes and its name.
    pub fn detect(magic: &[u8], path: &Path) -> Option<Self> {
        if magic.starts_with(PDF_MAGIC) {
            return Some(DocumentKind::Pdf);
        }
        let is_docx_name = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
        if magic.starts_with(ZIP_MAGIC) && is_docx_name {
            return Some(DocumentKind::Docx);
        }
        None
    }
}

/// The resolved input: a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local { path: PathBuf, kind: DocumentKind },
    /// Input was a URL, downloaded to a temp directory that is kept alive
    /// until processing completes.
    Downloaded {
        path: PathBuf,
        kind: DocumentKind,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } | ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            ResolvedInput::Local { kind, .. } | ResolvedInput::Downloaded { kind, .. } => *kind,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF or DOCX file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, DocGenError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and magic bytes.
pub fn resolve_local(path_str: &str) -> Result<ResolvedInput, DocGenError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(DocGenError::FileNotFound { path });
    }

    let mut magic = [0u8; 4];
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            // Files shorter than four bytes keep the zero padding and are rejected below.
            let _ = f.read(&mut magic);
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DocGenError::PermissionDenied { path });
        }
        Err(_) => return Err(DocGenError::FileNotFound { path }),
    }

    let kind = DocumentKind::detect(&magic, &path)
        .ok_or_else(|| DocGenError::UnsupportedFormat {
            path: path.clone(),
            magic,
        })?;

    debug!("Resolved local {:?}: {}", kind, path.display());
    Ok(ResolvedInput::Local { path, kind })
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, DocGenError> {
    info!("Downloading document from: {}", url);

    let failed = |reason: String| DocGenError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            DocGenError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let filename = extract_filename(url, &content_type);

    let temp_dir = TempDir::new().map_err(|e| DocGenError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| DocGenError::Internal(format!("Failed to write temp file: {}", e)))?;

    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    let kind = DocumentKind::detect(&magic, &file_path).ok_or(DocGenError::UnsupportedFormat {
        path: file_path.clone(),
        magic,
    })?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        kind,
        _temp_dir: temp_dir,
    })
}

/// Pick a file name from the last URL path segment, falling back on the
/// response content type.
fn extract_filename(url: &str, content_type: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    if content_type.contains(DOCX_CONTENT_TYPE) {
        "downloaded.docx".to_string()
    } else {
        "downloaded.pdf".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.docx"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn detect_by_magic_and_name() {
        let pdf = Path::new("a.bin");
        let docx = Path::new("plan.DOCX");
        assert_eq!(DocumentKind::detect(b"%PDF-1.7", pdf), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::detect(b"PK\x03\x04", docx), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::detect(b"PK\x03\x04", Path::new("sheet.xlsx")), None);
        assert_eq!(DocumentKind::detect(b"GIF8", docx), None);
    }

    #[test]
    fn filename_from_url_or_content_type() {
        assert_eq!(
            extract_filename("https://example.com/files/plan.docx?x=1", ""),
            "plan.docx"
        );
        assert_eq!(
            extract_filename(
                "https://example.com/download",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            "downloaded.docx"
        );
        assert_eq!(extract_filename("https://example.com/", "application/pdf"), "downloaded.pdf");
    }

    #[test]
    fn local_resolution_checks_existence_and_kind() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.pdf");
        assert!(matches!(
            resolve_local(missing.to_str().unwrap()),
            Err(DocGenError::FileNotFound { .. })
        ));

        let text = tmp.path().join("notes.txt");
        std::fs::write(&text, b"hello").unwrap();
        assert!(matches!(
            resolve_local(text.to_str().unwrap()),
            Err(DocGenError::UnsupportedFormat { magic, .. }) if &magic == b"hell"
        ));

        let pdf = tmp.path().join("plan.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();
        let resolved = resolve_local(pdf.to_str().unwrap()).unwrap();
        assert_eq!(resolved.kind(), DocumentKind::Pdf);
        assert_eq!(resolved.path(), pdf.as_path());
    }
}
