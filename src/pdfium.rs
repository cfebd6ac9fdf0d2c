//! Binding to the pdfium shared library.
//!
//! `Pdfium::default()` panics when the library is missing. Extraction needs
//! an error it can report, and PDF conversion needs to degrade quietly, so
//! every caller binds through [`bind`] instead.
//!
//! Lookup order when no explicit path is configured:
//! `PDFIUM_LIB_PATH`, the current directory, then the system library path.
//! A path may name the library file itself or the directory holding it.

use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a pdfium library file or directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind pdfium, using only `explicit` when it is given.
pub fn bind(explicit: Option<&Path>) -> Result<Pdfium, PdfiumError> {
    let bindings = match explicit {
        Some(path) => Pdfium::bind_to_library(&library_file(path))?,
        None => bind_default()?,
    };
    Ok(Pdfium::new(bindings))
}

fn bind_default() -> Result<Box<dyn PdfiumLibraryBindings>, PdfiumError> {
    if let Some(path) = std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        let path = library_file(Path::new(&path));
        debug!("Binding pdfium from {}={}", PDFIUM_LIB_PATH_ENV, path.display());
        if let Ok(bindings) = Pdfium::bind_to_library(&path) {
            return Ok(bindings);
        }
    }
    Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
}

fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}
