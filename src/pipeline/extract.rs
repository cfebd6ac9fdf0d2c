//! Text extraction from resolved inputs.
//!
//! PDF text comes from pdfium's text layer, one page at a time, pages joined
//! by a blank line. Scanned PDFs without a text layer yield empty text; that
//! is passed on as-is. DOCX text is one line per paragraph.
//!
//! Both paths are blocking and run inside `spawn_blocking`.

use crate::error::DocGenError;
use crate::pipeline::input::{DocumentKind, ResolvedInput};
use crate::render::docx;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extract the plain text of `input`.
pub async fn extract_text(
    input: &ResolvedInput,
    pdfium_library: Option<&Path>,
) -> Result<String, DocGenError> {
    let path = input.path().to_path_buf();
    let kind = input.kind();
    let library = pdfium_library.map(Path::to_path_buf);

    let text = tokio::task::spawn_blocking(move || match kind {
        DocumentKind::Pdf => extract_pdf_blocking(&path, library.as_deref()),
        DocumentKind::Docx => extract_docx_blocking(&path),
    })
    .await
    .map_err(|e| DocGenError::Internal(format!("Extraction task panicked: {}", e)))??;

    info!("Extracted {} chars from {}", text.chars().count(), input.path().display());
    Ok(text)
}

fn extract_pdf_blocking(path: &Path, library: Option<&Path>) -> Result<String, DocGenError> {
    let failed = |detail: String| DocGenError::ExtractionFailed {
        path: path.to_path_buf(),
        detail,
    };

    let pdfium = crate::pdfium::bind(library)
        .map_err(|e| failed(format!("pdfium library not available: {:?}", e)))?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| failed(format!("{:?}", e)))?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| failed(format!("page {}: {:?}", idx + 1, e)))?
            .all();
        debug!("Page {}: {} chars", idx + 1, text.len());
        pages.push(text);
    }
    Ok(pages.join("\n\n"))
}

fn extract_docx_blocking(path: &Path) -> Result<String, DocGenError> {
    let bytes = std::fs::read(path).map_err(|e| read_error(path.to_path_buf(), e))?;
    docx::extract_text(&bytes).map_err(|e| DocGenError::ExtractionFailed {
        path: path.to_path_buf(),
        detail: format!("docx parse error: {:?}", e),
    })
}

fn read_error(path: PathBuf, e: std::io::Error) -> DocGenError {
    match e.kind() {
        std::io::ErrorKind::NotFound => DocGenError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => DocGenError::PermissionDenied { path },
        _ => DocGenError::ExtractionFailed {
            path,
            detail: e.to_string(),
        },
    }
}
