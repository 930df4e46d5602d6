//! Per-page OCR execution and document-level aggregation.
//!
//! Pages are processed in the order the selector produced. A page whose
//! recognition fails gets an error marker in its result and processing
//! continues; one bad page never aborts the document.

use crate::document::{LoadedDocument, PageImage};
use crate::engine::{Language, Recognizer};
use crate::error::OcrError;
use crate::schema::{DocumentResult, PageResult};
use std::path::Path;

/// Run OCR over the selected pages of a loaded document. Blocking;
/// callers run this off the async runtime.
pub fn aggregate<R: Recognizer>(
    recognizer: &R,
    document: &LoadedDocument,
    selected_pages: &[u32],
    language: &Language,
    auto_rotate: bool,
    staging_dir: &Path,
) -> Result<DocumentResult, OcrError> {
    let total_pages = document.pages.len() as u32;
    let mut pages = Vec::with_capacity(selected_pages.len());

    for &page_number in selected_pages {
        let Some(page_image) = page_image(document, page_number) else {
            // selector output is already bounds-checked; a miss here is a bug
            return Err(OcrError::Unexpected(anyhow::anyhow!(
                "selected page {} out of range (document has {})",
                page_number,
                total_pages
            )));
        };

        let path = page_image.stage(staging_dir, page_number)?;
        match recognizer.recognize(language, &path, auto_rotate) {
            Ok(lines) => {
                tracing::debug!("page {}: {} lines recognized", page_number, lines.len());
                pages.push(PageResult::from_lines(page_number, lines));
            }
            Err(err) => {
                tracing::warn!("page {} failed: {}", page_number, err);
                pages.push(PageResult::failed(page_number, err.to_string()));
            }
        }
    }

    Ok(DocumentResult::assemble(document.kind, total_pages, pages))
}

fn page_image(document: &LoadedDocument, page_number: u32) -> Option<&PageImage> {
    document.pages.get(page_number.checked_sub(1)? as usize)
}
