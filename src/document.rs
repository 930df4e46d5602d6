//! Document loading: type sniffing and PDF page rasterization.
//!
//! A byte stream starting with `%PDF` is rasterized page-by-page via
//! pdfium; anything else is treated as a single-page image and passed
//! through untouched. Staging to disk happens later, per selected page.

use crate::error::OcrError;
use crate::schema::DocumentKind;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Rendering resolution for PDF pages handed to the OCR engine.
pub const RENDER_DPI: f32 = 200.0;

/// One page of a loaded document, not yet staged to disk.
#[derive(Debug)]
pub enum PageImage {
    /// Original upload bytes, written verbatim when staged.
    Raw(Vec<u8>),
    /// A rasterized PDF page, staged as PNG.
    Rendered(DynamicImage),
}

impl PageImage {
    /// Write the page into the request's staging directory and return the
    /// file path. The OCR engine requires path-addressable input.
    pub fn stage(&self, dir: &Path, page_number: u32) -> Result<PathBuf, OcrError> {
        match self {
            PageImage::Raw(bytes) => {
                let ext = image::guess_format(bytes)
                    .ok()
                    .and_then(|f| f.extensions_str().first().copied())
                    .unwrap_or("bin");
                let path = dir.join(format!("page_{:04}.{}", page_number, ext));
                std::fs::write(&path, bytes)
                    .map_err(|e| OcrError::Unexpected(anyhow::anyhow!("staging failed: {}", e)))?;
                Ok(path)
            }
            PageImage::Rendered(img) => {
                let path = dir.join(format!("page_{:04}.png", page_number));
                img.save(&path)
                    .map_err(|e| OcrError::Unexpected(anyhow::anyhow!("staging failed: {}", e)))?;
                Ok(path)
            }
        }
    }
}

/// A loaded document: detected kind plus its pages in document order.
#[derive(Debug)]
pub struct LoadedDocument {
    pub kind: DocumentKind,
    pub pages: Vec<PageImage>,
}

/// True when the byte stream carries the `%PDF` magic.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] == PDF_MAGIC
}

/// Detect the document type and, for PDFs, rasterize every page at
/// [`RENDER_DPI`]. Blocking; callers run this off the async runtime.
pub fn load(bytes: &[u8]) -> Result<LoadedDocument, OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::InvalidInput("empty file".into()));
    }

    if !is_pdf(bytes) {
        return Ok(LoadedDocument {
            kind: DocumentKind::Image,
            pages: vec![PageImage::Raw(bytes.to_vec())],
        });
    }

    let pdfium = Pdfium::new(
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| OcrError::Unexpected(anyhow::anyhow!("pdfium unavailable: {}", e)))?,
    );

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| OcrError::Conversion(e.to_string()))?;

    let mut pages = Vec::with_capacity(document.pages().len() as usize);
    for page in document.pages().iter() {
        let target_width = (page.width().value / 72.0 * RENDER_DPI).round() as i32;
        let config = PdfRenderConfig::new().set_target_width(target_width);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| OcrError::Conversion(e.to_string()))?;
        pages.push(PageImage::Rendered(bitmap.as_image()));
    }

    tracing::debug!("rasterized {} PDF pages at {} dpi", pages.len(), RENDER_DPI);

    Ok(LoadedDocument {
        kind: DocumentKind::Pdf,
        pages,
    })
}
