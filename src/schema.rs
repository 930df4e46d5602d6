//! Data model and response envelope types.
//!
//! The internal pipeline always carries full per-line detail; the
//! `include_confidence` / `include_coordinates` flags only gate what the
//! serialized envelope shows.

use serde::Serialize;

/// One recognized text line. Confidence is normalized to `[0, 1]`;
/// `bbox` holds the four corner points of the line's bounding box in
/// image coordinates.
#[derive(Debug, Clone)]
pub struct OcrLine {
    pub text: String,
    pub confidence: f64,
    pub bbox: Option<[(f32, f32); 4]>,
}

/// OCR output for one document page (always 1-indexed).
#[derive(Debug, Clone)]
pub struct PageResult {
    pub page_number: u32,
    pub lines: Vec<OcrLine>,
    pub combined_text: String,
    /// Set when the engine failed on this page; remaining pages still run.
    pub error: Option<String>,
}

impl PageResult {
    pub fn from_lines(page_number: u32, lines: Vec<OcrLine>) -> Self {
        let combined_text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            page_number,
            lines,
            combined_text,
            error: None,
        }
    }

    pub fn failed(page_number: u32, message: String) -> Self {
        Self {
            page_number,
            lines: Vec::new(),
            combined_text: String::new(),
            error: Some(message),
        }
    }
}

/// Detected input type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Image => "image",
            DocumentKind::Pdf => "pdf",
        }
    }
}

/// Aggregated OCR output for the whole document.
#[derive(Debug, Clone)]
pub struct DocumentResult {
    pub kind: DocumentKind,
    pub total_pages: u32,
    pub pages: Vec<PageResult>,
    pub combined_text: String,
    pub average_confidence: f64,
}

impl DocumentResult {
    /// Build the document-level view from per-page results: page texts
    /// joined by a blank line, average confidence over every line across
    /// all pages (0.0 when nothing was recognized).
    pub fn assemble(kind: DocumentKind, total_pages: u32, pages: Vec<PageResult>) -> Self {
        let combined_text = pages
            .iter()
            .map(|p| p.combined_text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut sum = 0.0;
        let mut count = 0usize;
        for page in &pages {
            for line in &page.lines {
                sum += line.confidence;
                count += 1;
            }
        }
        let average_confidence = if count == 0 { 0.0 } else { sum / count as f64 };

        Self {
            kind,
            total_pages,
            pages,
            combined_text,
            average_confidence,
        }
    }
}

// ── Response envelope ───────────────────────────────────────────────────────

/// `GET /` payload.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub features: Vec<&'static str>,
}

/// `GET /health` payload.
#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: u64,
    pub ocr_instances_loaded: usize,
}

/// `GET /languages` entry.
#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LineReport {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<[f32; 2]>>,
}

#[derive(Debug, Serialize)]
pub struct PageReport {
    pub page_number: u32,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<LineReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /ocr` success envelope.
#[derive(Debug, Serialize)]
pub struct OcrResponse {
    pub success: bool,
    pub request_id: String,
    pub text: String,
    pub pages_processed: usize,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub pages: Vec<PageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Envelope-shaping flags from the request form.
#[derive(Debug, Clone, Copy)]
pub struct ResponseOptions {
    pub include_confidence: bool,
    pub include_coordinates: bool,
}

impl OcrResponse {
    /// Shape the serialized envelope from the internal document result.
    /// Per-line detail is omitted entirely when neither confidence nor
    /// coordinates were requested; combined text and averages are always
    /// computed from the full data.
    pub fn shape(
        document: &DocumentResult,
        opts: ResponseOptions,
        request_id: String,
        processing_time_ms: u64,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        let pages = document
            .pages
            .iter()
            .map(|page| {
                let confidence = if opts.include_confidence && !page.lines.is_empty() {
                    let sum: f64 = page.lines.iter().map(|l| l.confidence).sum();
                    Some(sum / page.lines.len() as f64)
                } else {
                    None
                };

                let lines = if opts.include_confidence || opts.include_coordinates {
                    Some(
                        page.lines
                            .iter()
                            .map(|line| LineReport {
                                text: line.text.clone(),
                                confidence: opts.include_confidence.then_some(line.confidence),
                                bbox: if opts.include_coordinates {
                                    line.bbox.map(|b| b.iter().map(|&(x, y)| [x, y]).collect())
                                } else {
                                    None
                                },
                            })
                            .collect(),
                    )
                } else {
                    None
                };

                PageReport {
                    page_number: page.page_number,
                    text: page.combined_text.clone(),
                    confidence,
                    lines,
                    error: page.error.clone(),
                }
            })
            .collect::<Vec<_>>();

        Self {
            success: true,
            request_id,
            text: document.combined_text.clone(),
            pages_processed: document.pages.len(),
            processing_time_ms,
            confidence: opts.include_confidence.then_some(document.average_confidence),
            pages,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, confidence: f64) -> OcrLine {
        OcrLine {
            text: text.to_string(),
            confidence,
            bbox: Some([(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]),
        }
    }

    #[test]
    fn test_page_combined_text_joins_with_newline() {
        let page = PageResult::from_lines(1, vec![line("hello", 0.9), line("world", 0.8)]);
        assert_eq!(page.combined_text, "hello\nworld");
        assert!(page.error.is_none());
    }

    #[test]
    fn test_average_confidence() {
        let pages = vec![PageResult::from_lines(1, vec![line("a", 0.9), line("b", 0.8)])];
        let doc = DocumentResult::assemble(DocumentKind::Image, 1, pages);
        assert!((doc.average_confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_average_confidence_spans_pages() {
        let pages = vec![
            PageResult::from_lines(1, vec![line("a", 1.0)]),
            PageResult::from_lines(2, vec![line("b", 0.5), line("c", 0.5)]),
        ];
        let doc = DocumentResult::assemble(DocumentKind::Pdf, 2, pages);
        assert!((doc.average_confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_confidence_zero_when_no_lines() {
        let doc = DocumentResult::assemble(
            DocumentKind::Pdf,
            3,
            vec![PageResult::from_lines(1, vec![])],
        );
        assert_eq!(doc.average_confidence, 0.0);
    }

    #[test]
    fn test_document_text_joins_pages_with_blank_line() {
        let pages = vec![
            PageResult::from_lines(1, vec![line("page one", 0.9)]),
            PageResult::from_lines(2, vec![line("page two", 0.9)]),
        ];
        let doc = DocumentResult::assemble(DocumentKind::Pdf, 2, pages);
        assert_eq!(doc.combined_text, "page one\n\npage two");
    }

    #[test]
    fn test_shape_gates_per_line_detail() {
        let doc = DocumentResult::assemble(
            DocumentKind::Image,
            1,
            vec![PageResult::from_lines(1, vec![line("x", 0.7)])],
        );

        let bare = OcrResponse::shape(
            &doc,
            ResponseOptions {
                include_confidence: false,
                include_coordinates: false,
            },
            "req_1".into(),
            5,
            None,
        );
        assert!(bare.confidence.is_none());
        assert!(bare.pages[0].lines.is_none());
        // combined text still computed from all lines
        assert_eq!(bare.text, "x");

        let full = OcrResponse::shape(
            &doc,
            ResponseOptions {
                include_confidence: true,
                include_coordinates: true,
            },
            "req_2".into(),
            5,
            None,
        );
        assert_eq!(full.confidence, Some(0.7));
        let lines = full.pages[0].lines.as_ref().unwrap();
        assert_eq!(lines[0].confidence, Some(0.7));
        assert_eq!(lines[0].bbox.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn test_shape_omits_bbox_without_coordinates() {
        let doc = DocumentResult::assemble(
            DocumentKind::Image,
            1,
            vec![PageResult::from_lines(1, vec![line("x", 0.7)])],
        );
        let resp = OcrResponse::shape(
            &doc,
            ResponseOptions {
                include_confidence: true,
                include_coordinates: false,
            },
            "req".into(),
            1,
            None,
        );
        let lines = resp.pages[0].lines.as_ref().unwrap();
        assert_eq!(lines[0].confidence, Some(0.7));
        assert!(lines[0].bbox.is_none());
    }

    #[test]
    fn test_failed_page_carries_error_marker() {
        let doc = DocumentResult::assemble(
            DocumentKind::Pdf,
            2,
            vec![
                PageResult::from_lines(1, vec![line("ok", 0.9)]),
                PageResult::failed(2, "engine choked".into()),
            ],
        );
        let resp = OcrResponse::shape(
            &doc,
            ResponseOptions {
                include_confidence: true,
                include_coordinates: false,
            },
            "req".into(),
            1,
            None,
        );
        assert_eq!(resp.pages[1].error.as_deref(), Some("engine choked"));
        assert_eq!(resp.pages_processed, 2);
        // failed page contributes no lines to the average
        assert_eq!(resp.confidence, Some(0.9));
    }
}
