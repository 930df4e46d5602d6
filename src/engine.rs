//! Tesseract engine adapter.
//!
//! Engine construction is expensive, so one instance is cached per
//! language code for the lifetime of the process. Lookup-or-create runs
//! under the cache lock, so concurrent first requests for the same
//! language never build duplicates. Recognition itself is blocking and is
//! always called from `spawn_blocking`.

use crate::error::OcrError;
use crate::schema::OcrLine;
use leptess::{LepTess, Variable};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A supported OCR language: API code, display name, and the Tesseract
/// traineddata name it maps to.
#[derive(Debug, Clone, Copy)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub traineddata: &'static str,
}

pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English", traineddata: "eng" },
    Language { code: "fr", name: "French", traineddata: "fra" },
    Language { code: "de", name: "German", traineddata: "deu" },
    Language { code: "es", name: "Spanish", traineddata: "spa" },
    Language { code: "pt", name: "Portuguese", traineddata: "por" },
    Language { code: "it", name: "Italian", traineddata: "ita" },
    Language { code: "nl", name: "Dutch", traineddata: "nld" },
    Language { code: "ru", name: "Russian", traineddata: "rus" },
    Language { code: "ar", name: "Arabic", traineddata: "ara" },
    Language { code: "ja", name: "Japanese", traineddata: "jpn" },
    Language { code: "ko", name: "Korean", traineddata: "kor" },
    Language { code: "ch", name: "Chinese (Simplified)", traineddata: "chi_sim" },
];

/// Look up a language by its API code.
pub fn resolve_language(code: &str) -> Result<&'static Language, OcrError> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|l| l.code == code)
        .ok_or_else(|| OcrError::InvalidInput(format!("unsupported language: {}", code)))
}

/// Seam between the aggregator and the engine, so tests can substitute a
/// fake recognizer.
pub trait Recognizer {
    fn recognize(
        &self,
        language: &Language,
        image_path: &Path,
        auto_rotate: bool,
    ) -> Result<Vec<OcrLine>, OcrError>;
}

/// A cached Tesseract handle.
struct Engine(LepTess);

// SAFETY: `LepTess` is not auto-`Send` only because it wraps raw
// `TessBaseAPI`/`Pix` pointers. Those are heap allocations with no
// thread affinity (no thread-local state in the C API), so moving the
// handle between threads is sound; all access goes through the
// surrounding `Mutex`, which rules out concurrent use.
unsafe impl Send for Engine {}

/// Process-wide engine registry, keyed by language code.
pub struct EngineCache {
    datapath: Option<String>,
    engines: Mutex<HashMap<&'static str, Arc<Mutex<Engine>>>>,
}

impl EngineCache {
    /// `datapath` points at the tessdata directory; `None` uses the
    /// system default.
    pub fn new(datapath: Option<String>) -> Self {
        Self {
            datapath,
            engines: Mutex::new(HashMap::new()),
        }
    }

    /// Number of engine instances constructed so far (for `/health`).
    pub fn loaded_count(&self) -> usize {
        self.engines.lock().unwrap().len()
    }

    /// Return the cached engine for a language, constructing it on first
    /// use. The map lock is held across construction, which serializes
    /// concurrent first requests for the same language.
    fn get_or_init(&self, language: &Language) -> Result<Arc<Mutex<Engine>>, OcrError> {
        let mut engines = self.engines.lock().unwrap();
        if let Some(engine) = engines.get(language.code) {
            return Ok(Arc::clone(engine));
        }

        tracing::info!(
            "initializing OCR engine for language '{}' ({})",
            language.code,
            language.traineddata
        );
        let lt = LepTess::new(self.datapath.as_deref(), language.traineddata)
            .map_err(|e| OcrError::Engine(format!("engine init failed: {}", e)))?;
        let engine = Arc::new(Mutex::new(Engine(lt)));
        engines.insert(language.code, Arc::clone(&engine));
        Ok(engine)
    }
}

impl Recognizer for EngineCache {
    fn recognize(
        &self,
        language: &Language,
        image_path: &Path,
        auto_rotate: bool,
    ) -> Result<Vec<OcrLine>, OcrError> {
        let engine = self.get_or_init(language)?;
        let mut guard = engine.lock().unwrap();
        let lt = &mut guard.0;

        // PSM 1 = automatic with orientation/script detection, 3 = automatic
        let psm = if auto_rotate { "1" } else { "3" };
        lt.set_variable(Variable::TesseditPagesegMode, psm)
            .map_err(|e| OcrError::Engine(e.to_string()))?;

        lt.set_image(image_path)
            .map_err(|e| OcrError::Engine(format!("could not read image: {}", e)))?;

        let tsv = lt
            .get_tsv_text(0)
            .map_err(|e| OcrError::Engine(e.to_string()))?;

        Ok(parse_tsv(&tsv))
    }
}

/// Parse Tesseract TSV output into per-line results.
///
/// TSV rows carry `level page block par line word left top width height
/// conf text`; level 4 opens a text line with its bounding box, level 5
/// rows are the words within it. Line confidence is the mean word
/// confidence rescaled from Tesseract's 0-100 to `[0, 1]`.
pub fn parse_tsv(tsv: &str) -> Vec<OcrLine> {
    struct CurrentLine {
        bbox: Option<[(f32, f32); 4]>,
        words: Vec<String>,
        conf_sum: f64,
        conf_count: usize,
    }

    let mut lines = Vec::new();
    let mut current: Option<CurrentLine> = None;

    let flush = |cur: Option<CurrentLine>, out: &mut Vec<OcrLine>| {
        if let Some(cur) = cur {
            if !cur.words.is_empty() {
                let confidence = if cur.conf_count == 0 {
                    0.0
                } else {
                    (cur.conf_sum / cur.conf_count as f64) / 100.0
                };
                out.push(OcrLine {
                    text: cur.words.join(" "),
                    confidence,
                    bbox: cur.bbox,
                });
            }
        }
    };

    for row in tsv.lines() {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        let level = cols[0];
        if level == "level" {
            continue; // header
        }

        match level {
            "4" => {
                flush(current.take(), &mut lines);
                let bbox = match (
                    cols[6].parse::<f32>(),
                    cols[7].parse::<f32>(),
                    cols[8].parse::<f32>(),
                    cols[9].parse::<f32>(),
                ) {
                    (Ok(left), Ok(top), Ok(width), Ok(height)) => Some([
                        (left, top),
                        (left + width, top),
                        (left + width, top + height),
                        (left, top + height),
                    ]),
                    _ => None,
                };
                current = Some(CurrentLine {
                    bbox,
                    words: Vec::new(),
                    conf_sum: 0.0,
                    conf_count: 0,
                });
            }
            "5" => {
                let text = cols[11].trim();
                if text.is_empty() {
                    continue;
                }
                if let Some(cur) = current.as_mut() {
                    cur.words.push(text.to_string());
                    if let Ok(conf) = cols[10].parse::<f64>() {
                        if conf >= 0.0 {
                            cur.conf_sum += conf;
                            cur.conf_count += 1;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    flush(current.take(), &mut lines);

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn row(level: u32, bbox: (u32, u32, u32, u32), conf: f64, text: &str) -> String {
        format!(
            "{}\t1\t1\t1\t1\t1\t{}\t{}\t{}\t{}\t{}\t{}",
            level, bbox.0, bbox.1, bbox.2, bbox.3, conf, text
        )
    }

    #[test]
    fn test_resolve_language() {
        let lang = resolve_language("en").unwrap();
        assert_eq!(lang.traineddata, "eng");
        assert!(matches!(
            resolve_language("xx").unwrap_err(),
            OcrError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_parse_tsv_groups_words_into_lines() {
        let tsv = [
            HEADER.to_string(),
            row(4, (10, 20, 100, 30), -1.0, ""),
            row(5, (10, 20, 40, 30), 90.0, "hello"),
            row(5, (60, 20, 50, 30), 80.0, "world"),
            row(4, (10, 60, 100, 30), -1.0, ""),
            row(5, (10, 60, 100, 30), 70.0, "second"),
        ]
        .join("\n");

        let lines = parse_tsv(&tsv);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "hello world");
        assert!((lines[0].confidence - 0.85).abs() < 1e-9);
        assert_eq!(lines[1].text, "second");
        assert!((lines[1].confidence - 0.70).abs() < 1e-9);
    }

    #[test]
    fn test_parse_tsv_bbox_corners() {
        let tsv = [
            HEADER.to_string(),
            row(4, (10, 20, 100, 30), -1.0, ""),
            row(5, (10, 20, 100, 30), 88.0, "word"),
        ]
        .join("\n");

        let bbox = parse_tsv(&tsv)[0].bbox.unwrap();
        assert_eq!(bbox[0], (10.0, 20.0));
        assert_eq!(bbox[1], (110.0, 20.0));
        assert_eq!(bbox[2], (110.0, 50.0));
        assert_eq!(bbox[3], (10.0, 50.0));
    }

    #[test]
    fn test_parse_tsv_empty_page() {
        assert!(parse_tsv(HEADER).is_empty());
        assert!(parse_tsv("").is_empty());
    }

    #[test]
    fn test_parse_tsv_skips_blank_words() {
        let tsv = [
            HEADER.to_string(),
            row(4, (0, 0, 10, 10), -1.0, ""),
            row(5, (0, 0, 10, 10), 95.0, " "),
        ]
        .join("\n");
        assert!(parse_tsv(&tsv).is_empty());
    }

    #[test]
    fn test_cache_starts_empty() {
        let cache = EngineCache::new(None);
        assert_eq!(cache.loaded_count(), 0);
    }

    #[test]
    fn test_cache_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineCache>();
    }
}
