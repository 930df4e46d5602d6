//! Page-selection expression parsing.
//!
//! Grammar, evaluated in precedence order: `all`, `first`, `last`, a
//! `start-end` range, a comma-separated list, or a single page number.
//! Ranges and `all` clamp to `min(total_pages, max_pages)` (range starts
//! clamp up to 1); comma lists
//! filter out-of-bounds entries but keep order and duplicates; a single
//! unparseable or out-of-range number falls back to page 1 (legacy caller
//! compatibility).

use crate::error::OcrError;

/// Resolve a page expression against the document's page count and the
/// request's page cap. Returned pages are 1-indexed.
pub fn select(expression: &str, total_pages: u32, max_pages: u32) -> Result<Vec<u32>, OcrError> {
    let expr = expression.trim();
    let cap = total_pages.min(max_pages);

    // a document with no pages has nothing to select, whatever the expression
    if total_pages == 0 {
        return Ok(Vec::new());
    }

    match expr {
        "all" => return Ok((1..=cap).collect()),
        "first" => return Ok(vec![1]),
        // deliberately not clamped by max_pages
        "last" => return Ok(vec![total_pages]),
        _ => {}
    }

    if expr.contains('-') {
        let (start_s, end_s) = expr
            .split_once('-')
            .ok_or_else(|| OcrError::InvalidPageExpression(expr.to_string()))?;
        let start: u32 = start_s
            .trim()
            .parse()
            .map_err(|_| OcrError::InvalidPageExpression(expr.to_string()))?;
        let end: u32 = end_s
            .trim()
            .parse()
            .map_err(|_| OcrError::InvalidPageExpression(expr.to_string()))?;
        let start = start.max(1);
        let end = end.min(cap);
        return Ok((start..=end).collect());
    }

    if expr.contains(',') {
        let mut pages = Vec::new();
        for token in expr.split(',') {
            let page: u32 = token
                .trim()
                .parse()
                .map_err(|_| OcrError::InvalidPageExpression(expr.to_string()))?;
            if page >= 1 && page <= total_pages && page <= max_pages {
                pages.push(page);
            }
        }
        return Ok(pages);
    }

    // single page number; silent fallback to page 1 on failure
    match expr.parse::<u32>() {
        Ok(page) if page >= 1 && page <= total_pages => Ok(vec![page]),
        _ => Ok(vec![1]),
    }
}
