//! Runtime settings, read once at startup from the environment
//! (a `.env` file is loaded in `main` when present).

use anyhow::{Context, Result};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Socket address the server binds to.
    pub bind_addr: String,
    /// Multipart body limit in bytes.
    pub max_upload_bytes: usize,
    /// Timeout for `file_url` downloads.
    pub download_timeout_secs: u64,
    /// Page cap applied when the request does not supply `max_pages`.
    pub default_max_pages: u32,
    /// Tessdata directory; `None` lets Tesseract use its default.
    pub tessdata_dir: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: std::env::var("OCR_GATEWAY_BIND")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            max_upload_bytes: parse_or(std::env::var("MAX_UPLOAD_BYTES").ok(), 50 * 1024 * 1024)
                .context("invalid MAX_UPLOAD_BYTES")?,
            download_timeout_secs: parse_or(std::env::var("DOWNLOAD_TIMEOUT_SECS").ok(), 15)
                .context("invalid DOWNLOAD_TIMEOUT_SECS")?,
            default_max_pages: parse_or(std::env::var("DEFAULT_MAX_PAGES").ok(), 50)
                .context("invalid DEFAULT_MAX_PAGES")?,
            tessdata_dir: std::env::var("TESSDATA_DIR").ok(),
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw.trim().parse::<T>().map_err(Into::into),
        None => Ok(default),
    }
}
