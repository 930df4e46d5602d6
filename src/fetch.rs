//! Remote file download for `file_url` requests.

use crate::error::OcrError;
use tracing::info;

/// Fetch the document bytes from a URL. The client carries the
/// process-wide request timeout; any transport failure or non-2xx status
/// maps to [`OcrError::Download`]. Downloads honor the same size cap as
/// uploads, checked against `Content-Length` before the body is read and
/// against the actual body after.
pub async fn download(
    client: &reqwest::Client,
    url: &str,
    max_bytes: usize,
) -> Result<Vec<u8>, OcrError> {
    info!("downloading document from {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| OcrError::Download(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(OcrError::Download(format!("{}: {}", status, body)));
    }

    if let Some(declared) = response.content_length() {
        check_size(declared as usize, max_bytes)?;
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| OcrError::Download(e.to_string()))?;
    check_size(bytes.len(), max_bytes)?;

    info!("downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

fn check_size(len: usize, max_bytes: usize) -> Result<(), OcrError> {
    if len > max_bytes {
        return Err(OcrError::Download(format!(
            "file too large: {} bytes exceeds the {} byte limit",
            len, max_bytes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_within_limit_accepted() {
        assert!(check_size(1024, 2048).is_ok());
        assert!(check_size(2048, 2048).is_ok());
    }

    #[test]
    fn test_oversized_download_rejected() {
        let err = check_size(2049, 2048).unwrap_err();
        assert!(matches!(err, OcrError::Download(_)));
        assert!(err.to_string().contains("too large"));
    }
}
