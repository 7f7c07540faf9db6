//! Media payload preparation: zlib compression and the placeholder record.

use crate::domain::models::{MediaPayload, PLACEHOLDER_MIME_TYPE};
use crate::error::{ServiceError, ServiceResult};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::debug;

/// Raw media as received from a caller
#[derive(Debug, Clone, Default)]
pub struct MediaUpload {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl MediaUpload {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: Some(mime_type.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub fn compress(bytes: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(bytes)?;
    encoder.finish()
}

pub fn decompress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Validate a caller supplied MIME type; absent means `text/plain`
pub fn normalize_mime(mime_type: Option<&str>) -> ServiceResult<String> {
    match mime_type.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(PLACEHOLDER_MIME_TYPE.to_string()),
        Some(raw) => raw
            .parse::<mime::Mime>()
            .map(|m| m.essence_str().to_string())
            .map_err(|e| ServiceError::InvalidInput(format!("invalid mime type {:?}: {}", raw, e))),
    }
}

/// Compress an upload on the blocking pool.
///
/// Returns `None` when there is nothing to store, so callers can decide between the placeholder
/// (new comments) and leaving the existing record untouched (updates).
pub async fn prepare_upload(
    upload: Option<MediaUpload>,
    level: u32,
) -> ServiceResult<Option<MediaPayload>> {
    let upload = match upload {
        Some(upload) if !upload.is_empty() => upload,
        _ => return Ok(None),
    };

    let mime_type = normalize_mime(upload.mime_type.as_deref())?;
    let raw_len = upload.bytes.len();

    let data = tokio::task::spawn_blocking(move || compress(&upload.bytes, level))
        .await
        .map_err(|e| ServiceError::Internal(format!("compression task failed: {}", e)))??;

    debug!(raw_len, compressed_len = data.len(), %mime_type, "Compressed media payload");

    Ok(Some(MediaPayload { data, mime_type }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PLACEHOLDER_MEDIA_LEN;

    #[test]
    fn test_compress_is_a_zlib_stream() {
        let input = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let packed = compress(input, 6).unwrap();
        // zlib header, deflate method with 32K window
        assert_eq!(packed[0], 0x78);
        assert!(packed.len() < input.len());
        assert_eq!(decompress(&packed).unwrap(), input.to_vec());
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(decompress(&[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn test_normalize_mime() {
        assert_eq!(normalize_mime(None).unwrap(), "text/plain");
        assert_eq!(normalize_mime(Some("  ")).unwrap(), "text/plain");
        assert_eq!(normalize_mime(Some("image/png")).unwrap(), "image/png");
        assert_eq!(
            normalize_mime(Some("text/html; charset=utf-8")).unwrap(),
            "text/html"
        );
        assert!(matches!(
            normalize_mime(Some("not a mime")),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_prepare_upload_skips_empty() {
        assert!(prepare_upload(None, 6).await.unwrap().is_none());
        let empty = MediaUpload {
            bytes: Vec::new(),
            mime_type: Some("image/png".into()),
        };
        assert!(prepare_upload(Some(empty), 6).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prepare_upload_defaults_mime() {
        let upload = MediaUpload {
            bytes: b"hello".to_vec(),
            mime_type: None,
        };
        let payload = prepare_upload(Some(upload), 6).await.unwrap().unwrap();
        assert_eq!(payload.mime_type, "text/plain");
        assert_eq!(decompress(&payload.data).unwrap(), b"hello".to_vec());
    }

    #[test]
    fn test_placeholder_shape() {
        let placeholder = MediaPayload::placeholder();
        assert_eq!(placeholder.data, vec![0u8; PLACEHOLDER_MEDIA_LEN]);
        assert_eq!(placeholder.mime_type, PLACEHOLDER_MIME_TYPE);
    }
}
