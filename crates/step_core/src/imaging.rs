//! Screenshot payload helpers
//!
//! Screenshots arrive either as bare base64 or as `data:` URLs. Providers
//! want one form or the other, so both conversions live here.

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;

/// Media type assumed when the payload cannot be sniffed
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Enough base64 characters to cover every magic number `image` checks
const SNIFF_CHARS: usize = 24;

/// Normalize a screenshot payload to a `data:` URL
pub fn to_data_url(payload: &str) -> String {
    if payload.starts_with("data:") {
        return payload.to_string();
    }
    format!("data:{};base64,{}", sniff_mime_type(payload), payload)
}

/// Guess the media type of base64 image data from its magic number
pub fn sniff_mime_type(data: &str) -> &'static str {
    let len = data.len().min(SNIFF_CHARS) / 4 * 4;
    data.get(..len)
        .and_then(|head| general_purpose::STANDARD.decode(head).ok())
        .and_then(|bytes| image::guess_format(&bytes).ok())
        .map(|format| format.to_mime_type())
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Image split into media type and bare base64 data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    /// Split a data URL, or sniff the media type of bare base64
    pub fn parse(payload: &str) -> Self {
        if let Some(rest) = payload.strip_prefix("data:") {
            if let Some((mime_type, data)) = rest.split_once(";base64,") {
                let mime_type = if mime_type.is_empty() {
                    DEFAULT_MIME_TYPE
                } else {
                    mime_type
                };
                return Self {
                    mime_type: mime_type.to_string(),
                    data: data.to_string(),
                };
            }
        }

        Self {
            mime_type: sniff_mime_type(payload).to_string(),
            data: payload.to_string(),
        }
    }
}

/// Read an image file and encode it as base64
pub fn encode_image_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;

    image::guess_format(&bytes)
        .with_context(|| format!("{} is not a recognized image", path.display()))?;

    Ok(general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0, 1];

    fn b64(bytes: &[u8]) -> String {
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_data_url_is_kept() {
        let url = "data:image/jpeg;base64,AAAA";
        assert_eq!(to_data_url(url), url);
    }

    #[test]
    fn test_bare_base64_gets_sniffed_prefix() {
        assert_eq!(
            to_data_url(&b64(JPEG_MAGIC)),
            format!("data:image/jpeg;base64,{}", b64(JPEG_MAGIC))
        );
        assert!(to_data_url(&b64(PNG_MAGIC)).starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_unrecognized_data_defaults_to_png() {
        assert_eq!(sniff_mime_type("not base64 at all"), DEFAULT_MIME_TYPE);
        assert_eq!(sniff_mime_type(""), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_inline_image_from_data_url() {
        let image = InlineImage::parse("data:image/webp;base64,UklGRg==");
        assert_eq!(image.mime_type, "image/webp");
        assert_eq!(image.data, "UklGRg==");
    }

    #[test]
    fn test_inline_image_from_bare_base64() {
        let data = b64(JPEG_MAGIC);
        let image = InlineImage::parse(&data);
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, data);
    }

    #[test]
    fn test_encode_image_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PNG_MAGIC).unwrap();

        let encoded = encode_image_file(file.path()).unwrap();
        assert_eq!(encoded, b64(PNG_MAGIC));
    }

    #[test]
    fn test_encode_rejects_non_images() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"plain text, definitely not pixels").unwrap();

        assert!(encode_image_file(file.path()).is_err());
    }
}
