use crate::error::{GreenlabelError, Result, SUPPORTED_FORMATS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormatKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormatKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// Gate an uploaded image on sniffed content type and size before any pixel work.
pub fn validate_upload(bytes: &[u8], max_bytes: usize) -> Result<ImageFormatKind> {
    if bytes.is_empty() {
        return Err(GreenlabelError::InvalidArgument(
            "Image file is empty".to_string(),
        ));
    }

    if bytes.len() > max_bytes {
        return Err(GreenlabelError::UnsupportedMedia(format!(
            "Image is {} bytes, limit is {} bytes",
            bytes.len(),
            max_bytes
        )));
    }

    let kind = infer::get(bytes).map(|k| k.mime_type());
    match kind {
        Some("image/jpeg") => Ok(ImageFormatKind::Jpeg),
        Some("image/png") => Ok(ImageFormatKind::Png),
        Some("image/webp") => Ok(ImageFormatKind::Webp),
        other => Err(GreenlabelError::UnsupportedMedia(format!(
            "Content type {} is not accepted; expected one of {}",
            other.unwrap_or("unknown"),
            SUPPORTED_FORMATS.join(", ")
        ))),
    }
}
