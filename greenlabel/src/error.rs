use serde::Serialize;
use thiserror::Error;

/// Remediation hints returned whenever a barcode cannot be decoded.
pub const BARCODE_HINTS: &[&str] = &[
    "Ensure the barcode is clearly visible and fills at least 30% of the image",
    "Try taking a higher resolution image",
    "Avoid glare and shadows on the barcode",
    "Position the barcode horizontally",
];

/// Suggestions for product photos that yield no usable label text or no match.
pub const IMAGE_SEARCH_HINTS: &[&str] = &[
    "Try a clearer image of the product label",
    "Ensure the product name is visible",
    "Try searching by text if image search fails",
];

pub const SUPPORTED_FORMATS: &[&str] = &["JPG", "JPEG", "PNG", "WEBP"];

#[derive(Error, Debug)]
pub enum GreenlabelError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Image preprocessing failed: {0}")]
    Preprocess(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Barcode decode failed: {reason}")]
    DecodeFailure { reason: String, hints: Vec<String> },

    #[error("Source '{source_id}' unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GreenlabelError {
    /// Machine-readable failure reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Preprocess(_) => "preprocess_failed",
            Self::Extraction(_) => "extraction_failed",
            Self::DecodeFailure { .. } => "decode_failed",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::Persistence(_) => "persistence_failed",
            Self::NotFound(_) => "not_found",
            Self::UnsupportedMedia(_) => "unsupported_media",
            Self::Database(_) => "database_error",
            Self::Http(_) => "upstream_error",
            Self::Json(_) => "invalid_payload",
            Self::Io(_) => "io_error",
            Self::UrlParse(_) => "invalid_url",
            Self::Ocr(_) => "ocr_failed",
            Self::OcrUnavailable(_) => "ocr_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Human-actionable suggestions. Only image-quality failures carry any.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::DecodeFailure { hints, .. } => hints.clone(),
            Self::Preprocess(_) | Self::Extraction(_) => {
                IMAGE_SEARCH_HINTS.iter().map(|s| s.to_string()).collect()
            }
            Self::UnsupportedMedia(_) => SUPPORTED_FORMATS
                .iter()
                .map(|f| format!("Upload a {f} image"))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code().to_string(),
            message: self.to_string(),
            suggestions: self.suggestions(),
        }
    }
}

/// Serialized failure shape handed to whatever sits in front of the pipeline.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

pub type Result<T> = std::result::Result<T, GreenlabelError>;
