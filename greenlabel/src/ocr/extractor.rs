use crate::error::{GreenlabelError, Result};
use crate::imaging::PreprocessedImage;

use super::{OcrProvider, RecognitionProfile};

/// Lines this short are treated as noise.
const MIN_LINE_CHARS: usize = 4;

/// Pick the recognized line most likely to be a product name: the trimmed
/// line with the most ASCII letters, first one on ties. Returns an empty
/// string when no line qualifies.
pub fn synthesize_query(text: &str) -> String {
    let mut best = "";
    let mut best_letters = 0;

    for line in text.lines().map(str::trim) {
        if line.chars().count() < MIN_LINE_CHARS {
            continue;
        }
        let letters = line.chars().filter(|c| c.is_ascii_alphabetic()).count();
        if letters > best_letters {
            best = line;
            best_letters = letters;
        }
    }

    best.to_string()
}

#[derive(Clone)]
pub struct OcrExtractor {
    provider: OcrProvider,
}

impl OcrExtractor {
    pub fn new(provider: OcrProvider) -> Self {
        Self { provider }
    }

    /// Read a product label and reduce it to a single query line.
    ///
    /// An empty return value means text was found but none of it looks like a name.
    pub async fn extract(&self, image: &PreprocessedImage) -> Result<String> {
        let png = image.to_png()?;
        let text = self
            .provider
            .recognize(&png, RecognitionProfile::ProductLabel)
            .await
            .map_err(|e| match e {
                GreenlabelError::OcrUnavailable(_) => e,
                other => GreenlabelError::Extraction(other.to_string()),
            })?;

        if text.trim().is_empty() {
            return Err(GreenlabelError::Extraction(
                "Could not extract product information from image".to_string(),
            ));
        }

        let query = synthesize_query(&text);
        tracing::debug!(query = %query, lines = text.lines().count(), "Label text synthesized");
        Ok(query)
    }
}
