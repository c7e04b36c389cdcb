//! Text recognition over preprocessed images.
//!
//! `OcrProvider` hides the engine: local Tesseract through leptess, or an
//! OpenAI-compatible vision endpoint selected with `OCR_MODEL=openai/<model>`.
//! If neither can be initialized the provider stays constructible and every
//! call fails with `OcrUnavailable`, so the rest of the pipeline keeps working.
//!
//! `OcrExtractor` turns raw recognition output into a single search query.

mod api;
mod extractor;
mod provider;

pub use extractor::{synthesize_query, OcrExtractor};
pub use provider::{OcrProvider, RecognitionProfile, LABEL_CHAR_WHITELIST};
