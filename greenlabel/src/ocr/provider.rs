use std::sync::Arc;
use std::time::Duration;

use leptess::{LepTess, Variable};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{parse_ocr_provider_model, OcrConfig};
use crate::error::{GreenlabelError, Result};

use super::api::OpenAiVisionClient;

/// Characters Tesseract may emit when reading a product label.
pub const LABEL_CHAR_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789- ";

/// Recognition settings for the two kinds of image the pipeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionProfile {
    /// Single uniform block, restricted alphabet, spacing preserved.
    ProductLabel,
    /// Unrestricted alphabet and automatic layout, so non-Latin marks survive.
    Logo,
}

impl RecognitionProfile {
    fn whitelist(&self) -> &'static str {
        match self {
            Self::ProductLabel => LABEL_CHAR_WHITELIST,
            Self::Logo => "",
        }
    }

    fn page_seg_mode(&self) -> &'static str {
        match self {
            Self::ProductLabel => "6",
            Self::Logo => "3",
        }
    }

    pub(super) fn prompt(&self) -> &'static str {
        match self {
            Self::ProductLabel => "Extract the printed text from this product label. Return one line per line of text, using only letters, digits, hyphens and spaces, without any explanations.",
            Self::Logo => "Extract all text from this logo or certification mark, in any script. Return only the extracted text without any explanations or formatting.",
        }
    }
}

enum OcrBackend {
    Local { tesseract: Arc<Mutex<LepTess>> },
    Api { client: OpenAiVisionClient },
    Unavailable { reason: String },
}

pub struct OcrProvider {
    backend: OcrBackend,
    config: OcrConfig,
}

fn create_tesseract(languages: &str) -> std::result::Result<LepTess, String> {
    LepTess::new(None, languages).map_err(|e| e.to_string())
}

fn configure(lt: &mut LepTess, profile: RecognitionProfile) -> Result<()> {
    let settings = [
        (Variable::TesseditCharWhitelist, profile.whitelist()),
        (Variable::TesseditPagesegMode, profile.page_seg_mode()),
        (Variable::PreserveInterwordSpaces, "1"),
    ];
    for (variable, value) in settings {
        lt.set_variable(variable, value)
            .map_err(|e| GreenlabelError::Ocr(format!("Failed to configure Tesseract: {e:?}")))?;
    }
    Ok(())
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let (provider, _model) = parse_ocr_provider_model(&config.model);

        let backend = match provider {
            "openai" => match OpenAiVisionClient::new(config) {
                Ok(client) => {
                    info!(model = %config.model, "Vision OCR API backend initialized");
                    OcrBackend::Api { client }
                }
                Err(e) => {
                    let reason = format!("Vision OCR backend unavailable: {e}");
                    warn!("{}", reason);
                    OcrBackend::Unavailable { reason }
                }
            },
            _ => match create_tesseract(&config.languages) {
                Ok(lt) => {
                    info!(languages = %config.languages, "Tesseract OCR initialized");
                    OcrBackend::Local {
                        tesseract: Arc::new(Mutex::new(lt)),
                    }
                }
                Err(e) => {
                    let reason = format!("Tesseract not available: {e}");
                    warn!("{}", reason);
                    OcrBackend::Unavailable { reason }
                }
            },
        };

        Ok(Self {
            backend,
            config: config.clone(),
        })
    }

    pub fn unavailable(reason: impl Into<String>, config: &OcrConfig) -> Self {
        Self {
            backend: OcrBackend::Unavailable {
                reason: reason.into(),
            },
            config: config.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    /// Recognize text in a PNG-encoded image, bounded by the configured timeout.
    pub async fn recognize(&self, png: &[u8], profile: RecognitionProfile) -> Result<String> {
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);

        match tokio::time::timeout(timeout_duration, self.recognize_internal(png, profile)).await {
            Ok(inner_result) => inner_result,
            Err(_) => Err(GreenlabelError::Ocr(format!(
                "OCR operation timed out after {} seconds",
                self.config.timeout_secs
            ))),
        }
    }

    async fn recognize_internal(&self, png: &[u8], profile: RecognitionProfile) -> Result<String> {
        match &self.backend {
            OcrBackend::Local { tesseract } => {
                let bytes = png.to_vec();
                let tesseract = Arc::clone(tesseract);

                let text = tokio::task::spawn_blocking(move || {
                    let mut lt = tesseract.blocking_lock();
                    configure(&mut lt, profile)?;
                    lt.set_image_from_mem(&bytes)
                        .map_err(|e| GreenlabelError::Ocr(format!("Failed to set image: {e}")))?;
                    lt.get_utf8_text()
                        .map_err(|e| GreenlabelError::Ocr(format!("Failed to extract text: {e}")))
                })
                .await
                .map_err(|e| GreenlabelError::Ocr(format!("OCR task panicked: {e}")))??;

                Ok(text)
            }
            OcrBackend::Api { client } => client.recognize(png, profile).await,
            OcrBackend::Unavailable { reason } => {
                Err(GreenlabelError::OcrUnavailable(reason.clone()))
            }
        }
    }
}

impl Clone for OcrProvider {
    fn clone(&self) -> Self {
        let backend = match &self.backend {
            OcrBackend::Local { tesseract } => OcrBackend::Local {
                tesseract: Arc::clone(tesseract),
            },
            OcrBackend::Api { client } => OcrBackend::Api {
                client: client.clone(),
            },
            OcrBackend::Unavailable { reason } => OcrBackend::Unavailable {
                reason: reason.clone(),
            },
        };
        Self {
            backend,
            config: self.config.clone(),
        }
    }
}
