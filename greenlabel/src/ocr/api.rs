use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::{parse_ocr_provider_model, OcrConfig};
use crate::error::{GreenlabelError, Result};

use super::RecognitionProfile;

const MAX_RETRIES: u32 = 3;

/// OpenAI-compatible chat-completions client used as a vision OCR engine.
#[derive(Clone, Debug)]
pub struct OpenAiVisionClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

impl OpenAiVisionClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GreenlabelError::Ocr("API key required for vision OCR".to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        let (_, model) = parse_ocr_provider_model(&config.model);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GreenlabelError::Ocr(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model: model.to_string(),
        })
    }

    /// Send one image with the profile's transcription prompt and return the reply text.
    pub async fn recognize(&self, png: &[u8], profile: RecognitionProfile) -> Result<String> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "max_tokens": 1024,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": profile.prompt()},
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:image/png;base64,{}", STANDARD.encode(png))
                        }
                    }
                ]
            }]
        });

        self.make_request(&body).await
    }

    async fn make_request(&self, body: &Value) -> Result<String> {
        let mut retries = 0;

        loop {
            let response = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(body)
                .send()
                .await;

            let retry_reason = match response {
                Ok(resp) if resp.status().is_success() => {
                    let reply: ChatResponse = resp.json().await.map_err(|e| {
                        GreenlabelError::Ocr(format!("Unreadable vision response: {e}"))
                    })?;
                    return reply
                        .choices
                        .into_iter()
                        .next()
                        .map(|choice| choice.message.content)
                        .ok_or_else(|| {
                            GreenlabelError::Ocr("Vision response had no choices".to_string())
                        });
                }
                Ok(resp) if resp.status().as_u16() == 429 || resp.status().is_server_error() => {
                    resp.status().to_string()
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(GreenlabelError::Ocr(format!(
                        "API request failed: {status} - {body}"
                    )));
                }
                Err(e) => e.to_string(),
            };

            retries += 1;
            if retries >= MAX_RETRIES {
                return Err(GreenlabelError::Ocr(format!(
                    "Vision OCR gave up after {MAX_RETRIES} attempts: {retry_reason}"
                )));
            }
            tracing::debug!(retries, reason = %retry_reason, "Retrying vision OCR request");
            tokio::time::sleep(Duration::from_millis(100 * 2_u64.pow(retries))).await;
        }
    }
}
