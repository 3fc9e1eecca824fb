use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::config::SpeechConfig;
use crate::errors::{ServiceError, ServiceResult};

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Renders `text` to an audio file at `output_path`. `use_markup` means the
    /// text is already a `<speak>` document.
    async fn generate(&self, text: &str, output_path: &Path, use_markup: bool) -> ServiceResult<PathBuf>;
}

/// ElevenLabs text-to-speech client.
pub struct ElevenLabsSynthesizer {
    client: Client,
    config: SpeechConfig,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn generate(&self, text: &str, output_path: &Path, use_markup: bool) -> ServiceResult<PathBuf> {
        let text = wrap_plain_text(text, use_markup);
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.voice_id
        );

        tracing::debug!("Requesting speech for {} characters", text.len());

        // Lower stability gives more dynamic delivery.
        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .json(&json!({
                "text": text,
                "model_id": self.config.model_id,
                "voice_settings": {
                    "stability": 0.3,
                    "similarity_boost": 0.8,
                    "style": 0.5,
                    "use_speaker_boost": true,
                },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                service: "ElevenLabs",
                status: status.as_u16(),
                body,
            });
        }

        let audio: Bytes = response.bytes().await?;
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output_path, &audio).await?;

        tracing::debug!("Wrote {} bytes of speech to {}", audio.len(), output_path.display());
        Ok(output_path.to_path_buf())
    }
}

fn wrap_plain_text(text: &str, use_markup: bool) -> String {
    if !use_markup && !text.trim_start().starts_with("<speak>") {
        format!("<speak>{}</speak>", text)
    } else {
        text.to_string()
    }
}
