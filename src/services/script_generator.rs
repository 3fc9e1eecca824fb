use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

use crate::config::GeneratorConfig;
use crate::errors::{ServiceError, ServiceResult};

const SYSTEM_PROMPT: &str =
    "You are an experienced radio DJ who creates engaging, natural-sounding transitions and intros.";
const CANNED_SCRIPT: &str = "Welcome to the show! Let's enjoy some great music together.";
const DEFAULT_MAX_TOKENS: u32 = 150;

/// A song-like record handed to the generator: who, what, and the prompt or
/// transcript that gives it context.
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub artist: String,
    pub name: String,
    pub transcript: String,
}

#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn process(&self, record: &ScriptRequest, max_tokens: Option<u32>) -> ServiceResult<String>;
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    intro_templates: Vec<Template>,
}

#[derive(Debug, Deserialize)]
struct Template {
    script: String,
}

/// Reads the intro template scripts; a missing or unreadable file yields none.
pub fn load_templates(path: Option<&Path>) -> Vec<String> {
    let Some(path) = path else {
        return Vec::new();
    };
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str::<TemplateFile>(&raw).map_err(|e| e.to_string()));
    match parsed {
        Ok(file) => file.intro_templates.into_iter().map(|t| t.script).collect(),
        Err(e) => {
            tracing::warn!("No intro templates loaded from {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Chat-completion backed generator with a local model, template and canned
/// fallback chain. It never reports failure to its caller.
pub struct LlmScriptGenerator {
    client: Client,
    config: GeneratorConfig,
    templates: Vec<String>,
}

impl LlmScriptGenerator {
    pub fn new(config: GeneratorConfig, templates: Vec<String>) -> Self {
        Self {
            client: Client::new(),
            config,
            templates,
        }
    }

    async fn generate_with_openai(&self, prompt: &str, max_tokens: u32) -> ServiceResult<String> {
        let response = self
            .client
            .post(&self.config.openai_url)
            .bearer_auth(&self.config.openai_api_key)
            .json(&json!({
                "model": self.config.openai_model,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": prompt},
                ],
                "max_tokens": max_tokens,
                "temperature": 0.8,
                "top_p": 0.9,
                "frequency_penalty": 0.3,
                "presence_penalty": 0.3,
            }))
            .send()
            .await?;

        let body = checked_json(response, "OpenAI").await?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or(ServiceError::InvalidResponse("OpenAI"))
    }

    async fn generate_locally(&self, prompt: &str) -> ServiceResult<String> {
        let response = self
            .client
            .post(&self.config.local_url)
            .json(&json!({
                "model": self.config.local_model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()
            .await?;

        let body = checked_json(response, "local model").await?;
        body["response"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or(ServiceError::InvalidResponse("local model"))
    }

    fn fallback(&self, prompt: &str) -> String {
        if prompt.to_lowercase().contains("radio intro") {
            if let Some(template) = self.templates.first() {
                return template.clone();
            }
        }
        CANNED_SCRIPT.to_string()
    }
}

#[async_trait]
impl ScriptGenerator for LlmScriptGenerator {
    async fn process(&self, record: &ScriptRequest, max_tokens: Option<u32>) -> ServiceResult<String> {
        let prompt = build_prompt(record);

        if self.config.use_openai {
            match self
                .generate_with_openai(&prompt, max_tokens.unwrap_or(DEFAULT_MAX_TOKENS))
                .await
            {
                Ok(text) => return Ok(text),
                Err(e) => tracing::warn!("OpenAI generation failed, trying local model: {}", e),
            }
        }

        match self.generate_locally(&prompt).await {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!("Local generation failed, using fallback script: {}", e);
                Ok(self.fallback(&prompt))
            }
        }
    }
}

async fn checked_json(response: reqwest::Response, service: &'static str) -> ServiceResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ServiceError::Status {
            service,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

/// Wraps the record in an intro or transition frame depending on its name;
/// other records are sent as their transcript verbatim.
pub fn build_prompt(record: &ScriptRequest) -> String {
    let name = record.name.to_lowercase();
    if name.contains("transition") {
        format!(
            "Create a smooth transition between songs.\n\
             Artist: {}\n\
             Song: {}\n\
             Context: {}\n\n\
             Make it natural and engaging, connecting the emotional themes between songs.",
            record.artist, record.name, record.transcript
        )
    } else if name.contains("intro") {
        format!(
            "Create an engaging radio intro.\n\
             Artist: {}\n\
             Context: {}\n\n\
             Make it warm and welcoming, setting the mood for the show.",
            record.artist, record.transcript
        )
    } else {
        record.transcript.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> ScriptRequest {
        ScriptRequest {
            artist: "Test Artist".into(),
            name: name.into(),
            transcript: "context text".into(),
        }
    }

    fn offline_config() -> GeneratorConfig {
        GeneratorConfig {
            use_openai: false,
            openai_url: "http://127.0.0.1:9/v1/chat/completions".into(),
            openai_api_key: String::new(),
            openai_model: "test".into(),
            local_url: "http://127.0.0.1:9/api/generate".into(),
            local_model: "test".into(),
            templates_path: None,
        }
    }

    #[test]
    fn prompt_frames_follow_record_name() {
        assert!(build_prompt(&request("song_transition")).starts_with("Create a smooth transition"));
        assert!(build_prompt(&request("Test Artist radio intro")).starts_with("Create an engaging radio intro"));
        assert_eq!(build_prompt(&request("enhance_script")), "context text");
    }

    #[tokio::test]
    async fn unreachable_models_fall_back_to_templates() {
        let generator = LlmScriptGenerator::new(offline_config(), vec!["Template intro".into()]);

        let intro = generator
            .process(&request("Test Artist radio intro"), None)
            .await
            .unwrap();
        assert_eq!(intro, "Template intro");

        let other = generator.process(&request("enhance_script"), Some(10)).await.unwrap();
        assert_eq!(other, CANNED_SCRIPT);
    }

    #[test]
    fn missing_template_file_yields_none() {
        assert!(load_templates(Some(Path::new("/nonexistent/templates.json"))).is_empty());
        assert!(load_templates(None).is_empty());
    }
}
