use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::config::TranscriberConfig;

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Text of the audio file, or an empty string when it cannot be read.
    async fn transcribe(&self, audio_path: &Path) -> String;
}

/// Runs an external speech-to-text program and takes its stdout as the
/// transcript.
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
}

impl CommandTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self {
            program: config.program,
            args: config.args,
        }
    }

    fn args_for(&self, audio_path: &Path) -> Vec<String> {
        let input = audio_path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input))
            .collect()
    }
}

#[async_trait]
impl Transcriber for CommandTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> String {
        let usable = tokio::fs::metadata(audio_path)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !usable {
            tracing::warn!("Skipping empty or missing audio file: {}", audio_path.display());
            return String::new();
        }

        let output = match Command::new(&self.program)
            .args(self.args_for(audio_path))
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Failed to run {}: {}. Skipping file: {}", self.program, e, audio_path.display());
                return String::new();
            }
        };

        if !output.status.success() {
            tracing::error!(
                "Transcription failed for {}: {}",
                audio_path.display(),
                String::from_utf8_lossy(&output.stderr)
            );
            return String::new();
        }

        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}
