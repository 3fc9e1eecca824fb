use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::errors::{ServiceError, ServiceResult};

#[async_trait]
pub trait AudioMixer: Send + Sync {
    /// Concatenates `ordered_paths` into `output_path`. `Ok(false)` means the
    /// mixer ran but produced nothing usable.
    async fn combine(&self, ordered_paths: &[PathBuf], output_path: &Path) -> ServiceResult<bool>;
}

/// Concatenates audio with an `ffmpeg` concat filter, resampling every input
/// to a common format so mp3, wav and m4a sources can be mixed.
pub struct FfmpegMixer {
    ffmpeg_path: String,
}

impl FfmpegMixer {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

#[async_trait]
impl AudioMixer for FfmpegMixer {
    async fn combine(&self, ordered_paths: &[PathBuf], output_path: &Path) -> ServiceResult<bool> {
        if ordered_paths.is_empty() {
            tracing::warn!("No audio files to combine into {}", output_path.display());
            return Ok(false);
        }
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::info!(
            "Combining {} audio files into {}",
            ordered_paths.len(),
            output_path.display()
        );

        let mut command = Command::new(&self.ffmpeg_path);
        command.arg("-hide_banner").arg("-y");
        for path in ordered_paths {
            command.arg("-i").arg(path);
        }
        let output = command
            .arg("-filter_complex")
            .arg(filter_graph(ordered_paths.len()))
            .args(["-map", "[out]", "-c:a", "libmp3lame", "-q:a", "2"])
            .arg(output_path)
            .output()
            .await
            .map_err(|e| ServiceError::Process(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!("ffmpeg failed: {}", stderr);
            return Ok(false);
        }

        let written = tokio::fs::metadata(output_path)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        Ok(written)
    }
}

/// `[0:a]aresample=44100,aformat=channel_layouts=stereo[a0];...[a0][a1]concat=n=2:v=0:a=1[out]`
fn filter_graph(inputs: usize) -> String {
    let mut graph = String::new();
    for i in 0..inputs {
        graph.push_str(&format!(
            "[{i}:a]aresample=44100,aformat=channel_layouts=stereo[a{i}];"
        ));
    }
    for i in 0..inputs {
        graph.push_str(&format!("[a{i}]"));
    }
    graph.push_str(&format!("concat=n={inputs}:v=0:a=1[out]"));
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_graph_chains_every_input() {
        assert_eq!(
            filter_graph(2),
            "[0:a]aresample=44100,aformat=channel_layouts=stereo[a0];\
             [1:a]aresample=44100,aformat=channel_layouts=stereo[a1];\
             [a0][a1]concat=n=2:v=0:a=1[out]"
        );
    }

    #[tokio::test]
    async fn nothing_to_combine_reports_false() {
        let mixer = FfmpegMixer::new("ffmpeg");
        let dir = tempfile::TempDir::new().unwrap();
        let combined = mixer.combine(&[], &dir.path().join("out.mp3")).await.unwrap();
        assert!(!combined);
    }

    #[tokio::test]
    async fn missing_binary_is_a_process_error() {
        let mixer = FfmpegMixer::new("/nonexistent/ffmpeg");
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("a.mp3");
        std::fs::write(&input, b"x").unwrap();

        let result = mixer.combine(&[input], &dir.path().join("out.mp3")).await;
        assert!(matches!(result, Err(ServiceError::Process(_))));
    }
}
