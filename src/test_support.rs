// Fakes and fixtures shared by the unit tests.
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use crate::config::WorkerConfig;
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{ProgressSession, Task, TaskKind};
use crate::services::mixer::AudioMixer;
use crate::services::music_library::MusicLibrary;
use crate::services::progress_store::ProgressStore;
use crate::services::script_generator::{ScriptGenerator, ScriptRequest};
use crate::services::speech::SpeechSynthesizer;
use crate::services::task_queue::TaskQueue;
use crate::services::transcriber::Transcriber;
use crate::worker::{Collaborators, RadioPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    ScriptGeneration,
    ScriptEnhancement,
    AudioGeneration,
    Transition,
    FinalCombination,
    MixerUnavailable,
    Panic,
}

#[derive(Default)]
struct Controls {
    fail_at: Option<FailAt>,
    synth_delay: Duration,
    mixed: Vec<PathBuf>,
}

type Shared = Arc<Mutex<Controls>>;

fn fail_at(controls: &Shared) -> Option<FailAt> {
    controls.lock().unwrap().fail_at
}

fn boom(what: &str) -> ServiceError {
    ServiceError::Process(format!("{} exploded", what))
}

struct FakeTranscriber;

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> String {
        format!(
            "transcript of {}",
            audio_path.file_name().unwrap().to_string_lossy()
        )
    }
}

struct FakeGenerator(Shared);

#[async_trait]
impl ScriptGenerator for FakeGenerator {
    async fn process(&self, record: &ScriptRequest, _max_tokens: Option<u32>) -> ServiceResult<String> {
        let fail = fail_at(&self.0);
        if record.name.ends_with("radio intro") {
            if fail == Some(FailAt::Panic) {
                panic!("generator panicked");
            }
            if fail == Some(FailAt::ScriptGeneration) {
                return Err(boom("intro generator"));
            }
            return Ok(format!("Welcome to the show, here comes {}!", record.artist));
        }
        if record.name == "song_transition" {
            if fail == Some(FailAt::Transition) {
                return Err(boom("transition generator"));
            }
            return Ok("\"Short one.\"".to_string());
        }
        if fail == Some(FailAt::ScriptEnhancement) {
            return Err(boom("enhancer"));
        }
        Ok("Sure thing!\n<speak>\n  <emphasis>Hello</emphasis> (warmly) listeners\n</speak>".to_string())
    }
}

struct FakeSynthesizer(Shared);

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn generate(&self, text: &str, output_path: &Path, _use_markup: bool) -> ServiceResult<PathBuf> {
        let delay = self.0.lock().unwrap().synth_delay;
        tokio::time::sleep(delay).await;
        tokio::fs::create_dir_all(output_path.parent().unwrap()).await?;
        tokio::fs::write(output_path, text.as_bytes()).await?;
        if fail_at(&self.0) == Some(FailAt::AudioGeneration) {
            return Err(ServiceError::Status {
                service: "speech",
                status: 500,
                body: "partial render".into(),
            });
        }
        Ok(output_path.to_path_buf())
    }
}

struct FakeMixer(Shared);

#[async_trait]
impl AudioMixer for FakeMixer {
    async fn combine(&self, ordered_paths: &[PathBuf], output_path: &Path) -> ServiceResult<bool> {
        self.0.lock().unwrap().mixed = ordered_paths.to_vec();
        if fail_at(&self.0) == Some(FailAt::MixerUnavailable) {
            return Err(ServiceError::Process("Failed to execute ffmpeg".into()));
        }
        tokio::fs::write(output_path, b"mixed").await?;
        Ok(fail_at(&self.0) != Some(FailAt::FinalCombination))
    }
}

/// Scratch directories plus switches for the fake collaborators.
pub struct Fixture {
    dir: TempDir,
    controls: Shared,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            controls: Shared::default(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn music_dir(&self) -> PathBuf {
        self.root().join("music")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root().join("cache").join("audio")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root().join("logs")
    }

    pub fn progress_dir(&self) -> PathBuf {
        self.root().join("progress")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("output")
    }

    pub fn add_artist(&self, artist: &str) -> PathBuf {
        let dir = self.music_dir().join(artist);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn add_song(&self, artist: &str, file: &str) -> PathBuf {
        let path = self.add_artist(artist).join(file);
        std::fs::write(&path, b"song bytes").unwrap();
        path
    }

    pub fn fail_at(&self, step: FailAt) {
        self.controls.lock().unwrap().fail_at = Some(step);
    }

    pub fn set_synth_delay(&self, delay: Duration) {
        self.controls.lock().unwrap().synth_delay = delay;
    }

    /// Inputs of the last mixer call, in order.
    pub fn mixed_inputs(&self) -> Vec<PathBuf> {
        self.controls.lock().unwrap().mixed.clone()
    }

    pub fn library(&self) -> MusicLibrary {
        MusicLibrary::new(self.music_dir())
    }

    pub fn progress_store(&self) -> ProgressStore {
        ProgressStore::new(self.progress_dir())
    }

    pub async fn progress_sessions(&self) -> Vec<ProgressSession> {
        let store = self.progress_store();
        let mut sessions = Vec::new();
        let Ok(entries) = std::fs::read_dir(self.progress_dir()) else {
            return sessions;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let id = path.file_stem().unwrap().to_string_lossy().into_owned();
                sessions.push(store.get_progress(&id).await.unwrap());
            }
        }
        sessions
    }
}

pub fn fake_pipeline(fixture: &Fixture) -> RadioPipeline {
    let services = Collaborators {
        transcriber: Arc::new(FakeTranscriber),
        generator: Arc::new(FakeGenerator(fixture.controls.clone())),
        synthesizer: Arc::new(FakeSynthesizer(fixture.controls.clone())),
        mixer: Arc::new(FakeMixer(fixture.controls.clone())),
    };
    RadioPipeline::new(
        fixture.library(),
        fixture.progress_store(),
        fixture.audio_dir(),
        services,
    )
}

pub fn fake_queue(fixture: &Fixture) -> TaskQueue {
    let config = WorkerConfig {
        poll_interval_ms: 20,
        ..WorkerConfig::default()
    };
    TaskQueue::new(Arc::new(fake_pipeline(fixture)), fixture.logs_dir(), config)
}

pub async fn wait_for_terminal(queue: &TaskQueue, task_id: &str) -> Task {
    for _ in 0..1000 {
        if let Some(task) = queue.get_task(task_id) {
            if task.status.is_terminal() {
                return task;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} did not finish", task_id);
}

/// Submits one generation task on a fresh queue and waits for it to finish.
pub async fn run_generation(fixture: &Fixture, params: Value) -> Task {
    let queue = fake_queue(fixture);
    let receipt = queue.create_task(TaskKind::GenerateRadio, params).unwrap();
    wait_for_terminal(&queue, &receipt.task_id).await
}

/// File names currently in the synthesized audio directory.
pub fn audio_files(fixture: &Fixture) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(fixture.audio_dir()) else {
        return Vec::new();
    };
    let mut names: Vec<_> = entries
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
