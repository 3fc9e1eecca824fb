use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{PipelineError, PipelineResult, ProgressError, StepContext};
use crate::models::{
    GenerateRadioParams, ProgressSession, ProgressStep, SessionStatus, Song, SongData, StepStatus,
};
use crate::services::mixer::AudioMixer;
use crate::services::music_library::MusicLibrary;
use crate::services::progress_store::ProgressStore;
use crate::services::script_generator::{ScriptGenerator, ScriptRequest};
use crate::services::speech::SpeechSynthesizer;
use crate::services::task_queue::{TaskContext, TaskOutcome};
use crate::services::transcriber::Transcriber;
use crate::worker::script;

const INTRO_MAX_TOKENS: u32 = 500;
const ENHANCE_MAX_TOKENS: u32 = 700;
const TRANSITION_MAX_TOKENS: u32 = 300;

/// External services the pipeline delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub generator: Arc<dyn ScriptGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub mixer: Arc<dyn AudioMixer>,
}

/// Builds one radio show for an artist: songs, intro script, markup, speech,
/// optional DJ transitions, and the final mix.
pub struct RadioPipeline {
    library: MusicLibrary,
    progress: ProgressStore,
    audio_dir: PathBuf,
    services: Collaborators,
}

/// Scratch directory for one run. Audio is written here and only moved to
/// its published name in the audio directory once the whole show is built.
struct Staging {
    dir: PathBuf,
    audio_dir: PathBuf,
    files: Vec<String>,
}

impl Staging {
    fn new(audio_dir: &Path) -> Self {
        let run = uuid::Uuid::new_v4().simple().to_string();
        Self {
            dir: audio_dir.join(format!(".run_{}", run)),
            audio_dir: audio_dir.to_path_buf(),
            files: Vec::new(),
        }
    }

    async fn prepare(&self) -> PipelineResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| PipelineError::Storage {
                path: self.dir.clone(),
                source,
            })
    }

    /// Claims `name` for this run and returns the staged path to write it to.
    fn reserve(&mut self, name: String) -> PathBuf {
        let path = self.dir.join(&name);
        self.files.push(name);
        path
    }

    /// Where a staged file ends up once published.
    fn published(&self, staged: &Path) -> PathBuf {
        self.audio_dir.join(file_name(staged))
    }

    /// Moves every reserved file into the audio directory, in reservation
    /// order. On failure the files this call already moved are removed.
    async fn publish(&self, ctx: &TaskContext) -> PipelineResult<()> {
        let mut moved: Vec<PathBuf> = Vec::with_capacity(self.files.len());
        for name in &self.files {
            let target = self.audio_dir.join(name);
            if let Err(source) = tokio::fs::rename(self.dir.join(name), &target).await {
                for path in moved {
                    remove_quietly(ctx, &path).await;
                }
                return Err(PipelineError::Storage { path: target, source });
            }
            moved.push(target);
        }
        Ok(())
    }

    async fn discard(self, ctx: &TaskContext) {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => ctx
                .log()
                .info(format!("Removed staging directory {}", self.dir.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => ctx
                .log()
                .warn(format!("Could not remove {}: {}", self.dir.display(), e)),
        }
    }
}

async fn remove_quietly(ctx: &TaskContext, path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        ctx.log()
            .warn(format!("Could not remove {}: {}", path.display(), e));
    }
}

/// Writes to the run's progress session. Failures are only logged.
struct SessionTracker<'a> {
    store: &'a ProgressStore,
    id: Option<String>,
    ctx: &'a TaskContext,
}

impl SessionTracker<'_> {
    async fn step(&self, step: ProgressStep, status: StepStatus, data: Option<Value>) {
        if let Some(id) = &self.id {
            let result = self.store.update_step(id, step, status, data).await;
            self.check(result);
        }
    }

    async fn segment(&self, index: usize, status: StepStatus, file: Option<&Path>) {
        if let Some(id) = &self.id {
            let result = self
                .store
                .update_audio_segment(id, index, status, file.map(display_path))
                .await;
            self.check(result);
        }
    }

    async fn transition(&self, index: usize, status: StepStatus, file: Option<&Path>) {
        if let Some(id) = &self.id {
            let result = self
                .store
                .update_dj_transition(id, index, status, file.map(display_path))
                .await;
            self.check(result);
        }
    }

    async fn status(&self, status: SessionStatus) {
        if let Some(id) = &self.id {
            let result = self.store.set_status(id, status).await;
            self.check(result);
        }
    }

    fn check(&self, result: Result<ProgressSession, ProgressError>) {
        if let Err(e) = result {
            self.ctx.log().warn(format!("Progress session update failed: {}", e));
        }
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Cached transcript location: the song's full file name plus `.json`, so
/// `a.mp3` and `a.wav` never share one.
fn sidecar_path(song: &Path) -> PathBuf {
    let mut name = song.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

async fn is_non_empty(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len() > 0)
        .unwrap_or(false)
}

struct Show {
    script: String,
    enhanced_script: String,
    intro: PathBuf,
    transitions: Vec<PathBuf>,
    full_show: PathBuf,
}

impl RadioPipeline {
    pub fn new(
        library: MusicLibrary,
        progress: ProgressStore,
        audio_dir: impl Into<PathBuf>,
        services: Collaborators,
    ) -> Self {
        Self {
            library,
            progress,
            audio_dir: audio_dir.into(),
            services,
        }
    }

    pub async fn run(&self, ctx: &TaskContext, params: GenerateRadioParams) -> PipelineResult<TaskOutcome> {
        ctx.log().info(format!(
            "Processing radio generation for artist: {}",
            params.artist_name
        ));

        let session_id = match self
            .progress
            .create_session(
                &params.artist_name,
                params.enable_dj_transitions,
                params.dj_options.clone(),
            )
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                ctx.log().warn(format!("Could not create progress session: {}", e));
                None
            }
        };
        let session = SessionTracker {
            store: &self.progress,
            id: session_id.clone(),
            ctx,
        };
        session.status(SessionStatus::Processing).await;

        let mut staging = Staging::new(&self.audio_dir);
        let produced = self.produce(ctx, &params, &session, &mut staging).await;
        staging.discard(ctx).await;

        match produced {
            Ok(show) => {
                session.status(SessionStatus::Completed).await;
                let output = file_name(&show.full_show);
                ctx.progress(
                    "completed",
                    100,
                    &format!("Radio generation completed. Output file: {}", output),
                );
                Ok(TaskOutcome {
                    result: json!({
                        "script": show.script,
                        "enhanced_script": show.enhanced_script,
                        "intro_audio": file_name(&show.intro),
                        "full_show_audio": output,
                        "transitions": show.transitions.iter().map(|p| file_name(p)).collect::<Vec<_>>(),
                        "progress_id": session_id,
                    }),
                    output_file: Some(output),
                })
            }
            Err(e) => {
                ctx.log().error(format!("Radio generation failed: {}", e));
                session.status(SessionStatus::Failed).await;
                Err(e)
            }
        }
    }

    async fn produce(
        &self,
        ctx: &TaskContext,
        params: &GenerateRadioParams,
        session: &SessionTracker<'_>,
        staging: &mut Staging,
    ) -> PipelineResult<Show> {
        let artist = params.artist_name.as_str();

        ctx.progress("fetching_songs", 10, "Fetching songs data with transcripts...");
        let songs = self.fetch_songs(ctx, artist).await.step("fetching_songs")?;

        ctx.progress("script_generation", 20, "Generating radio script...");
        session
            .step(ProgressStep::ScriptGeneration, StepStatus::InProgress, None)
            .await;
        let script = self
            .generate_intro(artist, &songs)
            .await
            .step("script_generation")?;
        session
            .step(
                ProgressStep::ScriptGeneration,
                StepStatus::Completed,
                Some(json!({ "script": script })),
            )
            .await;

        ctx.progress("script_enhancement", 40, "Enhancing script with speech markup...");
        session
            .step(ProgressStep::ScriptSegmentation, StepStatus::InProgress, None)
            .await;
        let enhanced_script = self.enhance(&script).await.step("script_enhancement")?;
        session
            .step(
                ProgressStep::ScriptSegmentation,
                StepStatus::Completed,
                Some(json!({ "enhanced_script": enhanced_script })),
            )
            .await;

        ctx.progress("audio_generation", 60, "Generating intro audio...");
        session
            .step(ProgressStep::AudioGeneration, StepStatus::InProgress, None)
            .await;
        session.segment(0, StepStatus::InProgress, None).await;
        staging.prepare().await.step("audio_generation")?;
        let intro = staging.reserve(format!("{}_radio_intro_combined.mp3", artist));
        self.synthesize(&enhanced_script, &intro)
            .await
            .step("audio_generation")?;
        session
            .segment(0, StepStatus::Completed, Some(&staging.published(&intro)))
            .await;
        ctx.log().info(format!("Intro audio generated: {}", intro.display()));

        let mut ordered = vec![intro.clone()];
        let mut transitions = Vec::new();
        let pairs = songs.len().saturating_sub(1);
        if params.enable_dj_transitions && pairs > 0 {
            session
                .step(ProgressStep::DjTransitions, StepStatus::InProgress, None)
                .await;
        }

        for (i, (song, data)) in songs.iter().enumerate() {
            if !song.path.exists() {
                return Err(PipelineError::SongMissing(song.path.clone())).step("audio_generation");
            }
            ordered.push(song.path.clone());

            if !params.enable_dj_transitions || i >= pairs {
                continue;
            }
            let percent = 60 + (20 * i / pairs) as u8;
            ctx.progress(
                "dj_transitions",
                percent,
                &format!("Generating DJ transition {} of {}", i + 1, pairs),
            );
            session.transition(i, StepStatus::InProgress, None).await;
            let path = self
                .transition(i, artist, data, &songs[i + 1].1, params, staging)
                .await
                .step("dj_transitions")?;
            session
                .transition(i, StepStatus::Completed, Some(&staging.published(&path)))
                .await;
            ordered.push(path.clone());
            transitions.push(path);
        }

        session
            .step(ProgressStep::AudioGeneration, StepStatus::Completed, None)
            .await;
        if params.enable_dj_transitions && pairs > 0 {
            session
                .step(ProgressStep::DjTransitions, StepStatus::Completed, None)
                .await;
        }

        ctx.progress("final_combination", 80, "Combining audio files...");
        session
            .step(ProgressStep::FinalCombination, StepStatus::InProgress, None)
            .await;
        let full_show = staging.reserve(format!("{}_full_show.mp3", artist));
        self.combine(&ordered, &full_show)
            .await
            .step("final_combination")?;
        staging.publish(ctx).await.step("final_combination")?;
        let intro = staging.published(&intro);
        let full_show = staging.published(&full_show);
        session
            .step(
                ProgressStep::FinalCombination,
                StepStatus::Completed,
                Some(json!({
                    "full_show_audio": file_name(&full_show),
                    "intro_audio": file_name(&intro),
                })),
            )
            .await;

        Ok(Show {
            script,
            enhanced_script,
            intro,
            transitions,
            full_show,
        })
    }

    /// Songs in library order with their cached or freshly made transcripts.
    async fn fetch_songs(&self, ctx: &TaskContext, artist: &str) -> PipelineResult<Vec<(Song, SongData)>> {
        let songs = self.library.artist_songs(artist).await?;
        if songs.is_empty() {
            return Err(PipelineError::NoSongs(artist.to_string()));
        }

        let mut result = Vec::with_capacity(songs.len());
        for song in songs {
            let sidecar = sidecar_path(&song.path);
            let cached = tokio::fs::read(&sidecar)
                .await
                .ok()
                .and_then(|raw| serde_json::from_slice::<SongData>(&raw).ok());

            let data = match cached {
                Some(data) => data,
                None => {
                    ctx.log().info(format!("Transcribing {}", song.path.display()));
                    let data = SongData {
                        artist: artist.to_string(),
                        song_name: song.name.clone(),
                        transcript: self.services.transcriber.transcribe(&song.path).await,
                    };
                    match serde_json::to_vec_pretty(&data) {
                        Ok(raw) => {
                            if let Err(e) = tokio::fs::write(&sidecar, raw).await {
                                ctx.log().warn(format!(
                                    "Could not cache transcript {}: {}",
                                    sidecar.display(),
                                    e
                                ));
                            }
                        }
                        Err(e) => ctx.log().warn(format!("Could not encode transcript: {}", e)),
                    }
                    data
                }
            };
            result.push((song, data));
        }

        ctx.log().info(format!("Found {} songs for {}", result.len(), artist));
        Ok(result)
    }

    async fn generate_intro(&self, artist: &str, songs: &[(Song, SongData)]) -> PipelineResult<String> {
        let data: Vec<SongData> = songs.iter().map(|(_, data)| data.clone()).collect();
        let request = ScriptRequest {
            artist: artist.to_string(),
            name: format!("{} radio intro", artist),
            transcript: script::intro_prompt(&data),
        };
        let text = self
            .services
            .generator
            .process(&request, Some(INTRO_MAX_TOKENS))
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::EmptyScript);
        }
        Ok(text.to_string())
    }

    async fn enhance(&self, text: &str) -> PipelineResult<String> {
        let request = ScriptRequest {
            artist: "voice_enhancement".to_string(),
            name: "enhance_script".to_string(),
            transcript: script::enhancement_prompt(text),
        };
        let response = self
            .services
            .generator
            .process(&request, Some(ENHANCE_MAX_TOKENS))
            .await?;
        let markup = script::extract_markup(&response);
        if markup.is_empty() {
            return Err(PipelineError::EmptyScript);
        }
        Ok(markup)
    }

    async fn synthesize(&self, text: &str, path: &Path) -> PipelineResult<()> {
        self.services.synthesizer.generate(text, path, true).await?;
        if !is_non_empty(path).await {
            return Err(PipelineError::MissingAudio(path.to_path_buf()));
        }
        Ok(())
    }

    async fn transition(
        &self,
        index: usize,
        artist: &str,
        current: &SongData,
        next: &SongData,
        params: &GenerateRadioParams,
        staging: &mut Staging,
    ) -> PipelineResult<PathBuf> {
        let options = &params.dj_options;
        let request = ScriptRequest {
            artist: "AI DJ".to_string(),
            name: "song_transition".to_string(),
            transcript: script::transition_prompt(current, next, &options.style, &options.length),
        };
        let raw = self
            .services
            .generator
            .process(&request, Some(TRANSITION_MAX_TOKENS))
            .await?;
        let text = script::finish_transition(&raw, current, next, &options.length);
        let enhanced = self.enhance(&text).await?;

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let path = staging.reserve(format!("{}_transition_{}_{}.mp3", artist, index, &suffix[..8]));
        self.synthesize(&enhanced, &path).await?;
        Ok(path)
    }

    async fn combine(&self, ordered: &[PathBuf], output: &Path) -> PipelineResult<()> {
        let combined = self.services.mixer.combine(ordered, output).await?;
        if !combined {
            return Err(PipelineError::CombineFailed(ordered.len()));
        }
        if !is_non_empty(output).await {
            return Err(PipelineError::MissingAudio(output.to_path_buf()));
        }
        Ok(())
    }
}
