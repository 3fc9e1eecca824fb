use chrono::Utc;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::errors::ProgressError;
use crate::models::{DjOptions, ProgressSession, ProgressStep, SessionStatus, StepStatus};

/// File-backed progress sessions, one pretty-printed JSON document per id.
///
/// Every mutation is a full read-modify-write of the session file. Mutations
/// from this process are serialized, and writes go through a temporary file
/// followed by a rename so readers never observe a partial document.
#[derive(Clone, Debug)]
pub struct ProgressStore {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn create_session(
        &self,
        artist_name: &str,
        enable_dj_transitions: bool,
        dj_options: DjOptions,
    ) -> Result<String, ProgressError> {
        let id = uuid::Uuid::new_v4().to_string();
        let session = ProgressSession::new(
            id.clone(),
            artist_name,
            enable_dj_transitions,
            dj_options,
            Utc::now(),
        );

        let _guard = self.write_lock.lock().await;
        self.save(&session).await?;
        tracing::debug!("Created progress session {} for {}", id, artist_name);
        Ok(id)
    }

    pub async fn get_progress(&self, progress_id: &str) -> Result<ProgressSession, ProgressError> {
        self.load(progress_id).await
    }

    pub async fn update_step(
        &self,
        progress_id: &str,
        step: ProgressStep,
        status: StepStatus,
        data: Option<Value>,
    ) -> Result<ProgressSession, ProgressError> {
        self.mutate(progress_id, |session| session.apply_step(step, status, data))
            .await
    }

    pub async fn update_audio_segment(
        &self,
        progress_id: &str,
        segment_index: usize,
        status: StepStatus,
        file_path: Option<String>,
    ) -> Result<ProgressSession, ProgressError> {
        self.mutate(progress_id, |session| {
            session.apply_segment(segment_index, status, file_path)
        })
        .await
    }

    pub async fn update_dj_transition(
        &self,
        progress_id: &str,
        transition_index: usize,
        status: StepStatus,
        file_path: Option<String>,
    ) -> Result<ProgressSession, ProgressError> {
        self.mutate(progress_id, |session| {
            session.apply_transition(transition_index, status, file_path)
        })
        .await
    }

    pub async fn set_status(
        &self,
        progress_id: &str,
        status: SessionStatus,
    ) -> Result<ProgressSession, ProgressError> {
        self.mutate(progress_id, |session| session.status = status).await
    }

    async fn mutate<F>(&self, progress_id: &str, apply: F) -> Result<ProgressSession, ProgressError>
    where
        F: FnOnce(&mut ProgressSession),
    {
        let _guard = self.write_lock.lock().await;
        let mut session = self.load(progress_id).await?;
        apply(&mut session);
        self.save(&session).await?;
        Ok(session)
    }

    async fn load(&self, progress_id: &str) -> Result<ProgressSession, ProgressError> {
        let path = self
            .session_path(progress_id)
            .ok_or_else(|| ProgressError::NotFound(progress_id.to_string()))?;

        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProgressError::NotFound(progress_id.to_string()));
            }
            Err(e) => return Err(ProgressError::Io(e)),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn save(&self, session: &ProgressSession) -> Result<(), ProgressError> {
        let path = self
            .session_path(&session.id)
            .ok_or_else(|| ProgressError::NotFound(session.id.clone()))?;
        fs::create_dir_all(&self.dir).await?;

        let body = serde_json::to_vec_pretty(session)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, body).await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    // Ids are UUIDs; anything else cannot name a session file.
    fn session_path(&self, progress_id: &str) -> Option<PathBuf> {
        let valid = !progress_id.is_empty()
            && progress_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        valid.then(|| self.dir.join(format!("{}.json", progress_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, ProgressStore) {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path().join("progress"));
        (dir, store)
    }

    #[tokio::test]
    async fn step_update_survives_reload() {
        let (dir, store) = store();
        let id = store
            .create_session("Test Artist", true, DjOptions::default())
            .await
            .unwrap();

        let written = store
            .update_step(
                &id,
                ProgressStep::ScriptGeneration,
                StepStatus::Completed,
                Some(json!({"script": "Hello listeners"})),
            )
            .await
            .unwrap();

        let reloaded = store.get_progress(&id).await.unwrap();
        assert_eq!(written, reloaded);
        assert_eq!(reloaded.current_step, ProgressStep::ScriptGeneration);

        // A fresh store over the same directory reads the same document.
        let reopened = ProgressStore::new(dir.path().join("progress"));
        assert_eq!(reopened.get_progress(&id).await.unwrap(), reloaded);
    }

    #[tokio::test]
    async fn repeated_segment_updates_overwrite() {
        let (_dir, store) = store();
        let id = store
            .create_session("Test Artist", true, DjOptions::default())
            .await
            .unwrap();

        store
            .update_audio_segment(&id, 0, StepStatus::InProgress, None)
            .await
            .unwrap();
        store
            .update_audio_segment(&id, 0, StepStatus::Completed, Some("intro.mp3".into()))
            .await
            .unwrap();
        store
            .update_dj_transition(&id, 1, StepStatus::Completed, Some("t1.mp3".into()))
            .await
            .unwrap();
        store
            .update_dj_transition(&id, 1, StepStatus::Completed, Some("t1.mp3".into()))
            .await
            .unwrap();

        let session = store.get_progress(&id).await.unwrap();
        assert_eq!(session.steps.audio_generation.segments.len(), 1);
        assert_eq!(
            session.steps.audio_generation.segments[0].file_path.as_deref(),
            Some("intro.mp3")
        );
        assert_eq!(session.steps.dj_transitions.transitions.len(), 2);
        assert_eq!(
            session.steps.dj_transitions.transitions[0].status,
            StepStatus::Pending
        );
    }

    #[tokio::test]
    async fn missing_and_malformed_ids_are_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.get_progress("0000-missing").await,
            Err(ProgressError::NotFound(_))
        ));
        assert!(matches!(
            store.get_progress("../../etc/passwd").await,
            Err(ProgressError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn status_updates_persist() {
        let (_dir, store) = store();
        let id = store
            .create_session("Test Artist", false, DjOptions::default())
            .await
            .unwrap();
        store.set_status(&id, SessionStatus::Failed).await.unwrap();
        assert_eq!(
            store.get_progress(&id).await.unwrap().status,
            SessionStatus::Failed
        );
    }
}
