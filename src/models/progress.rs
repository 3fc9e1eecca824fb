use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::forms::DjOptions;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Processing,
    Completed,
    Failed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// The fixed step keys of a progress session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStep {
    ScriptGeneration,
    ScriptSegmentation,
    AudioGeneration,
    DjTransitions,
    FinalCombination,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub status: StepStatus,
    pub file_path: Option<String>,
}

impl Default for ItemRecord {
    fn default() -> Self {
        Self {
            status: StepStatus::Pending,
            file_path: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScriptStep {
    pub status: StepStatus,
    pub data: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AudioStep {
    pub status: StepStatus,
    #[serde(default)]
    pub data: Option<Value>,
    pub segments: Vec<ItemRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransitionsStep {
    pub status: StepStatus,
    #[serde(default)]
    pub data: Option<Value>,
    pub transitions: Vec<ItemRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CombinationStep {
    pub status: StepStatus,
    pub output_files: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressSteps {
    pub script_generation: ScriptStep,
    pub script_segmentation: ScriptStep,
    pub audio_generation: AudioStep,
    pub dj_transitions: TransitionsStep,
    pub final_combination: CombinationStep,
}

impl Default for ProgressSteps {
    fn default() -> Self {
        let script = ScriptStep {
            status: StepStatus::Pending,
            data: None,
        };
        Self {
            script_generation: script.clone(),
            script_segmentation: script,
            audio_generation: AudioStep {
                status: StepStatus::Pending,
                data: None,
                segments: Vec::new(),
            },
            dj_transitions: TransitionsStep {
                status: StepStatus::Pending,
                data: None,
                transitions: Vec::new(),
            },
            final_combination: CombinationStep {
                status: StepStatus::Pending,
                output_files: None,
            },
        }
    }
}

/// Persisted, step-structured record of one radio generation run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressSession {
    pub id: String,
    pub artist_name: String,
    pub enable_dj_transitions: bool,
    pub dj_options: DjOptions,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub current_step: ProgressStep,
    pub steps: ProgressSteps,
}

impl ProgressSession {
    pub fn new(
        id: String,
        artist_name: &str,
        enable_dj_transitions: bool,
        dj_options: DjOptions,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            artist_name: artist_name.to_string(),
            enable_dj_transitions,
            dj_options,
            created_at: now,
            status: SessionStatus::Created,
            current_step: ProgressStep::ScriptGeneration,
            steps: ProgressSteps::default(),
        }
    }

    /// Sets a step's status and, when given, its payload. For
    /// `final_combination` the payload is the output file listing.
    pub fn apply_step(&mut self, step: ProgressStep, status: StepStatus, data: Option<Value>) {
        let steps = &mut self.steps;
        match step {
            ProgressStep::ScriptGeneration => set_step(
                &mut steps.script_generation.status,
                &mut steps.script_generation.data,
                status,
                data,
            ),
            ProgressStep::ScriptSegmentation => set_step(
                &mut steps.script_segmentation.status,
                &mut steps.script_segmentation.data,
                status,
                data,
            ),
            ProgressStep::AudioGeneration => set_step(
                &mut steps.audio_generation.status,
                &mut steps.audio_generation.data,
                status,
                data,
            ),
            ProgressStep::DjTransitions => set_step(
                &mut steps.dj_transitions.status,
                &mut steps.dj_transitions.data,
                status,
                data,
            ),
            ProgressStep::FinalCombination => set_step(
                &mut steps.final_combination.status,
                &mut steps.final_combination.output_files,
                status,
                data,
            ),
        }
        self.current_step = step;
    }

    pub fn apply_segment(&mut self, index: usize, status: StepStatus, file_path: Option<String>) {
        set_item(&mut self.steps.audio_generation.segments, index, status, file_path);
    }

    pub fn apply_transition(&mut self, index: usize, status: StepStatus, file_path: Option<String>) {
        set_item(&mut self.steps.dj_transitions.transitions, index, status, file_path);
    }
}

fn set_step(slot: &mut StepStatus, payload: &mut Option<Value>, status: StepStatus, data: Option<Value>) {
    *slot = status;
    if data.is_some() {
        *payload = data;
    }
}

// Grows the list with pending placeholders so the index exists, then
// overwrites that entry in place.
fn set_item(items: &mut Vec<ItemRecord>, index: usize, status: StepStatus, file_path: Option<String>) {
    if items.len() <= index {
        items.resize_with(index + 1, ItemRecord::default);
    }
    let item = &mut items[index];
    item.status = status;
    if file_path.is_some() {
        item.file_path = file_path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> ProgressSession {
        ProgressSession::new("p1".into(), "Test Artist", true, DjOptions::default(), Utc::now())
    }

    #[test]
    fn serializes_with_fixed_step_keys() {
        let value = serde_json::to_value(session()).unwrap();
        let steps = value["steps"].as_object().unwrap();
        for key in [
            "script_generation",
            "script_segmentation",
            "audio_generation",
            "dj_transitions",
            "final_combination",
        ] {
            assert_eq!(steps[key]["status"], "pending", "{key}");
        }
        assert_eq!(value["current_step"], "script_generation");
        assert_eq!(value["status"], "created");
    }

    #[test]
    fn segment_updates_pad_and_overwrite() {
        let mut s = session();
        s.apply_segment(2, StepStatus::InProgress, None);
        s.apply_segment(2, StepStatus::Completed, Some("a.mp3".into()));

        let segments = &s.steps.audio_generation.segments;
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], ItemRecord::default());
        assert_eq!(segments[2].status, StepStatus::Completed);
        assert_eq!(segments[2].file_path.as_deref(), Some("a.mp3"));
    }

    #[test]
    fn step_update_keeps_payload_when_none_given() {
        let mut s = session();
        s.apply_step(ProgressStep::ScriptGeneration, StepStatus::InProgress, Some(json!("draft")));
        s.apply_step(ProgressStep::ScriptGeneration, StepStatus::Completed, None);
        assert_eq!(s.steps.script_generation.data, Some(json!("draft")));
        assert_eq!(s.steps.script_generation.status, StepStatus::Completed);

        s.apply_step(ProgressStep::FinalCombination, StepStatus::Completed, Some(json!(["x.mp3"])));
        assert_eq!(s.steps.final_combination.output_files, Some(json!(["x.mp3"])));
        assert_eq!(s.current_step, ProgressStep::FinalCombination);
    }
}
