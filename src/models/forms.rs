use serde::{Deserialize, Serialize};

/// Body of `POST /api/start-generation`.
#[derive(Debug, Deserialize, Default)]
pub struct GenerationRequest {
    pub artist_name: Option<String>,
    pub enable_dj_transitions: Option<bool>,
    pub is_testing: Option<bool>,
    pub dj_options: Option<DjOptions>,
}

#[derive(Debug, Deserialize)]
pub struct CreateArtistForm {
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DjOptions {
    pub style: String,
    pub length: String,
    pub speed: f32,
}

impl Default for DjOptions {
    fn default() -> Self {
        Self {
            style: "smooth".to_string(),
            length: "medium".to_string(),
            speed: 1.1,
        }
    }
}

/// Parameters of a `generate_radio` task, stored as the task's params.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct GenerateRadioParams {
    pub artist_name: String,
    #[serde(default)]
    pub enable_dj_transitions: bool,
    #[serde(default = "default_testing")]
    pub is_testing: bool,
    #[serde(default)]
    pub dj_options: DjOptions,
}

fn default_testing() -> bool {
    true
}

impl GenerationRequest {
    /// Validates the request and turns it into task parameters.
    pub fn into_params(self) -> Option<GenerateRadioParams> {
        let artist_name = self.artist_name?.trim().to_string();
        if artist_name.is_empty() {
            return None;
        }
        Some(GenerateRadioParams {
            artist_name,
            enable_dj_transitions: self.enable_dj_transitions.unwrap_or(false),
            is_testing: self.is_testing.unwrap_or(true),
            dj_options: self.dj_options.unwrap_or_default(),
        })
    }
}
