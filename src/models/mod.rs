mod forms;
mod progress;
mod song;
mod task;

pub use forms::{CreateArtistForm, DjOptions, GenerateRadioParams, GenerationRequest};
pub use progress::{ProgressSession, ProgressStep, SessionStatus, StepStatus};
pub use song::{ArtistInfo, Song, SongData};
pub use task::{log_file_name, Task, TaskKind, TaskReceipt, TaskStatus, TaskStatusView};
