mod pipeline;
mod script;
mod worker;

pub use pipeline::{Collaborators, RadioPipeline};
pub use worker::worker_process;
