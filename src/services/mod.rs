pub mod mixer;
pub mod music_library;
pub mod progress_store;
pub mod script_generator;
pub mod speech;
pub mod task_log;
pub mod task_queue;
pub mod transcriber;

pub use mixer::FfmpegMixer;
pub use music_library::MusicLibrary;
pub use progress_store::ProgressStore;
pub use script_generator::LlmScriptGenerator;
pub use speech::ElevenLabsSynthesizer;
pub use task_queue::TaskQueue;
pub use transcriber::CommandTranscriber;
