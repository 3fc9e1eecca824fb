use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An audio file found in an artist's library directory.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Song {
    pub name: String,
    pub path: PathBuf,
    pub format: String,
    pub size: u64,
}

/// Song metadata plus transcript, cached as a JSON sidecar next to the song.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SongData {
    pub artist: String,
    pub song_name: String,
    pub transcript: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct ArtistInfo {
    pub name: String,
    pub song_count: usize,
    pub total_size: u64,
    pub songs: Vec<Song>,
}
