use std::path::{Path, PathBuf};
use tokio::fs;

use crate::errors::LibraryError;
use crate::models::{ArtistInfo, Song};

const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "wav", "m4a"];

/// Read access to the on-disk song library: one directory per artist.
#[derive(Clone, Debug)]
pub struct MusicLibrary {
    base_path: PathBuf,
}

impl MusicLibrary {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub async fn list_artists(&self) -> Result<Vec<String>, LibraryError> {
        fs::create_dir_all(&self.base_path).await?;

        let mut artists = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    artists.push(name.to_string());
                }
            }
        }
        artists.sort();
        Ok(artists)
    }

    /// Audio files in the artist's directory, ordered by file name.
    pub async fn artist_songs(&self, artist_name: &str) -> Result<Vec<Song>, LibraryError> {
        let artist_path = self.artist_dir(artist_name)?;
        if !fs::try_exists(&artist_path).await? {
            return Err(LibraryError::ArtistNotFound(artist_name.to_string()));
        }

        tracing::debug!("Scanning for songs in {}", artist_path.display());

        let mut songs = Vec::new();
        let mut entries = fs::read_dir(&artist_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(format) = audio_format(&path) else {
                continue;
            };
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            songs.push(Song {
                name,
                path,
                format,
                size: metadata.len(),
            });
        }
        songs.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::debug!("Found {} audio files for {}", songs.len(), artist_name);
        Ok(songs)
    }

    pub async fn artist_info(&self, artist_name: &str) -> Result<ArtistInfo, LibraryError> {
        let songs = self.artist_songs(artist_name).await?;
        Ok(ArtistInfo {
            name: artist_name.to_string(),
            song_count: songs.len(),
            total_size: songs.iter().map(|s| s.size).sum(),
            songs,
        })
    }

    pub async fn create_artist(&self, artist_name: &str) -> Result<PathBuf, LibraryError> {
        let artist_path = self.artist_dir(artist_name)?;
        if fs::try_exists(&artist_path).await? {
            return Err(LibraryError::ArtistExists(artist_name.to_string()));
        }
        fs::create_dir_all(&artist_path).await?;
        tracing::info!("Created artist directory {}", artist_path.display());
        Ok(artist_path)
    }

    // Artist names map to a single directory component under the base path.
    fn artist_dir(&self, artist_name: &str) -> Result<PathBuf, LibraryError> {
        let trimmed = artist_name.trim();
        let invalid = trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(|c: char| c == '/' || c == '\\');
        if invalid {
            return Err(LibraryError::InvalidArtistName(artist_name.to_string()));
        }
        Ok(self.base_path.join(trimmed))
    }
}

fn audio_format(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    AUDIO_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn library_with(files: &[&str]) -> (TempDir, MusicLibrary) {
        let dir = TempDir::new().unwrap();
        let artist = dir.path().join("Test Artist");
        std::fs::create_dir_all(&artist).unwrap();
        for file in files {
            std::fs::write(artist.join(file), b"audio").unwrap();
        }
        let library = MusicLibrary::new(dir.path());
        (dir, library)
    }

    #[tokio::test]
    async fn lists_only_audio_files_in_name_order() {
        let (_dir, library) = library_with(&["b.WAV", "a.mp3", "notes.txt", "a.json", "c.m4a"]).await;

        let songs = library.artist_songs("Test Artist").await.unwrap();
        let names: Vec<_> = songs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(songs[1].format, "wav");
        assert_eq!(songs[0].size, 5);
    }

    #[tokio::test]
    async fn unknown_artist_is_an_error() {
        let (_dir, library) = library_with(&[]).await;
        let err = library.artist_songs("Nobody").await.unwrap_err();
        assert!(matches!(err, LibraryError::ArtistNotFound(name) if name == "Nobody"));
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let (_dir, library) = library_with(&[]).await;
        assert!(matches!(
            library.artist_songs("../etc").await,
            Err(LibraryError::InvalidArtistName(_))
        ));
        assert!(matches!(
            library.create_artist("..").await,
            Err(LibraryError::InvalidArtistName(_))
        ));
    }

    #[tokio::test]
    async fn create_then_list_artists() {
        let (_dir, library) = library_with(&["a.mp3"]).await;
        library.create_artist("Another").await.unwrap();
        assert!(matches!(
            library.create_artist("Another").await,
            Err(LibraryError::ArtistExists(_))
        ));

        let artists = library.list_artists().await.unwrap();
        assert_eq!(artists, ["Another", "Test Artist"]);

        let info = library.artist_info("Test Artist").await.unwrap();
        assert_eq!(info.song_count, 1);
        assert_eq!(info.total_size, 5);
    }
}
