//! Local staging of chunk files.
//!
//! Each clip stages its files under `{work_dir}/{user_id}/{clip_id}/`, and each
//! chunk gets its own directory below that, so references sharing a base name
//! never touch each other's files. A chunk's directory is removed when its
//! [`StagedFiles`] guard drops, whichever way the chunk pipeline exits.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

/// Staging directory of a clip, or `None` when an ID is not a single path component.
pub fn clip_staging_dir(work_dir: &Path, user_id: &str, clip_id: &str) -> Option<PathBuf> {
    Some(work_dir.join(safe_component(user_id)?).join(safe_component(clip_id)?))
}

/// File name of a chunk reference, or `None` when it has no usable one.
///
/// References may carry a directory prefix; only the last component is staged.
pub fn chunk_file_name(chunk: &str) -> Option<&str> {
    if chunk.ends_with('/') || chunk.ends_with('\\') {
        return None;
    }
    let name = chunk.rsplit(['/', '\\']).next()?;
    safe_component(name)
}

/// Subtitle name for an audio file name: the extension is replaced by `.srt`.
pub fn subtitle_name(audio_file_name: &str) -> String {
    let stem = Path::new(audio_file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(audio_file_name);
    format!("{}.srt", stem)
}

fn safe_component(s: &str) -> Option<&str> {
    let invalid = s.is_empty() || s == "." || s == ".." || s.contains(['/', '\\', '\0']);
    (!invalid).then_some(s)
}

/// Remove a clip's staging directory if nothing is left in it.
pub async fn remove_empty_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("Staging directory {} not removed: {}", dir.display(), e);
        }
    }
}

/// Files staged for one chunk, deleted with their directory on drop.
#[derive(Debug)]
pub struct StagedFiles {
    dir: Option<TempDir>,
    audio: PathBuf,
    subtitle: PathBuf,
}

impl StagedFiles {
    /// Create a private directory inside `clip_dir` for `audio_file_name`.
    pub fn new_in(clip_dir: &Path, audio_file_name: &str) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("chunk-").tempdir_in(clip_dir)?;
        Ok(Self {
            audio: dir.path().join(audio_file_name),
            subtitle: dir.path().join(subtitle_name(audio_file_name)),
            dir: Some(dir),
        })
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio
    }

    pub fn subtitle_path(&self) -> &Path {
        &self.subtitle
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!("Removed chunk staging dir {}", path.display()),
            Err(e) => warn!("Failed to remove chunk staging dir {}: {}", path.display(), e),
        }
    }
}
