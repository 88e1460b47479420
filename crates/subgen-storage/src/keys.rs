//! Object key layout.
//!
//! Everything for a clip lives under `{user_id}/{clip_id}/`:
//! - `audios/` holds the chunks produced upstream
//! - `subtitles/` holds the generated SRT files

/// Key of an audio chunk.
pub fn audio_key(user_id: &str, clip_id: &str, chunk: &str) -> String {
    format!("{}/{}/audios/{}", user_id, clip_id, chunk)
}

/// Key of a generated subtitle file.
pub fn subtitle_key(user_id: &str, clip_id: &str, subtitle_name: &str) -> String {
    format!("{}/{}/subtitles/{}", user_id, clip_id, subtitle_name)
}
