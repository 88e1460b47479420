//! SubRip subtitle generation from word timings.
//!
//! Words are grouped into cues of at most [`MAX_WORDS_PER_CUE`]. Each cue is
//! rendered on two lines split at the middle word, so a single-word cue has an
//! empty first line.

use std::fmt::Write;

use subgen_models::{format_srt_timestamp, TimedWord};
use thiserror::Error;

/// Words per cue.
pub const MAX_WORDS_PER_CUE: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubtitleError {
    #[error("Transcript has no words")]
    EmptyTranscript,
}

pub type SubtitleResult<T> = Result<T, SubtitleError>;

/// One numbered subtitle block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCue {
    /// 1-based cue number
    pub index: usize,
    /// Start of the first word, in ms
    pub start: u64,
    /// End of the last word, in ms
    pub end: u64,
    pub first_line: String,
    pub second_line: String,
}

impl SubtitleCue {
    fn from_words(index: usize, words: &[TimedWord]) -> Self {
        let mid = words.len() / 2;
        let join = |group: &[TimedWord]| {
            group
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        };

        Self {
            index,
            start: words.first().map(|w| w.start).unwrap_or_default(),
            end: words.last().map(|w| w.end).unwrap_or_default(),
            first_line: join(&words[..mid]),
            second_line: join(&words[mid..]),
        }
    }

    fn write_to(&self, out: &mut String) {
        // Writing to a String cannot fail
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n{}\n\n",
            self.index,
            format_srt_timestamp(self.start),
            format_srt_timestamp(self.end),
            self.first_line,
            self.second_line
        );
    }
}

/// Group words into cues.
pub fn build_cues(words: &[TimedWord]) -> SubtitleResult<Vec<SubtitleCue>> {
    if words.is_empty() {
        return Err(SubtitleError::EmptyTranscript);
    }

    Ok(words
        .chunks(MAX_WORDS_PER_CUE)
        .enumerate()
        .map(|(i, group)| SubtitleCue::from_words(i + 1, group))
        .collect())
}

/// Render words as an SRT document.
pub fn build_srt(words: &[TimedWord]) -> SubtitleResult<String> {
    let cues = build_cues(words)?;
    let mut out = String::new();
    for cue in &cues {
        cue.write_to(&mut out);
    }
    Ok(out)
}
