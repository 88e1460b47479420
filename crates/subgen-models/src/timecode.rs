//! SRT timecode formatting and parsing.
//!
//! SRT timecodes look like `HH:MM:SS,mmm`. Hours are a raw count and are
//! never wrapped at 24, so long recordings keep increasing hour values.

use thiserror::Error;

/// Timecode parsing error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimecodeError {
    #[error("Invalid timecode format '{0}'. Expected HH:MM:SS,mmm")]
    InvalidFormat(String),

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),
}

/// Format a millisecond offset as an SRT timecode.
///
/// # Examples
/// ```
/// use subgen_models::timecode::format_srt_timestamp;
/// assert_eq!(format_srt_timestamp(0), "00:00:00,000");
/// assert_eq!(format_srt_timestamp(3_723_004), "01:02:03,004");
/// ```
pub fn format_srt_timestamp(ms: u64) -> String {
    let total_secs = ms / 1000;
    let millis = ms % 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

/// Parse an SRT timecode back into milliseconds.
pub fn parse_srt_timestamp(ts: &str) -> Result<u64, TimecodeError> {
    let (hms, millis) = ts
        .trim()
        .split_once(',')
        .ok_or_else(|| TimecodeError::InvalidFormat(ts.to_string()))?;

    let parts: Vec<&str> = hms.split(':').collect();
    if parts.len() != 3 || millis.len() != 3 {
        return Err(TimecodeError::InvalidFormat(ts.to_string()));
    }

    let hours = parse_component("hours", parts[0])?;
    let mins = parse_component("minutes", parts[1])?;
    let secs = parse_component("seconds", parts[2])?;
    let millis = parse_component("milliseconds", millis)?;

    if mins >= 60 || secs >= 60 {
        return Err(TimecodeError::InvalidFormat(ts.to_string()));
    }

    Ok(((hours * 3600 + mins * 60 + secs) * 1000) + millis)
}

fn parse_component(name: &'static str, value: &str) -> Result<u64, TimecodeError> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(TimecodeError::InvalidValue(name, value.to_string()));
    }
    value
        .parse()
        .map_err(|_| TimecodeError::InvalidValue(name, value.to_string()))
}
