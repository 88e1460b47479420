//! Chunk ordering.
//!
//! Subtitle names end in `_<index>.srt`. Names without an index sort after
//! every indexed name.

use std::sync::LazyLock;

use regex::Regex;

static CHUNK_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d+)\.srt$").expect("chunk index pattern is valid"));

/// Sort key of a subtitle name.
///
/// `Indexed` orders before `Unindexed` for every index, `u64::MAX` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChunkKey {
    Indexed(u64),
    /// No `_<index>.srt` suffix, or an index too large for `u64`.
    Unindexed,
}

/// Chunk index of a subtitle name.
pub fn chunk_sort_key(name: &str) -> ChunkKey {
    CHUNK_INDEX
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .map_or(ChunkKey::Unindexed, ChunkKey::Indexed)
}

/// Sort subtitle names by chunk index. Ties keep their input order.
pub fn sort_chunk_results(names: &mut [String]) {
    names.sort_by_key(|name| chunk_sort_key(name));
}
