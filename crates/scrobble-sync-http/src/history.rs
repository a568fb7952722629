use std::collections::HashSet;

use scrobble_sync::Track;
use serde::{Deserialize, Deserializer};

pub const DAY_IN_SECONDS: i64 = 86_400;

/// Keep the first occurrence of each name/artist pair, preserving order.
pub(crate) fn distinct(tracks: impl IntoIterator<Item = Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|track| seen.insert(track.key()))
        .collect()
}

/// Accept a non-negative integer encoded either as a JSON number or a string.
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
