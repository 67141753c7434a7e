use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::content::TitleMeta;

/// Episode reference inside a history item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRef {
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
}

/// One watched item as returned by Trakt's `/sync/history`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub episode: Option<EpisodeRef>,
    #[serde(default)]
    pub watched_at: Option<String>,
}

impl HistoryEntry {
    pub fn episode(season: u32, number: u32) -> Self {
        Self {
            episode: Some(EpisodeRef {
                season: Some(season),
                number: Some(number),
                title: None,
            }),
            watched_at: None,
        }
    }

    /// (season, episode) when both numbers are present and non-zero
    pub fn key(&self) -> Option<(u32, u32)> {
        let episode = self.episode.as_ref()?;
        match (episode.season, episode.number) {
            (Some(s), Some(e)) if s > 0 && e > 0 => Some((s, e)),
            _ => None,
        }
    }
}

/// Watched episodes of one show
#[derive(Debug, Clone, Default)]
pub struct WatchHistory {
    watched: HashSet<(u32, u32)>,
    // raw item count, including items without usable numbers
    entries: usize,
}

impl WatchHistory {
    pub fn from_entries(entries: &[HistoryEntry]) -> Self {
        Self {
            watched: entries.iter().filter_map(HistoryEntry::key).collect(),
            entries: entries.len(),
        }
    }

    /// Whether Trakt returned anything at all for the show
    pub fn has_entries(&self) -> bool {
        self.entries > 0
    }

    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    pub fn len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_watched(&self, season: u32, episode: u32) -> bool {
        self.watched.contains(&(season, episode))
    }

    /// Number of distinct watched episodes in a season
    pub fn watched_in_season(&self, season: u32) -> usize {
        self.watched.iter().filter(|(s, _)| *s == season).count()
    }
}

/// First unwatched episode in season/episode order.
///
/// Seasons run `1..=season_count`, episodes `1..=episode_count` with the
/// default count for seasons the metadata does not describe. Returns `None`
/// when Trakt returned no items or every enumerated episode is watched. Items
/// lacking season or episode numbers still count as history, so such a show
/// resumes at S1E1.
pub fn find_next_episode(history: Option<&WatchHistory>, meta: &TitleMeta) -> Option<(u32, u32)> {
    let history = history.filter(|h| h.has_entries())?;

    (1..=meta.season_count())
        .flat_map(|season| (1..=meta.episode_count(season)).map(move |episode| (season, episode)))
        .find(|&(season, episode)| !history.is_watched(season, episode))
}
