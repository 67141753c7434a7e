use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::content::{ContentKind, ContentRef, TitleMeta};
use crate::history::{HistoryEntry, WatchHistory};

const TRAKT_API_URL: &str = "https://api.trakt.tv";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const HISTORY_LIMIT: u32 = 1000;

#[derive(Error, Debug)]
pub enum TraktError {
    #[error("trakt requires client_id and access_token")]
    NotConfigured,
    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("trakt returned {0}")]
    Status(reqwest::StatusCode),
    #[error("request timed out")]
    Timeout,
    #[error("no trakt entry for {0}")]
    NotFound(String),
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    show: Option<TraktMedia>,
    #[serde(default)]
    movie: Option<TraktMedia>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraktMedia {
    pub title: String,
    #[serde(default)]
    pub year: Option<u16>,
    pub ids: TraktIds,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraktIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trakt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WatchlistItem {
    #[serde(default)]
    movie: Option<TraktMedia>,
    #[serde(default)]
    show: Option<TraktMedia>,
}

/// Watchlist entry reduced to what the catalog rows show
#[derive(Debug, Clone, PartialEq)]
pub struct WatchlistEntry {
    pub kind: ContentKind,
    pub title: String,
    pub year: Option<u16>,
    pub imdb_id: Option<String>,
}

#[derive(Serialize, Default)]
struct HistoryRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    movies: Vec<HistoryMovie>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    shows: Vec<HistoryShow>,
}

#[derive(Serialize)]
struct HistoryMovie {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<u16>,
    ids: TraktIds,
}

#[derive(Serialize)]
struct HistoryShow {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<u16>,
    ids: TraktIds,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    seasons: Vec<HistorySeason>,
}

#[derive(Serialize)]
struct HistorySeason {
    number: u32,
    episodes: Vec<HistoryEpisode>,
}

#[derive(Serialize)]
struct HistoryEpisode {
    number: u32,
}

/// Trakt.tv API v2 client.
///
/// Authentication is out of scope; a client id and an access token obtained
/// elsewhere come from config.
#[derive(Clone)]
pub struct TraktClient {
    client: Client,
    base_url: String,
    client_id: String,
    access_token: String,
}

impl TraktClient {
    pub fn new(client_id: Option<String>, access_token: Option<String>) -> Result<Self, TraktError> {
        Self::with_base_url(client_id, access_token, TRAKT_API_URL.to_string())
    }

    pub fn with_base_url(
        client_id: Option<String>,
        access_token: Option<String>,
        base_url: String,
    ) -> Result<Self, TraktError> {
        let client_id = client_id.filter(|s| !s.is_empty()).ok_or(TraktError::NotConfigured)?;
        let access_token = access_token
            .filter(|s| !s.is_empty())
            .ok_or(TraktError::NotConfigured)?;

        Ok(Self {
            client: Client::new(),
            base_url,
            client_id,
            access_token,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Content-Type", "application/json")
            .header("trakt-api-version", "2")
            .header("trakt-api-key", &self.client_id)
            .header("Authorization", format!("Bearer {}", self.access_token))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, TraktError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "trakt: GET");

        let request = async {
            let response = self.authorized(self.client.get(&url)).send().await?;
            if !response.status().is_success() {
                return Err(TraktError::Status(response.status()));
            }
            Ok(response.json::<T>().await?)
        };

        timeout(REQUEST_TIMEOUT, request)
            .await
            .map_err(|_| TraktError::Timeout)?
    }

    /// Trakt id of a show looked up by IMDb id
    pub async fn find_show(&self, imdb_id: &str) -> Result<TraktMedia, TraktError> {
        let results: Vec<SearchResult> = self
            .get_json(&format!("/search/imdb/{}?type=show", urlencoding::encode(imdb_id)))
            .await?;

        results
            .into_iter()
            .find_map(|r| r.show)
            .filter(|show| show.ids.trakt.is_some())
            .ok_or_else(|| TraktError::NotFound(imdb_id.to_string()))
    }

    pub async fn show_history(&self, imdb_id: &str) -> Result<Vec<HistoryEntry>, TraktError> {
        let show = self.find_show(imdb_id).await?;
        let trakt_id = show.ids.trakt.ok_or_else(|| TraktError::NotFound(imdb_id.to_string()))?;

        let entries: Vec<HistoryEntry> = self
            .get_json(&format!(
                "/sync/history/shows/{}?extended=full&limit={}",
                trakt_id, HISTORY_LIMIT
            ))
            .await?;

        debug!(imdb_id, count = entries.len(), "trakt: loaded show history");
        Ok(entries)
    }

    /// Watch history for a series, or `None` on any failure.
    ///
    /// History only steers auto-resume and watched markers, so errors are
    /// logged and swallowed.
    pub async fn watch_history(&self, imdb_id: &str) -> Option<WatchHistory> {
        match self.show_history(imdb_id).await {
            Ok(entries) => Some(WatchHistory::from_entries(&entries)),
            Err(e) => {
                warn!(imdb_id, error = %e, "trakt: history unavailable");
                None
            }
        }
    }

    /// Mark a movie, or the given episode of a show, as watched
    pub async fn add_to_history(&self, meta: &TitleMeta, content: &ContentRef) -> Result<(), TraktError> {
        let ids = TraktIds {
            imdb: Some(content.imdb_id.clone()),
            ..Default::default()
        };
        let title = meta.display_title().to_string();

        let body = match (content.kind, content.season, content.episode) {
            (ContentKind::Series, Some(season), Some(episode)) => HistoryRequest {
                shows: vec![HistoryShow {
                    title,
                    year: meta.year,
                    ids,
                    seasons: vec![HistorySeason {
                        number: season,
                        episodes: vec![HistoryEpisode { number: episode }],
                    }],
                }],
                ..Default::default()
            },
            (ContentKind::Series, _, _) => HistoryRequest {
                shows: vec![HistoryShow {
                    title,
                    year: meta.year,
                    ids,
                    seasons: Vec::new(),
                }],
                ..Default::default()
            },
            (ContentKind::Movie, _, _) => HistoryRequest {
                movies: vec![HistoryMovie {
                    title,
                    year: meta.year,
                    ids,
                }],
                ..Default::default()
            },
        };

        let url = format!("{}/sync/history", self.base_url);
        let request = async {
            let response = self.authorized(self.client.post(&url)).json(&body).send().await?;
            if !response.status().is_success() {
                return Err(TraktError::Status(response.status()));
            }
            Ok(())
        };

        timeout(REQUEST_TIMEOUT, request)
            .await
            .map_err(|_| TraktError::Timeout)??;

        info!(imdb_id = %content.imdb_id, episode = ?content.episode_label(), "trakt: marked as watched");
        Ok(())
    }

    pub async fn watchlist(&self, limit: u32) -> Result<Vec<WatchlistEntry>, TraktError> {
        let items: Vec<WatchlistItem> = self
            .get_json(&format!("/sync/watchlist?limit={}&page=1", limit))
            .await?;

        let entries = items
            .into_iter()
            .filter_map(|item| match (item.movie, item.show) {
                (Some(movie), _) => Some((ContentKind::Movie, movie)),
                (None, Some(show)) => Some((ContentKind::Series, show)),
                _ => None,
            })
            .map(|(kind, media)| WatchlistEntry {
                kind,
                title: media.title,
                year: media.year,
                imdb_id: media.ids.imdb,
            })
            .collect();

        Ok(entries)
    }
}
