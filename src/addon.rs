//! Client for Stremio-compatible addons (AIOStreams, Comet, Torrentio, Cinemeta).
//!
//! Only the read side of the addon contract is used: `manifest.json`,
//! `stream/{type}/{id}.json`, `catalog/{type}/{id}.json` and `meta/{type}/{id}.json`.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::content::{ContentKind, ContentRef, SeasonInfo, TitleMeta, is_imdb_id};
use crate::parser::{self, ParsedTag};

/// Default request timeout for stream lookups
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

static MANIFEST_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/manifest\.json/?$").unwrap());

#[derive(Error, Debug)]
pub enum AddonError {
    #[error("addon URL not configured")]
    NotConfigured,
    #[error("{0}")]
    RequestError(#[from] reqwest::Error),
    #[error("{0}")]
    Status(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One entry of a `/stream` response.
///
/// Addons disagree on which fields they fill, so everything is optional and
/// `resolve_url` is the single place that decides what is playable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamCandidate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub info_hash: Option<String>,
    #[serde(default)]
    pub behavior_hints: Option<BehaviorHints>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    #[serde(default)]
    pub proxy_headers: Option<ProxyHeaders>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyHeaders {
    #[serde(default)]
    pub request: Option<HashMap<String, String>>,
}

impl StreamCandidate {
    /// Playable URL: `url`, then `externalUrl`. Hash-only entries have none.
    pub fn resolve_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.external_url.as_deref().filter(|u| !u.is_empty()))
    }

    pub fn is_playable(&self) -> bool {
        self.resolve_url().is_some()
    }

    /// Text the title parser works on
    pub fn raw_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn parse(&self) -> ParsedTag {
        parser::parse(self.raw_title())
    }

    pub fn proxy_request_headers(&self) -> Option<&HashMap<String, String>> {
        self.behavior_hints
            .as_ref()?
            .proxy_headers
            .as_ref()?
            .request
            .as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub catalogs: Vec<CatalogDescriptor>,
}

/// Catalog entry as returned by `/catalog`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaPreview {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Some addons send a string, some a number
    #[serde(default)]
    pub imdb_rating: Option<Value>,
    #[serde(default)]
    pub release_info: Option<String>,
}

impl MetaPreview {
    pub fn display_title(&self) -> &str {
        self.name
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn rating(&self) -> Option<f64> {
        match self.imdb_rating.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn year(&self) -> Option<u16> {
        let info = self.release_info.as_deref()?;
        info.get(..4)?.parse().ok()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub genre: Option<String>,
    pub skip: usize,
}

#[derive(Debug, Deserialize)]
struct MetaResponse {
    meta: MetaDetail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaDetail {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub release_info: Option<String>,
    #[serde(default)]
    pub videos: Vec<MetaVideo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaVideo {
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default, alias = "number")]
    pub episode: Option<u32>,
}

impl MetaDetail {
    /// Season layout derived from the `videos` list. Specials (season 0) are skipped.
    pub fn to_title_meta(&self) -> TitleMeta {
        let mut counts: std::collections::BTreeMap<u32, u32> = std::collections::BTreeMap::new();
        for video in &self.videos {
            if let (Some(season), Some(episode)) = (video.season, video.episode)
                && season > 0
            {
                let count = counts.entry(season).or_default();
                *count = (*count).max(episode);
            }
        }

        let seasons: Vec<SeasonInfo> = counts
            .into_iter()
            .map(|(season_number, count)| SeasonInfo {
                season_number,
                episode_count: Some(count),
            })
            .collect();

        let is_series = self
            .content_type
            .as_deref()
            .and_then(ContentKind::from_addon_type)
            == Some(ContentKind::Series);

        TitleMeta {
            imdb_id: Some(self.id.clone()).filter(|id| is_imdb_id(id)),
            title: self.name.clone().unwrap_or_default(),
            year: self
                .release_info
                .as_deref()
                .and_then(|r| r.get(..4))
                .and_then(|y| y.parse().ok()),
            number_of_seasons: seasons.iter().map(|s| s.season_number).max(),
            seasons,
            first_air_date: is_series.then(|| self.release_info.clone().unwrap_or_default()),
        }
    }
}

/// Strip `/manifest.json` and trailing slashes from a pasted install URL.
///
/// `https://comet.example/ABC/manifest.json` -> `https://comet.example/ABC`
pub fn extract_base_url(manifest_url: &str) -> String {
    let url = manifest_url.trim();
    let url = MANIFEST_SUFFIX_RE.replace(url, "");
    url.trim_end_matches('/').to_string()
}

/// `{base}/stream/{kind}/{id}.json`, where `id` is `imdb:season:episode` for episodes
pub fn build_stream_url(
    base: &str,
    imdb_id: &str,
    kind: ContentKind,
    season: Option<u32>,
    episode: Option<u32>,
) -> String {
    let id = match (kind, season, episode) {
        (ContentKind::Series, Some(s), Some(e)) => format!("{}:{}:{}", imdb_id, s, e),
        _ => imdb_id.to_string(),
    };
    format!("{}/stream/{}/{}.json", base, kind, id)
}

pub fn build_catalog_url(base: &str, content_type: &str, catalog_id: &str, query: &CatalogQuery) -> String {
    let mut url = format!("{}/catalog/{}/{}", base, content_type, catalog_id);

    let mut params = Vec::new();
    if let Some(genre) = &query.genre {
        params.push(format!("genre={}", urlencoding::encode(genre)));
    }
    if query.skip > 0 {
        params.push(format!("skip={}", query.skip));
    }
    if !params.is_empty() {
        url.push('/');
        url.push_str(&params.join("&"));
    }

    url.push_str(".json");
    url
}

#[derive(Clone)]
pub struct AddonClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl AddonClient {
    /// Accepts either a manifest URL or a bare base URL
    pub fn new(manifest_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|e| {
                    warn!(error = %e, "failed to build HTTP client, using defaults");
                    Client::new()
                }),
            base_url: extract_base_url(manifest_url),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }

    pub fn stream_url(&self, content: &ContentRef) -> Option<String> {
        if !self.is_configured() {
            return None;
        }
        Some(build_stream_url(
            &self.base_url,
            &content.imdb_id,
            content.kind,
            content.season,
            content.episode,
        ))
    }

    /// Fetch the stream list for a title. A missing or empty `streams` array
    /// yields an empty list; transport and decoding failures are errors.
    pub async fn fetch_streams(&self, content: &ContentRef) -> Result<Vec<StreamCandidate>, AddonError> {
        let url = self.stream_url(content).ok_or(AddonError::NotConfigured)?;
        debug!(url = %url, "fetching streams");

        let body = self.get_json(&url).await?;
        let Some(entries) = body.get("streams").and_then(Value::as_array) else {
            return Ok(Vec::new());
        };

        let streams = entries
            .iter()
            .filter_map(|entry| match serde_json::from_value(entry.clone()) {
                Ok(stream) => Some(stream),
                Err(e) => {
                    debug!(error = %e, "skipping malformed stream entry");
                    None
                }
            })
            .collect();

        Ok(streams)
    }

    pub async fn fetch_manifest(&self) -> Result<Manifest, AddonError> {
        if !self.is_configured() {
            return Err(AddonError::NotConfigured);
        }
        let url = format!("{}/manifest.json", self.base_url);
        debug!(url = %url, "fetching manifest");

        let body = self.get_json(&url).await?;
        if !body.get("catalogs").is_some_and(Value::is_array) {
            return Err(AddonError::InvalidResponse("invalid manifest format".to_string()));
        }
        serde_json::from_value(body).map_err(|e| AddonError::InvalidResponse(e.to_string()))
    }

    pub async fn fetch_catalog(
        &self,
        content_type: &str,
        catalog_id: &str,
        query: &CatalogQuery,
    ) -> Result<Vec<MetaPreview>, AddonError> {
        if !self.is_configured() {
            return Err(AddonError::NotConfigured);
        }
        let url = build_catalog_url(&self.base_url, content_type, catalog_id, query);
        debug!(url = %url, "fetching catalog");

        let body = self.get_json(&url).await?;
        let Some(metas) = body.get("metas").and_then(Value::as_array) else {
            return Ok(Vec::new());
        };

        Ok(metas
            .iter()
            .filter_map(|m| serde_json::from_value(m.clone()).ok())
            .collect())
    }

    pub async fn fetch_meta(&self, kind: ContentKind, imdb_id: &str) -> Result<MetaDetail, AddonError> {
        if !self.is_configured() {
            return Err(AddonError::NotConfigured);
        }
        let url = format!("{}/meta/{}/{}.json", self.base_url, kind, imdb_id);
        debug!(url = %url, "fetching meta");

        let body = self.get_json(&url).await?;
        let response: MetaResponse =
            serde_json::from_value(body).map_err(|e| AddonError::InvalidResponse(e.to_string()))?;
        Ok(response.meta)
    }

    /// Whichever of the two timeouts fires first reports `Timeout`
    async fn get_json(&self, url: &str) -> Result<Value, AddonError> {
        let request = async {
            let response = self.client.get(url).send().await.map_err(request_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(AddonError::Status(
                    status
                        .canonical_reason()
                        .map(String::from)
                        .unwrap_or_else(|| status.to_string()),
                ));
            }
            let text = response.text().await.map_err(request_error)?;
            serde_json::from_str::<Value>(&text).map_err(|e| AddonError::InvalidResponse(e.to_string()))
        };

        timeout(self.timeout, request)
            .await
            .map_err(|_| AddonError::Timeout)?
    }
}

fn request_error(e: reqwest::Error) -> AddonError {
    if e.is_timeout() {
        AddonError::Timeout
    } else {
        AddonError::RequestError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_base_url() {
        assert_eq!(
            extract_base_url("https://comet.example/ABC123/manifest.json"),
            "https://comet.example/ABC123"
        );
        assert_eq!(
            extract_base_url("  https://x.example/cfg/MANIFEST.JSON/ "),
            "https://x.example/cfg"
        );
        assert_eq!(extract_base_url("https://x.example/cfg/"), "https://x.example/cfg");
        assert_eq!(extract_base_url(""), "");
    }

    #[test]
    fn test_build_stream_url() {
        assert_eq!(
            build_stream_url("http://base", "tt123", ContentKind::Series, Some(2), Some(5)),
            "http://base/stream/series/tt123:2:5.json"
        );
        assert_eq!(
            build_stream_url("http://base", "tt123", ContentKind::Movie, None, None),
            "http://base/stream/movie/tt123.json"
        );
        // A series without an episode falls back to the bare id
        assert_eq!(
            build_stream_url("http://base", "tt123", ContentKind::Series, Some(2), None),
            "http://base/stream/series/tt123.json"
        );
    }

    #[test]
    fn test_build_catalog_url() {
        let plain = CatalogQuery::default();
        assert_eq!(
            build_catalog_url("http://b", "movie", "top", &plain),
            "http://b/catalog/movie/top.json"
        );

        let query = CatalogQuery {
            genre: Some("Sci Fi".to_string()),
            skip: 100,
        };
        assert_eq!(
            build_catalog_url("http://b", "series", "popular", &query),
            "http://b/catalog/series/popular/genre=Sci%20Fi&skip=100.json"
        );
    }

    #[test]
    fn test_resolve_url_preference() {
        let direct = StreamCandidate {
            url: Some("https://a/x".to_string()),
            external_url: Some("https://b/y".to_string()),
            ..Default::default()
        };
        assert_eq!(direct.resolve_url(), Some("https://a/x"));

        let external = StreamCandidate {
            external_url: Some("https://b/y".to_string()),
            ..Default::default()
        };
        assert_eq!(external.resolve_url(), Some("https://b/y"));

        let hash_only = StreamCandidate {
            info_hash: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(hash_only.resolve_url(), None);
        assert!(!hash_only.is_playable());
    }

    #[test]
    fn test_candidate_deserializes_camel_case() {
        let json = r#"{
            "name": "AIO 1080p",
            "title": "Movie.2020.1080p.WEB-DL",
            "externalUrl": "https://ext/1",
            "infoHash": "deadbeef",
            "behaviorHints": { "proxyHeaders": { "request": { "Referer": "https://origin/" } } }
        }"#;
        let stream: StreamCandidate = serde_json::from_str(json).unwrap();

        assert_eq!(stream.external_url.as_deref(), Some("https://ext/1"));
        assert_eq!(stream.info_hash.as_deref(), Some("deadbeef"));
        assert_eq!(
            stream.proxy_request_headers().and_then(|h| h.get("Referer")).map(String::as_str),
            Some("https://origin/")
        );
        assert_eq!(stream.raw_title(), "Movie.2020.1080p.WEB-DL");
    }

    #[test]
    fn test_raw_title_fallbacks() {
        let named = StreamCandidate {
            name: Some("Torrentio 4k".to_string()),
            ..Default::default()
        };
        assert_eq!(named.raw_title(), "Torrentio 4k");
        assert_eq!(StreamCandidate::default().raw_title(), "Unknown");
    }

    #[test]
    fn test_meta_detail_to_title_meta() {
        let json = r#"{
            "id": "tt0903747",
            "name": "Breaking Bad",
            "type": "series",
            "releaseInfo": "2008-2013",
            "videos": [
                { "season": 0, "episode": 1 },
                { "season": 1, "episode": 1 },
                { "season": 1, "episode": 7 },
                { "season": 2, "episode": 13 }
            ]
        }"#;
        let detail: MetaDetail = serde_json::from_str(json).unwrap();
        let meta = detail.to_title_meta();

        assert_eq!(meta.imdb_id.as_deref(), Some("tt0903747"));
        assert_eq!(meta.kind(), ContentKind::Series);
        assert_eq!(meta.number_of_seasons, Some(2));
        assert_eq!(meta.episode_count(1), 7);
        assert_eq!(meta.episode_count(2), 13);
        assert_eq!(meta.year, Some(2008));
    }

    #[test]
    fn test_meta_preview_rating_variants() {
        let as_string: MetaPreview =
            serde_json::from_str(r#"{"id":"tt1","name":"A","imdbRating":"7.4"}"#).unwrap();
        assert_eq!(as_string.rating(), Some(7.4));

        let as_number: MetaPreview =
            serde_json::from_str(r#"{"id":"tt1","name":"A","imdbRating":8.1}"#).unwrap();
        assert_eq!(as_number.rating(), Some(8.1));

        let missing: MetaPreview = serde_json::from_str(r#"{"id":"tt1"}"#).unwrap();
        assert_eq!(missing.rating(), None);
        assert_eq!(missing.display_title(), "Unknown");
    }
}
