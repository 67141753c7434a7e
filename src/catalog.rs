//! Browsable catalog rows built from the AIOStreams manifest, plus the Trakt
//! watchlist when Trakt is configured.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::addon::{AddonClient, AddonError, CatalogDescriptor, CatalogQuery, MetaPreview};
use crate::content::{ContentKind, TitleMeta, is_imdb_id};
use crate::trakt::{TraktClient, TraktError, WatchlistEntry};

pub const CACHE_DURATION: Duration = Duration::from_secs(5 * 60);
/// Page size used by catalog addons for `skip`
pub const PAGE_SIZE: usize = 20;
pub const WATCHLIST_ROW_INDEX: f32 = 1.3;
const WATCHLIST_LIMIT: u32 = 20;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{0}")]
    Addon(#[from] AddonError),
    #[error("{0}")]
    Trakt(#[from] TraktError),
}

/// Process-wide state shared by the catalog rows
#[derive(Default)]
pub struct AppContext {
    initialized: AtomicBool,
    catalogs: Mutex<Option<(Instant, Vec<CatalogDescriptor>)>>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// True for the first caller only
    pub fn init_once(&self) -> bool {
        !self.initialized.swap(true, Ordering::SeqCst)
    }

    pub async fn load_catalogs(&self, addon: &AddonClient) -> Result<Vec<CatalogDescriptor>, AddonError> {
        self.load_catalogs_at(addon, Instant::now()).await
    }

    /// Manifest catalogs, served from cache when fetched less than
    /// `CACHE_DURATION` before `now`
    pub async fn load_catalogs_at(
        &self,
        addon: &AddonClient,
        now: Instant,
    ) -> Result<Vec<CatalogDescriptor>, AddonError> {
        {
            let cache = self.catalogs.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((fetched_at, catalogs)) = cache.as_ref()
                && now.saturating_duration_since(*fetched_at) < CACHE_DURATION
            {
                debug!(count = catalogs.len(), "using cached catalogs");
                return Ok(catalogs.clone());
            }
        }

        let manifest = addon.fetch_manifest().await?;
        info!(count = manifest.catalogs.len(), "loaded catalogs from manifest");

        let mut cache = self.catalogs.lock().unwrap_or_else(PoisonError::into_inner);
        *cache = Some((now, manifest.catalogs.clone()));
        Ok(manifest.catalogs)
    }
}

/// A title card shown in a catalog row
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: String,
    pub imdb_id: Option<String>,
    pub title: String,
    pub kind: ContentKind,
    pub year: Option<u16>,
    pub rating: Option<f64>,
    pub poster: Option<String>,
    pub overview: Option<String>,
    pub release_info: Option<String>,
}

impl Card {
    pub fn from_meta(meta: &MetaPreview, kind: ContentKind) -> Self {
        let imdb_id = Some(meta.id.clone()).filter(|id| is_imdb_id(id));
        let id = meta
            .id
            .strip_prefix("tmdb:")
            .map(str::to_string)
            .unwrap_or_else(|| meta.id.clone());

        Self {
            id,
            imdb_id,
            title: meta.display_title().to_string(),
            kind,
            year: meta.year(),
            rating: meta.rating(),
            poster: meta.poster.clone(),
            overview: meta.description.clone(),
            release_info: meta.release_info.clone(),
        }
    }

    pub fn from_watchlist(entry: &WatchlistEntry) -> Self {
        Self {
            id: entry.imdb_id.clone().unwrap_or_default(),
            imdb_id: entry.imdb_id.clone().filter(|id| is_imdb_id(id)),
            title: entry.title.clone(),
            kind: entry.kind,
            year: entry.year,
            rating: None,
            poster: None,
            overview: None,
            release_info: entry.year.map(|y| y.to_string()),
        }
    }

    /// Metadata handed to the stream screen. Series carry an air date marker
    /// so they resolve as series even before season details are known.
    pub fn to_title_meta(&self) -> TitleMeta {
        TitleMeta {
            imdb_id: self.imdb_id.clone(),
            title: self.title.clone(),
            year: self.year,
            first_air_date: match self.kind {
                ContentKind::Series => Some(self.release_info.clone().unwrap_or_default()),
                ContentKind::Movie => None,
            },
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowSource {
    Catalog(CatalogDescriptor),
    TraktWatchlist,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub name: String,
    pub title: String,
    pub index: f32,
    pub source: RowSource,
}

pub fn type_display_name(content_type: &str) -> String {
    match content_type {
        "movie" => "Movies".to_string(),
        "series" => "Series".to_string(),
        "anime" => "Anime".to_string(),
        "collections" => "Collections".to_string(),
        "other" => "Other".to_string(),
        other => other.to_string(),
    }
}

/// Row for a manifest catalog at `position`, or `None` for catalogs that
/// don't belong on the discovery screen (search, `other`)
pub fn row_for_catalog(catalog: &CatalogDescriptor, position: usize) -> Option<CatalogRow> {
    if catalog.name == "Search" || catalog.content_type == "other" {
        return None;
    }

    let sanitized: String = catalog
        .id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    Some(CatalogRow {
        name: format!("AIOCatalog_{}", sanitized),
        title: format!("{} ({})", catalog.name, type_display_name(&catalog.content_type)),
        index: 10.0 + position as f32,
        source: RowSource::Catalog(catalog.clone()),
    })
}

/// Build the ordered row list
pub fn build_rows(catalogs: &[CatalogDescriptor], with_watchlist: bool) -> Vec<CatalogRow> {
    let mut rows: Vec<CatalogRow> = catalogs
        .iter()
        .enumerate()
        .filter_map(|(i, c)| row_for_catalog(c, i))
        .collect();

    if with_watchlist {
        rows.push(CatalogRow {
            name: "TraktWatchlistRow".to_string(),
            title: "Trakt Watchlist".to_string(),
            index: WATCHLIST_ROW_INDEX,
            source: RowSource::TraktWatchlist,
        });
    }

    rows.sort_by(|a, b| a.index.total_cmp(&b.index));
    rows
}

/// Rows for the discovery screen. Manifest failures leave only the watchlist.
pub async fn register_rows(
    ctx: &AppContext,
    addon: Option<&AddonClient>,
    trakt: Option<&TraktClient>,
) -> Vec<CatalogRow> {
    let catalogs = match addon {
        Some(addon) => match ctx.load_catalogs(addon).await {
            Ok(catalogs) => catalogs,
            Err(e) => {
                warn!(error = %e, "failed to load catalogs");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let rows = build_rows(&catalogs, trakt.is_some());
    debug!(count = rows.len(), "catalog rows registered");
    rows
}

/// One page of cards for a row
pub async fn fetch_row(
    row: &CatalogRow,
    addon: Option<&AddonClient>,
    trakt: Option<&TraktClient>,
    skip: usize,
) -> Result<Vec<Card>, CatalogError> {
    match &row.source {
        RowSource::Catalog(catalog) => {
            let addon = addon.ok_or(AddonError::NotConfigured)?;
            let kind = ContentKind::from_addon_type(&catalog.content_type).unwrap_or(ContentKind::Movie);
            let query = CatalogQuery { genre: None, skip };
            let metas = addon
                .fetch_catalog(&catalog.content_type, &catalog.id, &query)
                .await?;
            Ok(metas.iter().map(|m| Card::from_meta(m, kind)).collect())
        }
        RowSource::TraktWatchlist => {
            // Trakt pages by page number; only the first page is shown
            if skip > 0 {
                return Ok(Vec::new());
            }
            let trakt = trakt.ok_or(TraktError::NotConfigured)?;
            let entries = trakt.watchlist(WATCHLIST_LIMIT).await?;
            Ok(entries.iter().map(Card::from_watchlist).collect())
        }
    }
}

/// First page of every row, concurrently. Rows that fail or come back empty
/// are dropped.
pub async fn load_rows(
    rows: Vec<CatalogRow>,
    addon: Option<&AddonClient>,
    trakt: Option<&TraktClient>,
) -> Vec<(CatalogRow, Vec<Card>)> {
    let results = join_all(rows.iter().map(|row| fetch_row(row, addon, trakt, 0))).await;

    rows.into_iter()
        .zip(results)
        .filter_map(|(row, result)| match result {
            Ok(cards) if !cards.is_empty() => Some((row, cards)),
            Ok(_) => None,
            Err(e) => {
                warn!(row = %row.name, error = %e, "catalog row failed to load");
                None
            }
        })
        .collect()
}
