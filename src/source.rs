use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::addon::{AddonClient, AddonError, StreamCandidate};
use crate::content::{ContentKind, ContentRef, TitleMeta};
use crate::history::{WatchHistory, find_next_episode};
use crate::navigation::{BackTarget, Frame, NavigationStack};
use crate::parser::{self, ParsedTag};
use crate::trakt::TraktClient;
use crate::view::{EntryAction, ListEntry, ListView, StreamEntry};

pub const IMDB_MISSING: &str = "IMDb ID not found for this content";
pub const STREAMS_NOT_FOUND: &str = "Streams not found";

/// Stremio addon flavours the screen can switch between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    AioStreams,
    Comet,
    Torrentio,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::AioStreams, Backend::Comet, Backend::Torrentio];

    /// Key used in config and the state store
    pub fn name(&self) -> &'static str {
        match self {
            Backend::AioStreams => "aiostreams",
            Backend::Comet => "comet",
            Backend::Torrentio => "torrentio",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Backend::AioStreams => "AIOStreams",
            Backend::Comet => "Comet",
            Backend::Torrentio => "Torrentio",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name().eq_ignore_ascii_case(name))
    }

    /// Only AIOStreams jumps straight to the next unwatched episode
    pub fn auto_resume(&self) -> bool {
        matches!(self, Backend::AioStreams)
    }

    pub fn not_configured_message(&self) -> String {
        format!(
            "{} URL not configured. Set sources.{} in config.toml",
            self.title(),
            self.name()
        )
    }
}

/// Slot for the cancellation token of the in-flight stream request.
///
/// Shared between the screen worker and the UI so loading can be interrupted
/// while the worker is awaiting the response.
#[derive(Clone, Default)]
pub struct RequestHandle {
    slot: Arc<Mutex<Option<CancellationToken>>>,
}

impl RequestHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is in flight and register a fresh token
    pub fn begin(&self) -> CancellationToken {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        token
    }

    /// Cancel the in-flight request, if any
    pub fn clear(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = slot.take() {
            debug!("cancelling in-flight request");
            token.cancel();
        }
    }

    /// Drop the token of a request that completed normally
    fn finish(&self, token: &CancellationToken) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if !token.is_cancelled() {
            *slot = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

fn load_error_message(error: &AddonError) -> String {
    let text = match error {
        AddonError::Status(reason) if !reason.is_empty() => reason.clone(),
        AddonError::Status(_) => "Unknown".to_string(),
        AddonError::Timeout => "timeout".to_string(),
        other => other.to_string(),
    };
    format!("Load error: {}", text)
}

/// Stream lookup state machine for one addon backend.
///
/// Walks season/episode selection for series, fetches the addon's stream
/// list, and keeps the candidates around for filtering and back navigation.
pub struct StreamSource {
    backend: Backend,
    addon: AddonClient,
    trakt: Option<TraktClient>,
    meta: TitleMeta,
    imdb_id: Option<String>,
    history: Option<WatchHistory>,
    candidates: Vec<StreamCandidate>,
    current: Option<ContentRef>,
    filter_items: Vec<String>,
    choice: usize,
    nav: NavigationStack,
    request: RequestHandle,
}

impl StreamSource {
    pub fn new(backend: Backend, addon: AddonClient, trakt: Option<TraktClient>, request: RequestHandle) -> Self {
        Self {
            backend,
            addon,
            trakt,
            meta: TitleMeta::default(),
            imdb_id: None,
            history: None,
            candidates: Vec::new(),
            current: None,
            filter_items: Vec::new(),
            choice: 0,
            nav: NavigationStack::new(),
            request,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn meta(&self) -> &TitleMeta {
        &self.meta
    }

    pub fn candidates(&self) -> &[StreamCandidate] {
        &self.candidates
    }

    pub fn filter_items(&self) -> &[String] {
        &self.filter_items
    }

    pub fn choice(&self) -> usize {
        self.choice
    }

    pub fn navigation(&self) -> &NavigationStack {
        &self.nav
    }

    pub fn history(&self) -> Option<&WatchHistory> {
        self.history.as_ref()
    }

    /// Start a lookup for a title
    pub async fn search(&mut self, meta: TitleMeta, view: &mut dyn ListView) {
        self.destroy();
        self.history = None;
        self.imdb_id = meta.imdb_id().map(str::to_string);
        self.meta = meta;

        if !self.addon.is_configured() {
            view.empty_for_query(&self.backend.not_configured_message());
            return;
        }

        let Some(imdb_id) = self.imdb_id.clone() else {
            view.empty_for_query(IMDB_MISSING);
            return;
        };

        info!(backend = self.backend.name(), imdb_id = %imdb_id, kind = %self.meta.kind(), "searching streams");

        match self.meta.kind() {
            ContentKind::Series => {
                if let Some(trakt) = &self.trakt {
                    view.loading(true);
                    self.history = trakt.watch_history(&imdb_id).await;
                }

                let next = self
                    .backend
                    .auto_resume()
                    .then(|| find_next_episode(self.history.as_ref(), &self.meta))
                    .flatten();

                if let Some((season, episode)) = next {
                    info!(season, episode, "resuming at next unwatched episode");
                    self.nav.reset_to(Frame::seasons(&imdb_id));
                    self.nav.push(Frame::episodes(&imdb_id, season));
                    self.fetch_streams(ContentRef::episode(imdb_id, season, episode), view)
                        .await;
                } else {
                    self.show_seasons(view);
                }
            }
            ContentKind::Movie => {
                self.fetch_streams(ContentRef::movie(imdb_id), view).await;
            }
        }
    }

    pub fn show_seasons(&mut self, view: &mut dyn ListView) {
        let Some(imdb_id) = self.imdb_id.clone() else {
            view.empty_for_query(IMDB_MISSING);
            return;
        };
        self.nav.reset_to(Frame::seasons(imdb_id));
        self.clear_candidates(view);

        view.update_filter_info(None);
        view.reset();
        view.loading(false);

        for season in 1..=self.meta.season_count() {
            let watched = self
                .history
                .as_ref()
                .map(|h| h.watched_in_season(season))
                .unwrap_or(0);

            let (title, info) = if watched > 0 {
                (format!("Season {} ✓", season), format!("{} watched", watched))
            } else {
                (format!("Season {}", season), String::new())
            };

            view.append(ListEntry::Season { season, title, info });
        }

        view.start(true);
    }

    pub fn show_episodes(&mut self, season: u32, view: &mut dyn ListView) {
        let Some(imdb_id) = self.imdb_id.clone() else {
            view.empty_for_query(IMDB_MISSING);
            return;
        };
        self.nav.push(Frame::episodes(imdb_id, season));
        self.clear_candidates(view);

        view.update_filter_info(Some(format!("S{}", season)));
        view.reset();
        view.loading(false);

        for episode in 1..=self.meta.episode_count(season) {
            let watched = self
                .history
                .as_ref()
                .is_some_and(|h| h.is_watched(season, episode));

            view.append(ListEntry::Episode {
                season,
                episode,
                title: format!(
                    "S{:02}E{:02}{}",
                    season,
                    episode,
                    if watched { " ✓" } else { "" }
                ),
                info: format!("Episode {}", episode),
                watched,
            });
        }

        view.start(true);
    }

    /// Activate a season or episode row
    pub async fn open(&mut self, action: EntryAction, view: &mut dyn ListView) {
        match action {
            EntryAction::Season(season) => self.show_episodes(season, view),
            EntryAction::Episode { season, episode } => {
                let Some(imdb_id) = self.imdb_id.clone() else {
                    view.empty_for_query(IMDB_MISSING);
                    return;
                };
                self.fetch_streams(ContentRef::episode(imdb_id, season, episode), view)
                    .await;
            }
        }
    }

    /// Request the stream list for one movie or episode.
    ///
    /// Any earlier request still in flight is cancelled first. If this request
    /// is itself cancelled nothing is rendered.
    pub async fn fetch_streams(&mut self, content: ContentRef, view: &mut dyn ListView) {
        let Some(url) = self.addon.stream_url(&content) else {
            view.empty_for_query(&self.backend.not_configured_message());
            return;
        };

        if let (ContentKind::Series, Some(_), Some(_)) = (content.kind, content.season, content.episode) {
            self.nav.push(Frame::streams(
                content.imdb_id.clone(),
                content.season,
                content.episode,
            ));
        }

        self.clear_candidates(view);
        view.update_filter_info(content.episode_label());
        view.loading(true);
        debug!(backend = self.backend.name(), url = %url, "fetching streams");

        let token = self.request.begin();
        let result = tokio::select! {
            _ = token.cancelled() => {
                debug!(backend = self.backend.name(), "stream request cancelled");
                view.loading(false);
                return;
            }
            result = self.addon.fetch_streams(&content) => result,
        };
        self.request.finish(&token);

        view.loading(false);

        match result {
            Ok(streams) if !streams.is_empty() => {
                info!(backend = self.backend.name(), count = streams.len(), "streams loaded");
                let tags: Vec<ParsedTag> = streams.iter().map(StreamCandidate::parse).collect();
                self.filter_items = parser::quality_buckets(&tags);
                self.candidates = streams;
                self.current = Some(content);
                self.choice = 0;

                view.update_filter(&self.filter_items);
                view.filter_chosen(0);
                let all: Vec<usize> = (0..self.candidates.len()).collect();
                self.display(&all, view);
            }
            Ok(_) => {
                info!(backend = self.backend.name(), "no streams returned");
                view.empty_for_query(STREAMS_NOT_FOUND);
            }
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "stream request failed");
                view.empty_for_query(&load_error_message(&e));
            }
        }
    }

    /// Forget the last stream list so filters only ever act on what is shown
    fn clear_candidates(&mut self, view: &mut dyn ListView) {
        self.candidates.clear();
        self.filter_items.clear();
        self.current = None;
        self.choice = 0;
        view.update_filter(&[]);
    }

    /// Render the candidates at `indices`, grouped and sorted by quality
    fn display(&self, indices: &[usize], view: &mut dyn ListView) {
        view.reset();

        let Some(content) = self.current.clone() else {
            view.start(true);
            return;
        };

        let tags: Vec<ParsedTag> = indices.iter().map(|&i| self.candidates[i].parse()).collect();

        for position in parser::display_order(&tags) {
            let candidate = self.candidates[indices[position]].clone();
            view.append(ListEntry::Stream(Box::new(StreamEntry::new(
                position + 1,
                candidate,
                content.clone(),
            ))));
        }

        view.start(true);
    }

    /// Show only the quality bucket at `index`; an empty bucket shows everything
    pub fn filter(&mut self, index: usize, view: &mut dyn ListView) {
        if self.current.is_none() {
            return;
        }
        self.choice = index;
        view.filter_chosen(index);

        let selected: Vec<usize> = match self.filter_items.get(index) {
            Some(label) => self
                .candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| c.parse().bucket() == label)
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        };

        if selected.is_empty() {
            let all: Vec<usize> = (0..self.candidates.len()).collect();
            self.display(&all, view);
        } else {
            debug!(quality = %self.filter_items[index], count = selected.len(), "filtering streams");
            self.display(&selected, view);
        }
    }

    pub fn reset(&mut self, view: &mut dyn ListView) {
        if self.current.is_none() {
            return;
        }
        self.choice = 0;
        view.filter_chosen(0);

        let all: Vec<usize> = (0..self.candidates.len()).collect();
        self.display(&all, view);
    }

    /// Unwind one navigation step. `false` means the caller should leave the screen.
    pub fn go_back(&mut self, view: &mut dyn ListView) -> bool {
        match self.nav.go_back() {
            BackTarget::Exit => false,
            BackTarget::Seasons => {
                self.request.clear();
                self.show_seasons(view);
                true
            }
            BackTarget::Episodes(season) => {
                self.request.clear();
                self.show_episodes(season, view);
                true
            }
        }
    }

    pub fn destroy(&mut self) {
        self.request.clear();
        self.candidates.clear();
        self.filter_items.clear();
        self.current = None;
        self.choice = 0;
        self.nav.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names() {
        assert_eq!(Backend::from_name("Comet"), Some(Backend::Comet));
        assert_eq!(Backend::from_name("aiostreams"), Some(Backend::AioStreams));
        assert_eq!(Backend::from_name("jackett"), None);
        assert!(Backend::AioStreams.auto_resume());
        assert!(!Backend::Torrentio.auto_resume());
        assert!(Backend::Comet.not_configured_message().starts_with("Comet URL not configured"));
    }

    #[test]
    fn test_request_handle_begin_cancels_previous() {
        let handle = RequestHandle::new();
        let first = handle.begin();
        let second = handle.begin();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(handle.is_active());

        handle.clear();
        assert!(second.is_cancelled());
        assert!(!handle.is_active());
    }

    #[test]
    fn test_request_handle_finish() {
        let handle = RequestHandle::new();
        let token = handle.begin();
        handle.finish(&token);
        assert!(!handle.is_active());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_load_error_message() {
        assert_eq!(
            load_error_message(&AddonError::Status("Not Found".into())),
            "Load error: Not Found"
        );
        assert_eq!(load_error_message(&AddonError::Timeout), "Load error: timeout");
    }
}
