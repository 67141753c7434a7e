use std::time::{Duration, Instant};

use crate::catalog::{Card, CatalogRow, PAGE_SIZE};
use crate::content::{ContentKind, ContentRef, TitleMeta, is_imdb_id};
use crate::controller::ListController;
use crate::doctor::CheckResult;

const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Catalog rows from the addon manifest
    Discovery,
    /// Manual IMDb id entry
    Lookup,
    Streams,
    Doctor,
}

#[derive(Debug, Clone)]
pub struct DiscoveryRow {
    pub row: CatalogRow,
    pub cards: Vec<Card>,
    pub next_skip: usize,
    pub exhausted: bool,
    pub is_loading_more: bool,
}

impl DiscoveryRow {
    pub fn new(row: CatalogRow, cards: Vec<Card>) -> Self {
        Self {
            row,
            cards,
            next_skip: PAGE_SIZE,
            exhausted: false,
            is_loading_more: false,
        }
    }
}

/// "Mark as watched on Trakt?" after a stream is handed to the player
#[derive(Debug, Clone)]
pub struct TraktPrompt {
    pub meta: TitleMeta,
    pub content: ContentRef,
    /// 0 = yes, 1 = no
    pub selected: usize,
}

impl TraktPrompt {
    pub fn confirmed(&self) -> bool {
        self.selected == 0
    }
}

pub struct App {
    pub view: View,
    pub should_quit: bool,

    // Discovery
    pub discovery_rows: Vec<DiscoveryRow>,
    pub selected_row_index: usize,
    pub selected_item_index: usize,
    pub is_loading_discovery: bool,
    pub discovery_error: Option<String>,

    // Lookup
    pub lookup_input: String,
    pub lookup_series: bool,
    pub lookup_error: Option<String>,

    // Streams
    pub list: ListController,
    pub current_meta: Option<TitleMeta>,
    pub trakt_prompt: Option<TraktPrompt>,

    // Doctor
    pub doctor_results: Vec<CheckResult>,
    pub is_checking: bool,

    pub notification: Option<(String, Instant)>,
}

impl App {
    pub fn new() -> Self {
        Self {
            view: View::Discovery,
            should_quit: false,
            discovery_rows: Vec::new(),
            selected_row_index: 0,
            selected_item_index: 0,
            is_loading_discovery: false,
            discovery_error: None,
            lookup_input: String::new(),
            lookup_series: false,
            lookup_error: None,
            list: ListController::new(),
            current_meta: None,
            trakt_prompt: None,
            doctor_results: Vec::new(),
            is_checking: false,
            notification: None,
        }
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notification = Some((message.into(), Instant::now()));
    }

    /// Current notification, if it hasn't expired
    pub fn active_notification(&self) -> Option<&str> {
        self.notification
            .as_ref()
            .filter(|(_, at)| at.elapsed() < NOTIFICATION_TTL)
            .map(|(msg, _)| msg.as_str())
    }

    /// Fresh stream list for a new title
    pub fn enter_streams(&mut self, meta: TitleMeta) {
        self.list = ListController::new();
        self.current_meta = Some(meta);
        self.trakt_prompt = None;
        self.view = View::Streams;
    }

    pub fn leave_streams(&mut self) {
        self.list = ListController::new();
        self.current_meta = None;
        self.trakt_prompt = None;
        self.view = View::Discovery;
    }

    /// Title metadata for the id typed in the lookup view
    pub fn lookup_meta(&self) -> Result<TitleMeta, String> {
        let id = self.lookup_input.trim();
        if !is_imdb_id(id) {
            return Err("IMDb ID must look like tt1234567".to_string());
        }
        Ok(lookup_title(id, self.lookup_series))
    }

    // Discovery navigation helpers
    pub fn select_next_row(&mut self) {
        if !self.discovery_rows.is_empty() {
            self.selected_row_index =
                (self.selected_row_index + 1).min(self.discovery_rows.len() - 1);
            self.selected_item_index = 0;
        }
    }

    pub fn select_previous_row(&mut self) {
        if self.selected_row_index > 0 {
            self.selected_row_index -= 1;
            self.selected_item_index = 0;
        }
    }

    pub fn select_next_item(&mut self) {
        if let Some(row) = self.discovery_rows.get(self.selected_row_index)
            && !row.cards.is_empty()
        {
            self.selected_item_index = (self.selected_item_index + 1).min(row.cards.len() - 1);
        }
    }

    pub fn select_previous_item(&mut self) {
        if self.selected_item_index > 0 {
            self.selected_item_index -= 1;
        }
    }

    pub fn selected_card(&self) -> Option<&Card> {
        self.discovery_rows
            .get(self.selected_row_index)
            .and_then(|row| row.cards.get(self.selected_item_index))
    }

    /// Whether moving right from the current card should fetch the next page
    pub fn at_row_end(&self) -> bool {
        self.discovery_rows
            .get(self.selected_row_index)
            .is_some_and(|row| {
                !row.exhausted && self.selected_item_index + 1 >= row.cards.len()
            })
    }

    pub fn append_cards(&mut self, row_name: &str, cards: Vec<Card>) {
        let Some(row) = self.discovery_rows.iter_mut().find(|r| r.row.name == row_name) else {
            return;
        };
        row.is_loading_more = false;
        if cards.is_empty() {
            row.exhausted = true;
        } else {
            row.next_skip += PAGE_SIZE;
            row.cards.extend(cards);
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata for a title known only by its IMDb id
pub fn lookup_title(imdb_id: &str, series: bool) -> TitleMeta {
    let kind = if series { ContentKind::Series } else { ContentKind::Movie };
    TitleMeta {
        imdb_id: Some(imdb_id.to_string()),
        title: imdb_id.to_string(),
        first_air_date: (kind == ContentKind::Series).then(String::new),
        ..Default::default()
    }
}
