use crate::view::{EntryAction, ListEntry, ListView, StreamEntry, ViewEvent};

/// Directional remote-style input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Back,
    /// Long press on an entry
    Details,
}

/// What the screen should do in response to an input
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    None,
    Open(EntryAction),
    Play(Box<StreamEntry>),
    CopyUrl(String),
    Filter(usize),
    ResetFilter,
    SelectSource(usize),
    /// Ask the source to unwind its navigation stack
    Back,
    /// Focus leaves the list towards the parent menu
    ExitToMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRow {
    Reset,
    Source(usize),
    Quality(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPanel {
    pub rows: Vec<FilterRow>,
    pub selected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailsItem {
    Play,
    CopyUrl,
    Information,
}

impl DetailsItem {
    pub fn label(&self) -> &'static str {
        match self {
            DetailsItem::Play => "Play",
            DetailsItem::CopyUrl => "Copy URL",
            DetailsItem::Information => "Information",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailsMenu {
    pub entry: Box<StreamEntry>,
    pub items: Vec<DetailsItem>,
    pub selected: usize,
    /// Full raw title is being shown
    pub info_open: bool,
}

impl DetailsMenu {
    fn new(entry: StreamEntry) -> Self {
        let mut items = vec![DetailsItem::Play];
        if entry.url().is_some() {
            items.push(DetailsItem::CopyUrl);
        }
        items.push(DetailsItem::Information);

        Self {
            entry: Box::new(entry),
            items,
            selected: 0,
            info_open: false,
        }
    }

    pub fn subtitle(&self, item: DetailsItem) -> &str {
        match item {
            DetailsItem::Play if self.entry.url().is_some() => "Open in player",
            DetailsItem::Play => "URL unavailable",
            DetailsItem::CopyUrl => "Copy link to clipboard",
            DetailsItem::Information => &self.entry.tag.full,
        }
    }
}

/// State of the stream list as the UI sees it
#[derive(Debug, Default)]
pub struct ListController {
    entries: Vec<ListEntry>,
    focus: usize,
    loading: bool,
    empty: Option<String>,
    filter_options: Vec<String>,
    filter_choice: usize,
    filter_info: Option<String>,
    sources: Vec<String>,
    active_source: usize,
    panel: Option<FilterPanel>,
    details: Option<DetailsMenu>,
    exit_requested: bool,
}

impl ListController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::Reset => self.reset(),
            ViewEvent::Loading(active) => self.loading(active),
            ViewEvent::Empty(message) => self.empty_for_query(&message),
            ViewEvent::Append(entry) => self.append(entry),
            ViewEvent::Start { focus_first } => self.start(focus_first),
            ViewEvent::Filter(options) => self.update_filter(&options),
            ViewEvent::FilterChosen(index) => self.filter_chosen(index),
            ViewEvent::FilterInfo(info) => self.update_filter_info(info),
            ViewEvent::Sources { titles, active } => self.update_sources(&titles, active),
            ViewEvent::Backward => self.backward(),
        }
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focused(&self) -> Option<&ListEntry> {
        self.entries.get(self.focus)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn empty_message(&self) -> Option<&str> {
        self.empty.as_deref()
    }

    pub fn filter_options(&self) -> &[String] {
        &self.filter_options
    }

    pub fn filter_choice(&self) -> usize {
        self.filter_choice
    }

    pub fn filter_info(&self) -> Option<&str> {
        self.filter_info.as_deref()
    }

    /// Label of the active quality filter, if one is chosen
    pub fn chosen_label(&self) -> Option<&str> {
        self.filter_options.get(self.filter_choice).map(String::as_str)
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn active_source(&self) -> usize {
        self.active_source
    }

    pub fn panel(&self) -> Option<&FilterPanel> {
        self.panel.as_ref()
    }

    pub fn details(&self) -> Option<&DetailsMenu> {
        self.details.as_ref()
    }

    /// True once after the source ran out of navigation history
    pub fn take_exit(&mut self) -> bool {
        std::mem::take(&mut self.exit_requested)
    }

    pub fn stream_count(&self) -> usize {
        self.entries.iter().filter(|e| e.as_stream().is_some()).count()
    }

    fn filter_rows(&self) -> Vec<FilterRow> {
        let mut rows = vec![FilterRow::Reset];
        if self.sources.len() > 1 {
            rows.extend((0..self.sources.len()).map(FilterRow::Source));
        }
        rows.extend((0..self.filter_options.len()).map(FilterRow::Quality));
        rows
    }

    pub fn filter_row_label(&self, row: FilterRow) -> String {
        match row {
            FilterRow::Reset => "Reset filter".to_string(),
            FilterRow::Source(i) => {
                let marker = if i == self.active_source { "●" } else { " " };
                format!("{} Source: {}", marker, self.sources.get(i).map(String::as_str).unwrap_or("?"))
            }
            FilterRow::Quality(i) => {
                let marker = if i == self.filter_choice { "●" } else { " " };
                format!(
                    "{} Quality: {}",
                    marker,
                    self.filter_options.get(i).map(String::as_str).unwrap_or("?")
                )
            }
        }
    }

    fn open_filter(&mut self) -> Action {
        let rows = self.filter_rows();
        // Reset alone is not worth a panel
        if rows.len() > 1 {
            self.panel = Some(FilterPanel { rows, selected: 0 });
        }
        Action::None
    }

    pub fn handle_input(&mut self, input: Input) -> Action {
        if self.details.is_some() {
            return self.handle_details_input(input);
        }
        if self.panel.is_some() {
            return self.handle_panel_input(input);
        }

        match input {
            Input::Up => {
                if self.focus == 0 || self.entries.is_empty() {
                    self.open_filter()
                } else {
                    self.focus -= 1;
                    Action::None
                }
            }
            Input::Down => {
                if self.focus + 1 < self.entries.len() {
                    self.focus += 1;
                }
                Action::None
            }
            Input::Right => self.open_filter(),
            Input::Left => Action::ExitToMenu,
            Input::Back => Action::Back,
            Input::Enter => match self.focused() {
                Some(ListEntry::Stream(stream)) => Action::Play(stream.clone()),
                Some(entry) => EntryAction::for_entry(entry)
                    .map(Action::Open)
                    .unwrap_or(Action::None),
                None => Action::None,
            },
            Input::Details => {
                if let Some(ListEntry::Stream(stream)) = self.focused() {
                    self.details = Some(DetailsMenu::new((**stream).clone()));
                }
                Action::None
            }
        }
    }

    fn handle_panel_input(&mut self, input: Input) -> Action {
        let Some(panel) = self.panel.as_mut() else {
            return Action::None;
        };

        match input {
            Input::Up => {
                panel.selected = panel.selected.saturating_sub(1);
                Action::None
            }
            Input::Down => {
                if panel.selected + 1 < panel.rows.len() {
                    panel.selected += 1;
                }
                Action::None
            }
            Input::Back | Input::Left => {
                self.panel = None;
                Action::None
            }
            Input::Enter | Input::Right => {
                let row = panel.rows.get(panel.selected).copied();
                self.panel = None;
                match row {
                    Some(FilterRow::Reset) => Action::ResetFilter,
                    Some(FilterRow::Source(i)) => Action::SelectSource(i),
                    Some(FilterRow::Quality(i)) => Action::Filter(i),
                    None => Action::None,
                }
            }
            Input::Details => Action::None,
        }
    }

    fn handle_details_input(&mut self, input: Input) -> Action {
        let Some(menu) = self.details.as_mut() else {
            return Action::None;
        };

        if menu.info_open {
            if matches!(input, Input::Back | Input::Enter | Input::Left) {
                menu.info_open = false;
            }
            return Action::None;
        }

        match input {
            Input::Up => {
                menu.selected = menu.selected.saturating_sub(1);
                Action::None
            }
            Input::Down => {
                if menu.selected + 1 < menu.items.len() {
                    menu.selected += 1;
                }
                Action::None
            }
            Input::Back | Input::Left => {
                self.details = None;
                Action::None
            }
            Input::Enter => match menu.items.get(menu.selected).copied() {
                Some(DetailsItem::Play) => {
                    let entry = menu.entry.clone();
                    self.details = None;
                    Action::Play(entry)
                }
                Some(DetailsItem::CopyUrl) => {
                    let url = menu.entry.url().map(str::to_string);
                    self.details = None;
                    url.map(Action::CopyUrl).unwrap_or(Action::None)
                }
                Some(DetailsItem::Information) => {
                    menu.info_open = true;
                    Action::None
                }
                None => Action::None,
            },
            Input::Right | Input::Details => Action::None,
        }
    }
}

impl ListView for ListController {
    fn reset(&mut self) {
        self.entries.clear();
        self.focus = 0;
        self.empty = None;
        self.details = None;
    }

    fn loading(&mut self, active: bool) {
        self.loading = active;
        if active {
            self.entries.clear();
            self.empty = None;
        }
    }

    fn empty_for_query(&mut self, message: &str) {
        self.loading = false;
        self.entries.clear();
        self.focus = 0;
        self.empty = Some(message.to_string());
    }

    fn append(&mut self, entry: ListEntry) {
        self.empty = None;
        self.entries.push(entry);
    }

    fn start(&mut self, focus_first: bool) {
        if focus_first || self.focus >= self.entries.len() {
            self.focus = 0;
        }
    }

    fn update_filter(&mut self, options: &[String]) {
        self.filter_options = options.to_vec();
        self.filter_choice = 0;
    }

    fn filter_chosen(&mut self, index: usize) {
        self.filter_choice = index;
    }

    fn update_filter_info(&mut self, info: Option<String>) {
        self.filter_info = info;
    }

    fn update_sources(&mut self, titles: &[String], active: usize) {
        self.sources = titles.to_vec();
        self.active_source = active;
    }

    fn backward(&mut self) {
        self.exit_requested = true;
    }
}
