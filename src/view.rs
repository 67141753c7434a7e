//! The list surface a stream source renders into.
//!
//! `StreamSource` only ever talks to a `ListView`; the TUI implements it with
//! `ChannelView` (events crossing into the UI task), tests with a plain
//! `ListController`.

use tokio::sync::mpsc::UnboundedSender;

use crate::addon::StreamCandidate;
use crate::content::ContentRef;
use crate::parser::ParsedTag;

/// A rendered stream row
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    /// 1-based position in the response the row came from
    pub position: usize,
    pub title: String,
    pub info: String,
    pub candidate: StreamCandidate,
    pub tag: ParsedTag,
    pub content: ContentRef,
}

impl StreamEntry {
    pub fn new(position: usize, candidate: StreamCandidate, content: ContentRef) -> Self {
        let tag = candidate.parse();
        let title = candidate
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| candidate.title.clone().filter(|t| !t.is_empty()))
            .unwrap_or_else(|| format!("Stream {}", position));

        let mut info = candidate.name.clone().unwrap_or_default();
        if !candidate.is_playable() {
            info.push_str(" [NO URL]");
        }

        Self {
            position,
            title,
            info,
            candidate,
            tag,
            content,
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.candidate.resolve_url()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    Season {
        season: u32,
        title: String,
        info: String,
    },
    Episode {
        season: u32,
        episode: u32,
        title: String,
        info: String,
        watched: bool,
    },
    Stream(Box<StreamEntry>),
}

impl ListEntry {
    pub fn title(&self) -> &str {
        match self {
            ListEntry::Season { title, .. } | ListEntry::Episode { title, .. } => title,
            ListEntry::Stream(stream) => &stream.title,
        }
    }

    pub fn info(&self) -> &str {
        match self {
            ListEntry::Season { info, .. } | ListEntry::Episode { info, .. } => info,
            ListEntry::Stream(stream) => &stream.info,
        }
    }

    pub fn as_stream(&self) -> Option<&StreamEntry> {
        match self {
            ListEntry::Stream(stream) => Some(stream),
            _ => None,
        }
    }
}

/// What activating a season or episode row asks the source to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Season(u32),
    Episode { season: u32, episode: u32 },
}

impl EntryAction {
    pub fn for_entry(entry: &ListEntry) -> Option<Self> {
        match entry {
            ListEntry::Season { season, .. } => Some(EntryAction::Season(*season)),
            ListEntry::Episode { season, episode, .. } => Some(EntryAction::Episode {
                season: *season,
                episode: *episode,
            }),
            ListEntry::Stream(_) => None,
        }
    }
}

pub trait ListView: Send {
    fn reset(&mut self);
    fn loading(&mut self, active: bool);
    fn empty_for_query(&mut self, message: &str);
    fn append(&mut self, entry: ListEntry);
    fn start(&mut self, focus_first: bool);
    /// Quality options of the current candidate set
    fn update_filter(&mut self, options: &[String]);
    fn filter_chosen(&mut self, index: usize);
    /// Season/episode breadcrumb shown next to the filter
    fn update_filter_info(&mut self, info: Option<String>);
    fn update_sources(&mut self, _titles: &[String], _active: usize) {}
    /// No more history to unwind; leave the stream screen
    fn backward(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Reset,
    Loading(bool),
    Empty(String),
    Append(ListEntry),
    Start { focus_first: bool },
    Filter(Vec<String>),
    FilterChosen(usize),
    FilterInfo(Option<String>),
    Sources { titles: Vec<String>, active: usize },
    Backward,
}

/// Forwards view calls to the UI task
pub struct ChannelView {
    tx: UnboundedSender<ViewEvent>,
}

impl ChannelView {
    pub fn new(tx: UnboundedSender<ViewEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: ViewEvent) {
        // The UI may already be gone during shutdown
        let _ = self.tx.send(event);
    }
}

impl ListView for ChannelView {
    fn reset(&mut self) {
        self.send(ViewEvent::Reset);
    }

    fn loading(&mut self, active: bool) {
        self.send(ViewEvent::Loading(active));
    }

    fn empty_for_query(&mut self, message: &str) {
        self.send(ViewEvent::Empty(message.to_string()));
    }

    fn append(&mut self, entry: ListEntry) {
        self.send(ViewEvent::Append(entry));
    }

    fn start(&mut self, focus_first: bool) {
        self.send(ViewEvent::Start { focus_first });
    }

    fn update_filter(&mut self, options: &[String]) {
        self.send(ViewEvent::Filter(options.to_vec()));
    }

    fn filter_chosen(&mut self, index: usize) {
        self.send(ViewEvent::FilterChosen(index));
    }

    fn update_filter_info(&mut self, info: Option<String>) {
        self.send(ViewEvent::FilterInfo(info));
    }

    fn update_sources(&mut self, titles: &[String], active: usize) {
        self.send(ViewEvent::Sources {
            titles: titles.to_vec(),
            active,
        });
    }

    fn backward(&mut self) {
        self.send(ViewEvent::Backward);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_stream_entry_display_fields() {
        let candidate = StreamCandidate {
            name: Some("[RD+] Comet 1080p".into()),
            title: Some("Movie.2020.1080p".into()),
            description: Some("Movie 2020 | 1080p | 4.2 GB".into()),
            url: Some("https://cdn/1".into()),
            ..Default::default()
        };
        let entry = StreamEntry::new(1, candidate, ContentRef::movie("tt1"));
        assert_eq!(entry.title, "Movie 2020 | 1080p | 4.2 GB");
        assert_eq!(entry.info, "[RD+] Comet 1080p");
        assert_eq!(entry.tag.quality.as_deref(), Some("1080P"));
    }

    #[test]
    fn test_stream_entry_without_url_is_flagged() {
        let candidate = StreamCandidate {
            name: Some("Torrentio".into()),
            info_hash: Some("abc".into()),
            ..Default::default()
        };
        let entry = StreamEntry::new(3, candidate, ContentRef::movie("tt1"));
        assert_eq!(entry.title, "Stream 3");
        assert_eq!(entry.info, "Torrentio [NO URL]");
        assert_eq!(entry.url(), None);
    }

    #[test]
    fn test_channel_view_forwards_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut view = ChannelView::new(tx);

        view.loading(true);
        view.empty_for_query("Streams not found");
        view.update_filter_info(Some("S1".into()));

        assert_eq!(rx.try_recv().ok(), Some(ViewEvent::Loading(true)));
        assert_eq!(rx.try_recv().ok(), Some(ViewEvent::Empty("Streams not found".into())));
        assert_eq!(rx.try_recv().ok(), Some(ViewEvent::FilterInfo(Some("S1".into()))));
    }

    #[test]
    fn test_entry_action_mapping() {
        let season = ListEntry::Season {
            season: 2,
            title: "Season 2".into(),
            info: String::new(),
        };
        assert_eq!(EntryAction::for_entry(&season), Some(EntryAction::Season(2)));

        let episode = ListEntry::Episode {
            season: 1,
            episode: 4,
            title: "S01E04".into(),
            info: String::new(),
            watched: false,
        };
        assert_eq!(
            EntryAction::for_entry(&episode),
            Some(EntryAction::Episode { season: 1, episode: 4 })
        );
    }
}
