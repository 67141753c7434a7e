use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::addon::AddonClient;
use crate::config::Config;
use crate::content::{ContentKind, TitleMeta};
use crate::source::{Backend, RequestHandle, StreamSource};
use crate::store::AppState;
use crate::trakt::TraktClient;
use crate::view::{ChannelView, EntryAction, ListView};

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenCommand {
    Search(TitleMeta),
    Open(EntryAction),
    Filter(usize),
    ResetFilter,
    SelectSource(usize),
    Back,
    Destroy,
}

/// The stream screen: one `StreamSource` per configured backend, one of them active.
pub struct StreamScreen {
    sources: Vec<StreamSource>,
    active: usize,
    metadata: Option<AddonClient>,
    meta: Option<TitleMeta>,
    request: RequestHandle,
    state_path: Option<PathBuf>,
}

impl StreamScreen {
    pub fn new(config: &Config, state: &AppState) -> Self {
        let mut backends = config.sources.configured();
        if backends.is_empty() {
            // Still show the screen so it can explain what to configure
            backends.push(Backend::AioStreams);
        }

        let trakt = config.trakt.client();
        let clients = backends
            .into_iter()
            .map(|b| (b, config.sources.client(b)))
            .collect();

        Self::from_parts(
            clients,
            trakt,
            config.metadata_client(),
            state.last_source.as_deref(),
            AppState::state_path(),
        )
    }

    pub fn from_parts(
        clients: Vec<(Backend, AddonClient)>,
        trakt: Option<TraktClient>,
        metadata: Option<AddonClient>,
        last_source: Option<&str>,
        state_path: Option<PathBuf>,
    ) -> Self {
        let request = RequestHandle::new();
        let sources: Vec<StreamSource> = clients
            .into_iter()
            .map(|(backend, addon)| StreamSource::new(backend, addon, trakt.clone(), request.clone()))
            .collect();

        let active = last_source
            .and_then(|name| sources.iter().position(|s| s.backend().name() == name))
            .unwrap_or(0);

        Self {
            sources,
            active,
            metadata,
            meta: None,
            request,
            state_path,
        }
    }

    pub fn request_handle(&self) -> RequestHandle {
        self.request.clone()
    }

    pub fn active_backend(&self) -> Option<Backend> {
        self.sources.get(self.active).map(StreamSource::backend)
    }

    pub fn active_source(&self) -> Option<&StreamSource> {
        self.sources.get(self.active)
    }

    pub fn source_titles(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|s| s.backend().title().to_string())
            .collect()
    }

    /// Fill in season layout for series the caller only knew by id
    async fn enrich(&self, meta: TitleMeta) -> TitleMeta {
        if meta.kind() != ContentKind::Series || !meta.seasons.is_empty() {
            return meta;
        }
        let Some(metadata) = &self.metadata else {
            return meta;
        };
        let Some(imdb_id) = meta.imdb_id().map(str::to_string) else {
            return meta;
        };

        match metadata.fetch_meta(ContentKind::Series, &imdb_id).await {
            Ok(detail) => {
                let found = detail.to_title_meta();
                debug!(imdb_id = %imdb_id, seasons = found.seasons.len(), "enriched series metadata");
                TitleMeta {
                    title: if meta.title.is_empty() { found.title } else { meta.title },
                    year: meta.year.or(found.year),
                    number_of_seasons: meta.number_of_seasons.or(found.number_of_seasons),
                    seasons: found.seasons,
                    ..meta
                }
            }
            Err(e) => {
                warn!(imdb_id = %imdb_id, error = %e, "metadata lookup failed, using defaults");
                meta
            }
        }
    }

    pub async fn search(&mut self, meta: TitleMeta, view: &mut dyn ListView) {
        let meta = self.enrich(meta).await;
        self.meta = Some(meta.clone());

        view.update_sources(&self.source_titles(), self.active);
        view.reset();

        if let Some(source) = self.sources.get_mut(self.active) {
            source.search(meta, view).await;
        }
    }

    pub async fn select_source(&mut self, index: usize, view: &mut dyn ListView) {
        if index >= self.sources.len() {
            return;
        }

        if let Some(current) = self.sources.get_mut(self.active) {
            current.destroy();
        }
        self.active = index;

        let backend = self.sources[index].backend();
        info!(source = backend.name(), "stream source selected");
        self.persist_source(backend);

        if let Some(meta) = self.meta.clone() {
            self.search(meta, view).await;
        } else {
            view.update_sources(&self.source_titles(), self.active);
        }
    }

    fn persist_source(&self, backend: Backend) {
        let Some(path) = &self.state_path else {
            return;
        };
        let mut state = AppState::load_from(path);
        state.last_source = Some(backend.name().to_string());
        state.save_to(path);
    }

    /// Run one command. Returns false once the screen is destroyed.
    pub async fn handle(&mut self, command: ScreenCommand, view: &mut dyn ListView) -> bool {
        debug!(?command, "screen command");

        if let ScreenCommand::Search(meta) = command {
            self.search(meta, view).await;
            return true;
        }
        if let ScreenCommand::SelectSource(index) = command {
            self.select_source(index, view).await;
            return true;
        }
        if command == ScreenCommand::Destroy {
            self.destroy();
            return false;
        }

        let Some(source) = self.sources.get_mut(self.active) else {
            return true;
        };

        match command {
            ScreenCommand::Open(action) => source.open(action, view).await,
            ScreenCommand::Filter(index) => source.filter(index, view),
            ScreenCommand::ResetFilter => source.reset(view),
            ScreenCommand::Back => {
                if !source.go_back(view) {
                    view.backward();
                }
            }
            ScreenCommand::Search(_) | ScreenCommand::SelectSource(_) | ScreenCommand::Destroy => {}
        }
        true
    }

    pub fn destroy(&mut self) {
        for source in &mut self.sources {
            source.destroy();
        }
        self.meta = None;
    }

    /// Run the screen on its own task, rendering into `view`
    pub fn spawn(mut self, mut view: ChannelView) -> ScreenHandle {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = self.request.clone();

        let task = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                if !self.handle(command, &mut view).await {
                    break;
                }
            }
            self.destroy();
            debug!("stream screen stopped");
        });

        ScreenHandle { tx, request, task }
    }
}

/// UI side of a spawned `StreamScreen`
pub struct ScreenHandle {
    tx: mpsc::UnboundedSender<ScreenCommand>,
    request: RequestHandle,
    task: JoinHandle<()>,
}

impl ScreenHandle {
    pub fn send(&self, command: ScreenCommand) {
        if self.tx.send(command).is_err() {
            warn!("stream screen is gone");
        }
    }

    /// Abort the in-flight stream request without waiting for the worker
    pub fn cancel_loading(&self) {
        self.request.clear();
    }

    pub fn is_loading(&self) -> bool {
        self.request.is_active()
    }

    pub fn close(self) {
        self.request.clear();
        let _ = self.tx.send(ScreenCommand::Destroy);
        drop(self.task);
    }
}
