mod app;
mod ui;

pub use app::{App, View, lookup_title};

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::addon::AddonClient;
use crate::catalog::{self, AppContext, Card, CatalogRow};
use crate::config::Config;
use crate::content::TitleMeta;
use crate::controller::{Action, Input};
use crate::doctor::{self, CheckResult};
use crate::player::{self, PlayerContext};
use crate::screen::{ScreenCommand, ScreenHandle, StreamScreen};
use crate::source::Backend;
use crate::store::AppState;
use crate::trakt::TraktClient;
use crate::view::{ChannelView, StreamEntry, ViewEvent};

use app::{DiscoveryRow, TraktPrompt};

/// Messages sent from background tasks to the UI
pub enum UiMessage {
    RowsLoaded(Vec<(CatalogRow, Vec<Card>)>),
    MoreLoaded { row: String, cards: Vec<Card> },
    DoctorComplete(Vec<CheckResult>),
    TraktMarked(Result<(), String>),
}

/// A stream screen running on its own task, plus the events it renders
struct ActiveScreen {
    handle: ScreenHandle,
    events: mpsc::UnboundedReceiver<ViewEvent>,
}

impl ActiveScreen {
    fn open(config: &Config, state: &AppState, meta: TitleMeta) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let handle = StreamScreen::new(config, state).spawn(ChannelView::new(tx));
        handle.send(ScreenCommand::Search(meta));
        Self { handle, events }
    }
}

/// Clients shared by the discovery tasks
#[derive(Clone)]
struct Discovery {
    ctx: Arc<AppContext>,
    addon: Option<AddonClient>,
    trakt: Option<TraktClient>,
}

impl Discovery {
    fn new(config: &Config) -> Self {
        let addon = config
            .sources
            .url(Backend::AioStreams)
            .map(|_| config.sources.client(Backend::AioStreams));

        Self {
            ctx: Arc::new(AppContext::new()),
            addon,
            trakt: config.trakt.client(),
        }
    }

    fn load(&self, tx: mpsc::Sender<UiMessage>) {
        let this = self.clone();
        tokio::spawn(async move {
            let rows = catalog::register_rows(&this.ctx, this.addon.as_ref(), this.trakt.as_ref()).await;
            let loaded = catalog::load_rows(rows, this.addon.as_ref(), this.trakt.as_ref()).await;
            info!(rows = loaded.len(), "discovery rows loaded");
            let _ = tx.send(UiMessage::RowsLoaded(loaded)).await;
        });
    }

    fn load_more(&self, row: CatalogRow, skip: usize, tx: mpsc::Sender<UiMessage>) {
        let this = self.clone();
        tokio::spawn(async move {
            let cards = match catalog::fetch_row(&row, this.addon.as_ref(), this.trakt.as_ref(), skip).await {
                Ok(cards) => cards,
                Err(e) => {
                    warn!(row = %row.name, skip, error = %e, "failed to load more cards");
                    Vec::new()
                }
            };
            let _ = tx.send(UiMessage::MoreLoaded { row: row.name, cards }).await;
        });
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

/// Run the TUI. With `initial` set, the stream screen for that title opens first.
pub async fn run(config: Config, initial: Option<TitleMeta>) -> io::Result<()> {
    // Set up panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();
    let (tx, mut rx) = mpsc::channel::<UiMessage>(32);

    let result = run_app(&mut terminal, &mut app, &config, initial, tx, &mut rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    config: &Config,
    initial: Option<TitleMeta>,
    tx: mpsc::Sender<UiMessage>,
    rx: &mut mpsc::Receiver<UiMessage>,
) -> io::Result<()> {
    let mut state = AppState::load();
    let discovery = Discovery::new(config);
    let mut screen: Option<ActiveScreen> = None;

    if discovery.ctx.init_once() {
        app.is_loading_discovery = true;
        discovery.load(tx.clone());
    }

    if let Some(meta) = initial {
        info!(title = %meta.display_title(), "opening initial title");
        screen = Some(ActiveScreen::open(config, &state, meta.clone()));
        app.enter_streams(meta);
    }

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // Handle messages from background tasks
        while let Ok(msg) = rx.try_recv() {
            match msg {
                UiMessage::RowsLoaded(rows) => {
                    app.is_loading_discovery = false;
                    app.discovery_error = rows
                        .is_empty()
                        .then(|| "No catalogs available. Configure sources.aiostreams or Trakt.".to_string());
                    app.discovery_rows = rows
                        .into_iter()
                        .map(|(row, cards)| DiscoveryRow::new(row, cards))
                        .collect();
                    app.selected_row_index = 0;
                    app.selected_item_index = 0;
                }
                UiMessage::MoreLoaded { row, cards } => {
                    debug!(row = %row, count = cards.len(), "more cards loaded");
                    app.append_cards(&row, cards);
                }
                UiMessage::DoctorComplete(results) => {
                    app.doctor_results = results;
                    app.is_checking = false;
                }
                UiMessage::TraktMarked(Ok(())) => app.notify("Marked as watched on Trakt"),
                UiMessage::TraktMarked(Err(e)) => app.notify(format!("Trakt error: {}", e)),
            }
        }

        // Events rendered by the stream screen
        if let Some(active) = screen.as_mut() {
            while let Ok(event) = active.events.try_recv() {
                app.list.apply(event);
            }
            if app.list.take_exit() {
                close_screen(app, &mut screen);
            }
        }

        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
        {
            // Global quit
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                app.should_quit = true;
            }

            match app.view {
                View::Discovery => {
                    handle_discovery_key(app, key, config, &state, &discovery, &mut screen, &tx)
                }
                View::Lookup => handle_lookup_key(app, key, config, &state, &mut screen),
                View::Streams => handle_streams_key(app, key, config, &mut state, &mut screen, &tx),
                View::Doctor => match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => app.view = View::Discovery,
                    KeyCode::Char('r') if !app.is_checking => start_doctor(app, config, &tx),
                    _ => {}
                },
            }
        }

        if app.should_quit {
            if let Some(active) = screen.take() {
                active.handle.close();
            }
            return Ok(());
        }
    }
}

fn close_screen(app: &mut App, screen: &mut Option<ActiveScreen>) {
    if let Some(active) = screen.take() {
        active.handle.close();
    }
    app.leave_streams();
}

fn open_screen(app: &mut App, config: &Config, state: &AppState, screen: &mut Option<ActiveScreen>, meta: TitleMeta) {
    if let Some(active) = screen.take() {
        active.handle.close();
    }
    info!(title = %meta.display_title(), imdb_id = ?meta.imdb_id(), "opening stream screen");
    *screen = Some(ActiveScreen::open(config, state, meta.clone()));
    app.enter_streams(meta);
}

fn start_doctor(app: &mut App, config: &Config, tx: &mpsc::Sender<UiMessage>) {
    app.view = View::Doctor;
    app.is_checking = true;
    app.doctor_results.clear();

    let config = config.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let results = doctor::run_checks(&config).await;
        let _ = tx.send(UiMessage::DoctorComplete(results)).await;
    });
}

fn handle_discovery_key(
    app: &mut App,
    key: KeyEvent,
    config: &Config,
    state: &AppState,
    discovery: &Discovery,
    screen: &mut Option<ActiveScreen>,
    tx: &mpsc::Sender<UiMessage>,
) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => app.select_previous_row(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next_row(),
        KeyCode::Left | KeyCode::Char('h') => app.select_previous_item(),
        KeyCode::Right | KeyCode::Char('l') => {
            if app.at_row_end() {
                request_more(app, discovery, tx);
            }
            app.select_next_item();
        }
        KeyCode::Char('m') => request_more(app, discovery, tx),
        KeyCode::Char('r') if !app.is_loading_discovery => {
            app.is_loading_discovery = true;
            app.discovery_error = None;
            discovery.load(tx.clone());
        }
        KeyCode::Char('/') => {
            app.view = View::Lookup;
            app.lookup_error = None;
        }
        KeyCode::Char('d') => start_doctor(app, config, tx),
        KeyCode::Enter => {
            if let Some(card) = app.selected_card() {
                let meta = card.to_title_meta();
                open_screen(app, config, state, screen, meta);
            }
        }
        _ => {}
    }
}

fn request_more(app: &mut App, discovery: &Discovery, tx: &mpsc::Sender<UiMessage>) {
    let Some(row) = app.discovery_rows.get_mut(app.selected_row_index) else {
        return;
    };
    if row.exhausted || row.is_loading_more {
        return;
    }
    row.is_loading_more = true;
    discovery.load_more(row.row.clone(), row.next_skip, tx.clone());
}

fn handle_lookup_key(
    app: &mut App,
    key: KeyEvent,
    config: &Config,
    state: &AppState,
    screen: &mut Option<ActiveScreen>,
) {
    match key.code {
        KeyCode::Esc => {
            app.lookup_input.clear();
            app.lookup_error = None;
            app.view = View::Discovery;
        }
        KeyCode::Tab => app.lookup_series = !app.lookup_series,
        KeyCode::Enter => match app.lookup_meta() {
            Ok(meta) => {
                app.lookup_error = None;
                open_screen(app, config, state, screen, meta);
            }
            Err(e) => app.lookup_error = Some(e),
        },
        KeyCode::Backspace => {
            app.lookup_input.pop();
        }
        KeyCode::Char(c) => app.lookup_input.push(c),
        _ => {}
    }
}

fn stream_input(code: KeyCode) -> Option<Input> {
    match code {
        KeyCode::Up | KeyCode::Char('k') => Some(Input::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Input::Down),
        KeyCode::Left | KeyCode::Char('h') => Some(Input::Left),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('f') => Some(Input::Right),
        KeyCode::Enter => Some(Input::Enter),
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => Some(Input::Back),
        KeyCode::Char('i') => Some(Input::Details),
        _ => None,
    }
}

fn handle_streams_key(
    app: &mut App,
    key: KeyEvent,
    config: &Config,
    state: &mut AppState,
    screen: &mut Option<ActiveScreen>,
    tx: &mpsc::Sender<UiMessage>,
) {
    if app.trakt_prompt.is_some() {
        handle_trakt_prompt_key(app, key, config, tx);
        return;
    }

    let Some(input) = stream_input(key.code) else {
        return;
    };

    // Back interrupts a pending stream request before unwinding
    if input == Input::Back
        && let Some(active) = screen.as_ref()
        && active.handle.is_loading()
    {
        active.handle.cancel_loading();
    }

    let action = app.list.handle_input(input);
    let Some(active) = screen.as_ref() else {
        if action == Action::ExitToMenu || action == Action::Back {
            app.leave_streams();
        }
        return;
    };

    match action {
        Action::None => {}
        Action::Open(entry) => active.handle.send(ScreenCommand::Open(entry)),
        Action::Filter(index) => active.handle.send(ScreenCommand::Filter(index)),
        Action::ResetFilter => active.handle.send(ScreenCommand::ResetFilter),
        Action::SelectSource(index) => active.handle.send(ScreenCommand::SelectSource(index)),
        Action::Back => active.handle.send(ScreenCommand::Back),
        Action::Play(entry) => play(app, config, state, &entry),
        Action::CopyUrl(url) => copy_url(app, &url),
        Action::ExitToMenu => close_screen(app, screen),
    }
}

fn play(app: &mut App, config: &Config, state: &mut AppState, entry: &StreamEntry) {
    let Some(meta) = app.current_meta.clone() else {
        return;
    };
    let context = config.player.context();

    let request = match player::build_play_request(entry, &meta, context, state.last_player.as_deref()) {
        Ok(request) => request,
        Err(e) => {
            app.notify(e.to_string());
            return;
        }
    };

    match player::launch_player(&config.player.command, &config.player.args, &request) {
        Ok(child) => {
            player::watch_player(child);
            app.notify(format!("Playing {}", request.title));

            if context == PlayerContext::Web {
                let command = request.player.clone().unwrap_or_else(|| config.player.command.clone());
                state.last_player = Some(command);
                state.save();
            }

            if config.trakt.client().is_some() && meta.imdb_id().is_some() {
                app.trakt_prompt = Some(TraktPrompt {
                    meta,
                    content: entry.content.clone(),
                    selected: 0,
                });
            }
        }
        Err(e) => {
            error!(error = %e, "failed to launch player");
            app.notify(e.to_string());
        }
    }
}

fn copy_url(app: &mut App, url: &str) {
    let copied = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(url.to_string()));
    match copied {
        Ok(()) => app.notify("URL copied"),
        Err(e) => {
            warn!(error = %e, "clipboard unavailable");
            app.notify("Copy error");
        }
    }
}

fn handle_trakt_prompt_key(app: &mut App, key: KeyEvent, config: &Config, tx: &mpsc::Sender<UiMessage>) {
    let Some(prompt) = app.trakt_prompt.as_mut() else {
        return;
    };

    match key.code {
        KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
            prompt.selected = 1 - prompt.selected.min(1);
        }
        KeyCode::Char('y') => prompt.selected = 0,
        KeyCode::Char('n') => prompt.selected = 1,
        KeyCode::Esc | KeyCode::Char('q') => app.trakt_prompt = None,
        KeyCode::Enter => {
            let Some(prompt) = app.trakt_prompt.take() else {
                return;
            };
            if !prompt.confirmed() {
                return;
            }
            let Some(trakt) = config.trakt.client() else {
                return;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = trakt
                    .add_to_history(&prompt.meta, &prompt.content)
                    .await
                    .map_err(|e| e.to_string());
                let _ = tx.send(UiMessage::TraktMarked(result)).await;
            });
        }
        _ => {}
    }
}
