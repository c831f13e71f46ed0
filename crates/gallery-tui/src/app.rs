//! App: component-based event loop.
//!
//! Architecture:
//! - `App` owns all components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks
//!   (terminal input, data fetch, mpv events, thumbnail probes).
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Player commands returned by the gallery are executed against mpv here,
//!   and mpv's answers are fed back in as player events.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use gallery_core::config::Config;
use gallery_core::gallery::Gallery;
use gallery_core::loader::{self, LoadError, LoadOutcome};
use gallery_core::player::{PlayerCommand, PlayerEvent};
use gallery_core::sort::SortKey;
use gallery_core::storage::JsonFileStore;

use crate::{
    action::Action,
    app_state::AppState,
    component::Component,
    components::{help_overlay::HelpOverlay, media_grid::MediaGrid, player_overlay::PlayerOverlay},
    mpv::{EntryTagger, MpvDriver, MpvEvent, MpvHandle},
    thumbs,
    widgets::{
        status_bar::{self, HeaderInfo, InputMode},
        toast::ToastManager,
    },
};

// ── Internal event bus ────────────────────────────────────────────────────────

pub enum AppMessage {
    Event(Event),
    Loaded(Result<LoadOutcome, LoadError>),
    /// A background mpv start finished, successfully or not.
    MpvReady {
        conn: u64,
        generation: u64,
        result: Result<(MpvHandle, Option<i64>), String>,
    },
    /// An mpv event from connection number `conn`.
    Mpv { conn: u64, event: MpvEvent },
    ThumbProbed { thumb: String, ok: bool },
}

/// Messages that cannot move cards, so queued input after them still
/// matches the hit map of the last frame.
fn keeps_layout(msg: &AppMessage) -> bool {
    matches!(
        msg,
        AppMessage::Mpv { .. } | AppMessage::MpvReady { .. } | AppMessage::ThumbProbed { .. }
    )
}

// ── Persistence serde structs ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct UiSessionState {
    #[serde(default)]
    sort_key: Option<String>,
    #[serde(default)]
    selected_id: Option<String>,
    #[serde(default = "default_true")]
    show_keys_bar: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UiSessionState {
    fn default() -> Self {
        Self {
            sort_key: None,
            selected_id: None,
            show_keys_bar: true,
        }
    }
}

fn load_ui_session_state(path: &Path) -> UiSessionState {
    let Ok(content) = std::fs::read_to_string(path) else {
        return UiSessionState::default();
    };
    serde_json::from_str(&content).unwrap_or_default()
}

fn save_ui_session_state(path: &Path, state: &UiSessionState) -> anyhow::Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(state)?)?;
    Ok(())
}

// ── Media backend ─────────────────────────────────────────────────────────────

/// mpv process plus the bookkeeping that ties its events to player generations.
struct MediaBackend {
    driver: MpvDriver,
    handle: Option<MpvHandle>,
    tagger: EntryTagger,
    /// Bumped on every (re)connect; events from older connections are dropped.
    conn: u64,
    app_tx: Option<mpsc::Sender<AppMessage>>,
}

impl MediaBackend {
    fn new(config: &Config) -> Self {
        Self {
            driver: MpvDriver::new(config.player.mpv_binary.clone(), config.player.volume),
            handle: None,
            tagger: EntryTagger::new(),
            conn: 0,
            app_tx: None,
        }
    }

    /// The handle of a running mpv, if any.
    fn live_handle(&mut self) -> Option<MpvHandle> {
        let h = self.handle.as_ref()?;
        if h.is_closed() || !self.driver.process_alive() {
            return None;
        }
        Some(h.clone())
    }

    /// Load `url` for `generation`. With mpv running this is one IPC round
    /// trip; otherwise mpv is spawned and the socket wait plus the load run on
    /// a background task that reports back with `AppMessage::MpvReady`.
    async fn load(&mut self, generation: u64, url: &str) -> anyhow::Result<()> {
        if let Some(handle) = self.live_handle() {
            let entry = handle.load_paused(url).await?;
            self.tagger.register(entry, generation);
            return Ok(());
        }
        self.start(generation, url)
    }

    fn start(&mut self, generation: u64, url: &str) -> anyhow::Result<()> {
        let app_tx = self
            .app_tx
            .clone()
            .ok_or_else(|| anyhow::anyhow!("event loop not running"))?;

        self.conn += 1;
        self.handle = None;
        self.tagger.reset();
        self.driver.spawn()?;

        let conn = self.conn;
        let socket_name = self.driver.socket_name.clone();
        let url = url.to_string();
        let (event_tx, mut event_rx) = mpsc::channel::<MpvEvent>(256);
        tokio::spawn(async move {
            let result = async move {
                let handle = MpvDriver::connect(socket_name, event_tx).await?;
                let entry = handle.load_paused(&url).await?;
                anyhow::Ok((handle, entry))
            }
            .await
            .map_err(|e| e.to_string());

            // Events are forwarded only after the ready message so the entry
            // is registered before its first event arrives.
            let connected = result.is_ok();
            let ready = AppMessage::MpvReady {
                conn,
                generation,
                result,
            };
            if app_tx.send(ready).await.is_err() || !connected {
                return;
            }
            while let Some(event) = event_rx.recv().await {
                if app_tx.send(AppMessage::Mpv { conn, event }).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    /// Adopt the outcome of a background start. `None` when it belongs to
    /// a superseded connection.
    fn ready(
        &mut self,
        conn: u64,
        generation: u64,
        result: Result<(MpvHandle, Option<i64>), String>,
    ) -> Option<Result<(), String>> {
        if conn != self.conn {
            debug!("mpv: dropping start result of connection {}", conn);
            return None;
        }
        match result {
            Ok((handle, entry)) => {
                self.handle = Some(handle);
                self.tagger.register(entry, generation);
                Some(Ok(()))
            }
            Err(reason) => {
                warn!("mpv start failed: {}", reason);
                Some(Err(reason))
            }
        }
    }

    async fn play(&mut self) -> anyhow::Result<()> {
        match &self.handle {
            Some(h) => h.play().await,
            None => anyhow::bail!("mpv is not running"),
        }
    }

    async fn stop(&mut self) {
        if let Some(h) = &self.handle {
            if let Err(e) = h.stop().await {
                debug!("mpv stop: {}", e);
            }
        }
    }

    /// Translate an event, or `None` when it is stale or carries no meaning.
    fn translate(&mut self, conn: u64, event: &MpvEvent) -> Option<PlayerEvent> {
        if conn != self.conn {
            return None;
        }
        self.tagger.translate(event)
    }

    fn disconnected(&mut self, conn: u64) -> bool {
        if conn != self.conn || self.handle.is_none() {
            return false;
        }
        info!("mpv: connection {} closed", conn);
        self.handle = None;
        self.tagger.reset();
        true
    }

    async fn shutdown(&mut self) {
        if let Some(h) = self.handle.take() {
            h.quit().await;
        }
        self.driver.kill().await;
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Screen regions from the last frame, for mouse routing.
#[derive(Debug, Clone, Default)]
struct PaneAreas {
    grid: Rect,
    overlay: Rect,
}

pub struct App {
    state: AppState,
    config: Config,

    grid: MediaGrid,
    player_overlay: PlayerOverlay,
    help_overlay: HelpOverlay,
    toast: ToastManager,

    media: MediaBackend,
    pane_areas: PaneAreas,
    show_keys_bar: bool,
    ui_state_path: PathBuf,
    should_quit: bool,
    tx: Option<mpsc::Sender<AppMessage>>,
}

impl App {
    pub fn new(config: Config, ui_state_path: PathBuf) -> Self {
        let ui_state = load_ui_session_state(&ui_state_path);
        let store = JsonFileStore::open(&config.storage.path);
        info!("viewed state stored in {}", store.path().display());

        let mut gallery = Gallery::new(Box::new(store), config.thumbnails.placeholder.clone());
        if let Some(key) = ui_state.sort_key.as_deref().and_then(SortKey::from_label) {
            gallery.sort(key);
        }

        let mut grid = MediaGrid::new();
        grid.follow_id(ui_state.selected_id.clone());

        Self {
            state: AppState::new(gallery, config.source.location.clone()),
            media: MediaBackend::new(&config),
            config,
            grid,
            player_overlay: PlayerOverlay::new(),
            help_overlay: HelpOverlay::new(),
            toast: ToastManager::new(),
            pane_areas: PaneAreas::default(),
            show_keys_bar: ui_state.show_keys_bar,
            ui_state_path,
            should_quit: false,
            tx: None,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);
        self.tx = Some(tx.clone());
        self.media.app_tx = Some(tx.clone());

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        self.start_load();

        // Toast expiry check + spinner animation: 100ms for smooth braille animation
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    let mut batch = keeps_layout(&msg);
                    self.handle_message(msg).await;
                    // Drain whatever queued up meanwhile before the next frame.
                    // Input is resolved against the last drawn hit map, so the
                    // drain stops after anything that may move cards.
                    while batch && !self.should_quit {
                        let Ok(next) = rx.try_recv() else {
                            break;
                        };
                        batch = keeps_layout(&next);
                        self.handle_message(next).await;
                    }
                    needs_redraw = true;
                }

                _ = toast_tick.tick() => {
                    if !self.toast.is_empty() {
                        self.toast.tick();
                        needs_redraw = true;
                    }
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        self.save_ui_session_state();
        self.media.shutdown().await;
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        Ok(())
    }

    // ── Message handler ───────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        return;
                    }
                    let actions = self.handle_key(key);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                }
                Event::Mouse(mouse) => {
                    let actions = self.handle_mouse(mouse);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                }
                _ => {}
            },

            AppMessage::Loaded(result) => self.on_loaded(result),

            AppMessage::MpvReady {
                conn,
                generation,
                result,
            } => match self.media.ready(conn, generation, result) {
                Some(Ok(())) => {
                    let player = self.state.gallery.player();
                    if player.is_closed() || player.generation() != generation {
                        // Dismissed while mpv was starting.
                        self.media.stop().await;
                    }
                }
                Some(Err(reason)) => {
                    let event = PlayerEvent::LoadFailed { generation, reason };
                    let commands = self.state.gallery.handle_player_event(event);
                    self.run_player_commands(commands).await;
                }
                None => {}
            },

            AppMessage::Mpv { conn, event } => {
                if event.is_disconnect() {
                    if self.media.disconnected(conn) && !self.state.gallery.player().is_closed() {
                        // mpv was quit from its own window: treat as a dismissal.
                        let commands = self.state.gallery.close_player();
                        self.run_player_commands(commands).await;
                    }
                } else if let Some(player_event) = self.media.translate(conn, &event) {
                    let commands = self.state.gallery.handle_player_event(player_event);
                    self.run_player_commands(commands).await;
                }
            }

            AppMessage::ThumbProbed { thumb, ok } => {
                if !ok {
                    self.state.gallery.mark_thumb_broken(&thumb);
                    self.state.rerender();
                }
            }
        }
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    fn start_load(&mut self) {
        let Some(tx) = self.tx.clone() else {
            return;
        };
        if self.state.loading {
            return;
        }
        self.state.loading = true;
        let location = self.state.source.clone();
        info!("loading media data from {}", location);
        tokio::spawn(async move {
            let result = loader::load(&location).await;
            let _ = tx.send(AppMessage::Loaded(result)).await;
        });
    }

    fn on_loaded(&mut self, result: Result<LoadOutcome, LoadError>) {
        self.state.loading = false;
        let summary = result
            .as_ref()
            .ok()
            .map(|o| (o.records.len(), o.dropped));
        if let Some(warning) = self.state.gallery.apply_load(result) {
            self.toast.warning(warning);
        }
        match summary {
            Some((n, 0)) => self.toast.info(format!("loaded {} items", n)),
            Some((n, dropped)) => self
                .toast
                .info(format!("loaded {} items ({} incomplete rows skipped)", n, dropped)),
            None => {}
        }
        if summary.is_some() && self.config.thumbnails.probe {
            if let Some(tx) = self.tx.clone() {
                thumbs::spawn_probes(self.state.gallery.thumbs_to_probe(), tx);
            }
        }
        self.state.rerender();
    }

    // ── Player ────────────────────────────────────────────────────────────────

    /// Execute player commands against mpv. Backend answers are fed straight
    /// back through the gallery, and whatever that yields is run too.
    async fn run_player_commands(&mut self, commands: Vec<PlayerCommand>) {
        let mut queue: VecDeque<PlayerCommand> = commands.into();
        while let Some(command) = queue.pop_front() {
            debug!("player command: {:?}", command);
            match command {
                PlayerCommand::Load { generation, url } => {
                    let title = self.state.gallery.player().title().to_string();
                    self.toast.spinner(format!("loading {}", title));
                    if let Err(e) = self.media.load(generation, &url).await {
                        warn!("mpv load failed: {}", e);
                        let event = PlayerEvent::LoadFailed {
                            generation,
                            reason: e.to_string(),
                        };
                        queue.extend(self.state.gallery.handle_player_event(event));
                    }
                }
                PlayerCommand::Play { generation } => {
                    let event = match self.media.play().await {
                        Ok(()) => PlayerEvent::PlaybackStarted { generation },
                        Err(e) => PlayerEvent::PlaybackFailed {
                            generation,
                            reason: e.to_string(),
                        },
                    };
                    queue.extend(self.state.gallery.handle_player_event(event));
                }
                PlayerCommand::Stop => self.media.stop().await,
                PlayerCommand::Notify(message) => self.toast.error(message),
                PlayerCommand::AutoMarkViewed(id) => {
                    // Settled inside the gallery; nothing reaches here.
                    debug!("unexpected auto-mark for {}", id);
                }
            }
        }
        if self.state.gallery.player().phase() != gallery_core::player::PlayerPhase::Opening {
            self.toast.dismiss_spinner();
        }
        self.state.rerender();
    }

    // ── Input routing ─────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let mode = self.state.input_mode();
        match key.code {
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                return vec![Action::Quit];
            }
            KeyCode::Char('K') if !self.help_overlay.visible => {
                return vec![Action::ToggleKeys];
            }
            _ => {}
        }

        // Help overlay captures all keys when visible
        if self.help_overlay.visible {
            let actions = self.help_overlay.handle_key(key, &self.state);
            if !actions.is_empty() {
                return actions;
            }
            // Any other key closes the overlay
            return vec![Action::ToggleHelp];
        }

        if mode == InputMode::Player {
            return self.player_overlay.handle_key(key, &self.state);
        }

        match key.code {
            KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE => vec![Action::Quit],
            KeyCode::Char('?') => vec![Action::ToggleHelp],
            _ => self.grid.handle_key(key, &self.state),
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let is_click = matches!(
            event.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        );
        if !is_click {
            return vec![];
        }

        let areas = self.pane_areas.clone();
        let s = &self.state;

        // Front to back: help, player overlay, grid.
        if self.help_overlay.visible {
            return self.help_overlay.handle_mouse(event, areas.overlay, s);
        }
        if s.gallery.player().overlay_visible() {
            return self.player_overlay.handle_mouse(event, areas.overlay, s);
        }
        if !s.gallery.player().is_closed() {
            // Still loading: the grid stays inert until the overlay shows.
            return vec![];
        }
        self.grid.handle_mouse(event, areas.grid, s)
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        // Broadcast action to all components first so they can capture
        // what they need from the state before it changes.
        let secondary: Vec<Action> = {
            let s = &self.state;
            let components: [&mut dyn Component; 3] = [
                &mut self.grid,
                &mut self.player_overlay,
                &mut self.help_overlay,
            ];
            let mut out = Vec::new();
            for c in components {
                let follow = c.on_action(&action, s);
                if !follow.is_empty() {
                    debug!("{:?} answered {:?} with {:?}", c.id(), action, follow);
                }
                out.extend(follow);
            }
            out
        };

        self.apply_action(action).await;

        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        debug!("apply_action: {:?}", action);
        match action {
            Action::Open(idx) => {
                let commands = self.state.gallery.open(idx);
                self.run_player_commands(commands).await;
            }
            Action::ClosePlayer => {
                let commands = self.state.gallery.close_player();
                self.run_player_commands(commands).await;
            }
            Action::ToggleViewed(id) => {
                match self.state.gallery.toggle_viewed(&id) {
                    Ok(now_viewed) => debug!("viewed {} = {}", id, now_viewed),
                    Err(e) => {
                        warn!("could not persist viewed state: {}", e);
                        self.toast.error(format!("Could not save viewed state: {}", e));
                    }
                }
                self.state.rerender();
            }
            Action::Sort(key) => self.apply_sort(key),
            Action::CycleSort => {
                let key = self.state.gallery.sort_key().map(SortKey::next).unwrap_or_default();
                self.apply_sort(key);
            }
            Action::CycleSortReverse => {
                let key = self
                    .state
                    .gallery
                    .sort_key()
                    .map(SortKey::prev)
                    .unwrap_or(SortKey::HowLongAgo);
                self.apply_sort(key);
            }
            Action::Reload => self.start_load(),
            Action::ToggleHelp => {}
            Action::ToggleKeys => {
                self.show_keys_bar = !self.show_keys_bar;
                self.save_ui_session_state();
            }
            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => {
                        let display = crate::components::fit(&text, 40);
                        self.toast.success(format!("copied: {}", display));
                    }
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.toast.error(format!("clipboard error: {}", e));
                    }
                }
            }
            Action::Quit => self.should_quit = true,
        }
    }

    fn apply_sort(&mut self, key: SortKey) {
        self.state.gallery.sort(key);
        self.state.rerender();
        self.save_ui_session_state();
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();

        let error = self.state.gallery.error_message().map(str::to_string);
        let banner_h = status_bar::banner_height(error.as_deref(), area.width);
        let status_h = if self.show_keys_bar { 1u16 } else { 0 };

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(banner_h),
                Constraint::Min(0),
                Constraint::Length(status_h),
            ])
            .split(area);

        let sort_label = self.state.gallery.sort_key().map(SortKey::label);
        status_bar::draw_header(
            frame,
            outer[0],
            &HeaderInfo {
                source: &self.state.source,
                total: self.state.gallery.store().len(),
                viewed: self.state.viewed,
                sort: sort_label,
                loading: self.state.loading,
            },
        );
        if let Some(message) = error.as_deref() {
            status_bar::draw_error_banner(frame, outer[1], message);
        }

        let grid_focused = self.state.gallery.player().is_closed() && !self.help_overlay.visible;
        self.grid.draw(frame, outer[2], grid_focused, &self.state);
        self.pane_areas.grid = outer[2];

        if self.show_keys_bar {
            status_bar::draw_keys_bar(frame, outer[3], self.state.input_mode());
        }

        self.player_overlay.draw(frame, area, true, &self.state);
        self.pane_areas.overlay = area;

        if self.help_overlay.visible {
            self.help_overlay.draw(frame, area, false, &self.state);
        }

        // Toast notifications (topmost layer)
        self.toast.draw(frame, area);
    }

    fn save_ui_session_state(&self) {
        let ui_state = UiSessionState {
            sort_key: self.state.gallery.sort_key().map(|k| k.label().to_string()),
            selected_id: self.grid.selected_id(&self.state),
            show_keys_bar: self.show_keys_bar,
        };
        if let Err(e) = save_ui_session_state(&self.ui_state_path, &ui_state) {
            warn!("could not save ui state: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_changing_messages_end_the_batch() {
        let mpv = AppMessage::Mpv {
            conn: 1,
            event: MpvEvent {
                raw: serde_json::json!({"event": "file-loaded"}),
            },
        };
        assert!(keeps_layout(&mpv));

        let loaded = AppMessage::Loaded(loader::build_records("id,url,title\n1,a.mp4,A\n"));
        assert!(!keeps_layout(&loaded));
        let probed = AppMessage::ThumbProbed {
            thumb: "t.jpg".into(),
            ok: false,
        };
        assert!(keeps_layout(&probed));
        assert!(!keeps_layout(&AppMessage::Event(Event::FocusGained)));
    }

    #[tokio::test]
    async fn test_background_start_failure_closes_player() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.path = dir.path().join("storage.json");
        let mut app = App::new(config, dir.path().join("ui_state.json"));
        app.on_loaded(loader::build_records("id,url,title\n1,a.mp4,A\n"));

        // Opening without running the commands leaves the player waiting on mpv.
        let _ = app.state.gallery.open(0);
        let generation = app.state.gallery.player().generation();
        app.media.conn = 3;

        app.handle_message(AppMessage::MpvReady {
            conn: 2,
            generation,
            result: Err("superseded".into()),
        })
        .await;
        assert!(!app.state.gallery.player().is_closed());

        app.handle_message(AppMessage::MpvReady {
            conn: 3,
            generation,
            result: Err("mpv IPC socket did not appear".into()),
        })
        .await;
        assert!(app.state.gallery.player().is_closed());
        assert!(!app.state.gallery.is_viewed("1"));
        assert!(app.toast.len() >= 1);
    }

    #[test]
    fn test_ui_state_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui_state.json");
        let state = UiSessionState {
            sort_key: Some("size".into()),
            selected_id: Some("42".into()),
            show_keys_bar: false,
        };
        save_ui_session_state(&path, &state).unwrap();
        assert_eq!(load_ui_session_state(&path), state);
    }

    #[test]
    fn test_ui_state_missing_or_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui_state.json");
        assert_eq!(load_ui_session_state(&path), UiSessionState::default());

        std::fs::write(&path, r#"{"sort_key":"title"}"#).unwrap();
        let loaded = load_ui_session_state(&path);
        assert_eq!(loaded.sort_key.as_deref(), Some("title"));
        assert!(loaded.show_keys_bar);

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(load_ui_session_state(&path), UiSessionState::default());
    }

    #[test]
    fn test_restored_sort_key_applies_to_gallery() {
        let dir = tempfile::tempdir().unwrap();
        let ui_path = dir.path().join("ui_state.json");
        std::fs::write(&ui_path, r#"{"sort_key":"uploaded","selected_id":"7"}"#).unwrap();

        let mut config = Config::default();
        config.storage.path = dir.path().join("storage.json");
        let app = App::new(config, ui_path);
        assert_eq!(app.state.gallery.sort_key(), Some(SortKey::HowLongAgo));
    }

    #[tokio::test]
    async fn test_open_without_mpv_reports_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.path = dir.path().join("storage.json");
        let mut app = App::new(config, dir.path().join("ui_state.json"));
        app.on_loaded(loader::build_records("id,url,title\n1,a.mp4,A\n"));

        // No event loop is running, so the backend cannot start.
        app.apply_action(Action::Open(0)).await;
        assert!(app.state.gallery.player().is_closed());
        assert!(!app.state.gallery.is_viewed("1"));
        assert!(!app.toast.has_spinner());
    }

    #[tokio::test]
    async fn test_toggle_and_close_actions() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("storage.json");
        let mut config = Config::default();
        config.storage.path = storage.clone();
        let mut app = App::new(config, dir.path().join("ui_state.json"));
        app.on_loaded(loader::build_records("id,url,title\n1,a.mp4,A\n"));

        app.apply_action(Action::ToggleViewed("1".into())).await;
        assert!(app.state.grid.cards[0].viewed);
        assert_eq!(app.state.grid.cards[0].toggle_label, "Mark as Unviewed");
        assert_eq!(app.state.viewed, 1);
        let stored = std::fs::read_to_string(&storage).unwrap();
        assert!(stored.contains("viewedItems"));

        // Closing an already-closed player is silent.
        app.apply_action(Action::ClosePlayer).await;
        assert!(app.state.gallery.player().is_closed());
        assert!(!app.toast.has_spinner());
    }
}
