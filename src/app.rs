use crate::catalog::{CatalogRequest, CatalogWorker, YouTubeCatalog};
use crate::config::{self, AppConfig, PlayerKind};
use crate::core::{RajifyCore, View};
use crate::library::Library;
use crate::player::{NullPlayer, PlayerCommand, PlayerDriver, PlayerWidget, ProgressTicker};
use crate::store::PreferenceStore;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const SEEK_STEP_SECONDS: f64 = 10.0;

#[derive(Debug, PartialEq)]
enum KeyAction {
    None,
    Quit,
    Catalog(CatalogRequest),
    SeekBy(f64),
}

pub fn run(config: AppConfig) -> Result<()> {
    let library = Library::load(PreferenceStore::open(config::state_path()?));
    let mut core = RajifyCore::new(library, &config.language);

    let catalog = YouTubeCatalog::new(config.api_key.clone())
        .context("failed to build the catalog HTTP client")?;
    if config.api_key.is_none() {
        error!("no YouTube API key configured; catalog requests will return nothing");
        core.set_status("Set YOUTUBE_API_KEY or pass --api-key to browse playlists");
    }
    let mut worker = CatalogWorker::new(Arc::new(catalog));
    if config.api_key.is_some() {
        worker.request(core.popular_request());
    }

    let mut driver = PlayerDriver::new(open_player(&config));
    let mut ticker = ProgressTicker::default();
    info!(player = driver.widget().name(), language = %config.language, "starting");

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut last_tick = Instant::now();
    let result: Result<()> = loop {
        pump(&mut core, &mut worker, &mut driver, &mut ticker, Instant::now());

        if core.dirty || last_tick.elapsed() > Duration::from_millis(250) {
            let player_name = driver.widget().name();
            terminal.draw(|frame| crate::ui::draw(frame, &core, player_name))?;
            core.dirty = false;
            last_tick = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match handle_key(&mut core, key) {
            KeyAction::Quit => break Ok(()),
            KeyAction::Catalog(request) => worker.request(request),
            KeyAction::SeekBy(delta) => seek_by(&mut driver, delta, Instant::now()),
            KeyAction::None => {}
        }
        sync_player(&mut core, &mut driver, &mut ticker, Instant::now());
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("shutting down");
    result
}

fn open_player(config: &AppConfig) -> Box<dyn PlayerWidget> {
    match config.player {
        PlayerKind::Null => Box::new(NullPlayer::new()),
        PlayerKind::Mpv => spawn_mpv(config),
    }
}

#[cfg(unix)]
fn spawn_mpv(config: &AppConfig) -> Box<dyn PlayerWidget> {
    let spawned = config::ensure_config_dir()
        .and_then(|_| config::mpv_socket_path())
        .and_then(|socket| crate::player::mpv::MpvPlayer::spawn(&config.mpv_binary, socket));
    match spawned {
        Ok(player) => Box::new(player),
        Err(err) => {
            warn!("mpv unavailable, continuing without audio: {err:#}");
            Box::new(NullPlayer::new())
        }
    }
}

#[cfg(not(unix))]
fn spawn_mpv(_config: &AppConfig) -> Box<dyn PlayerWidget> {
    warn!("the mpv backend needs unix sockets, continuing without audio");
    Box::new(NullPlayer::new())
}

/// One loop iteration without terminal I/O: apply catalog results and
/// player notifications, then push the resulting requests to the player.
fn pump<W: PlayerWidget>(
    core: &mut RajifyCore,
    worker: &mut CatalogWorker,
    driver: &mut PlayerDriver<W>,
    ticker: &mut ProgressTicker,
    now: Instant,
) {
    while let Some(response) = worker.try_recv() {
        core.apply_catalog(response);
    }
    core.set_loading(worker.is_busy());
    for notification in driver.poll(now) {
        core.handle_notification(notification);
    }
    sync_player(core, driver, ticker, now);
}

fn sync_player<W: PlayerWidget>(
    core: &mut RajifyCore,
    driver: &mut PlayerDriver<W>,
    ticker: &mut ProgressTicker,
    now: Instant,
) {
    match core.drain_events() {
        Some(true) => ticker.start(now),
        Some(false) => ticker.cancel(),
        None => {}
    }
    for request in core.sequencer.take_requests() {
        driver.request(request, now);
    }
    for command in core.take_commands() {
        driver.submit(command, now);
    }
    driver.tick(now);

    if let Some(progress) = ticker.poll(driver.widget(), now) {
        core.set_progress(progress);
    }
}

fn seek_by<W: PlayerWidget>(driver: &mut PlayerDriver<W>, delta: f64, now: Instant) {
    let Some(current) = driver.widget().current_time() else {
        return;
    };
    let mut target = (current + delta).max(0.0);
    if let Some(duration) = driver.widget().duration() {
        target = target.min(duration);
    }
    driver.submit(PlayerCommand::Seek(target), now);
}

fn handle_key(core: &mut RajifyCore, key: KeyEvent) -> KeyAction {
    if core.search_input.is_some() {
        match key.code {
            KeyCode::Esc => core.cancel_search(),
            KeyCode::Enter => {
                if let Some(request) = core.submit_search() {
                    return KeyAction::Catalog(request);
                }
            }
            KeyCode::Backspace => core.pop_search_char(),
            KeyCode::Char(ch) => core.push_search_char(ch),
            _ => {}
        }
        return KeyAction::None;
    }

    let request = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return KeyAction::Quit;
        }
        KeyCode::Char('q') => return KeyAction::Quit,
        KeyCode::Down | KeyCode::Char('j') => {
            core.select_next();
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            core.select_prev();
            None
        }
        KeyCode::Enter => core.activate_selected(),
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('h') => core.go_home(),
        KeyCode::Char('/') => {
            core.begin_search();
            None
        }
        KeyCode::Char('p') => {
            core.show(View::Playlist);
            None
        }
        KeyCode::Char('l') => {
            core.show(View::Library);
            None
        }
        KeyCode::Char('u') => {
            core.show(View::Queue);
            None
        }
        KeyCode::Char('a') => core.play_all_selected(),
        KeyCode::Char(' ') => {
            core.toggle_play();
            None
        }
        KeyCode::Char('n') => {
            core.sequencer.skip_forward();
            None
        }
        KeyCode::Char('b') => {
            core.sequencer.retreat();
            None
        }
        KeyCode::Char('s') => {
            core.toggle_shuffle();
            None
        }
        KeyCode::Char('r') => {
            core.cycle_repeat();
            None
        }
        KeyCode::Char('e') => {
            core.enqueue_selected();
            None
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            core.dequeue_selected();
            None
        }
        KeyCode::Char('f') => {
            core.toggle_favorite();
            None
        }
        KeyCode::Char('w') => {
            core.save_current();
            None
        }
        KeyCode::Char('g') => Some(core.cycle_language()),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            core.adjust_volume(true);
            None
        }
        KeyCode::Char('-') => {
            core.adjust_volume(false);
            None
        }
        KeyCode::Left => return KeyAction::SeekBy(-SEEK_STEP_SECONDS),
        KeyCode::Right => return KeyAction::SeekBy(SEEK_STEP_SECONDS),
        _ => None,
    };

    request.map_or(KeyAction::None, KeyAction::Catalog)
}
