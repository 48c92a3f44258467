use crate::catalog::{CatalogRequest, CatalogResponse};
use crate::library::Library;
use crate::model::{PlaybackSettings, PlaylistSummary, Track, next_language};
use crate::player::{PlayerCommand, PlayerNotification, PlayerState, Progress};
use crate::sequencer::{Sequencer, SequencerEvent};
use std::sync::mpsc::Receiver;
use tracing::{debug, info};

const VOLUME_STEP: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Search,
    Playlist,
    Library,
    Queue,
}

impl View {
    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Search => "Search",
            Self::Playlist => "Playlist",
            Self::Library => "Your Library",
            Self::Queue => "Queue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Playlist,
    Track,
    Saved,
    Recent,
}

#[derive(Debug, Clone)]
pub struct BrowserEntry {
    pub kind: EntryKind,
    pub label: String,
    pub detail: String,
    pub playing: bool,
    pub favorite: bool,
}

/// UI-facing state: the sequencer, the user's library and what the browser
/// panel currently shows. Player commands collect in an outbox drained by
/// [`RajifyCore::take_commands`].
pub struct RajifyCore {
    pub sequencer: Sequencer,
    pub library: Library,
    pub view: View,
    pub playlists: Vec<PlaylistSummary>,
    pub selected: usize,
    pub language: String,
    pub search_input: Option<String>,
    pub last_search: String,
    pub settings: PlaybackSettings,
    pub progress: Option<Progress>,
    pub loading: bool,
    pub dirty: bool,
    pub status: String,
    open_playlist_title: Option<String>,
    requested_playlist: Option<String>,
    pending_play_all: Option<String>,
    commands: Vec<PlayerCommand>,
    events: Receiver<SequencerEvent>,
}

impl RajifyCore {
    pub fn new(library: Library, language: &str) -> Self {
        let mode = library.settings().mode();
        Self::with_sequencer(library, language, Sequencer::new(mode))
    }

    pub fn with_sequencer(library: Library, language: &str, mut sequencer: Sequencer) -> Self {
        let mut settings = library.settings();
        settings.volume = settings.clamped_volume();
        sequencer.set_mode(settings.mode());
        sequencer.restore_queue(library.saved_queue());
        let events = sequencer.subscribe();

        Self {
            sequencer,
            library,
            view: View::Home,
            playlists: Vec::new(),
            selected: 0,
            language: language.to_string(),
            search_input: None,
            last_search: String::new(),
            settings,
            progress: None,
            loading: false,
            dirty: true,
            status: String::from("Ready"),
            open_playlist_title: None,
            requested_playlist: None,
            pending_play_all: None,
            commands: vec![PlayerCommand::SetVolume(settings.volume)],
            events,
        }
    }

    pub fn popular_request(&mut self) -> CatalogRequest {
        self.loading = true;
        self.set_status(&format!("Loading {} playlists", self.language));
        CatalogRequest::Popular {
            language: self.language.clone(),
        }
    }

    pub fn take_commands(&mut self) -> Vec<PlayerCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn entry_count(&self) -> usize {
        match self.view {
            View::Home | View::Search => self.playlists.len(),
            View::Playlist => self.sequencer.active().len(),
            View::Library => self.library.saved().len() + self.library.recent().len(),
            View::Queue => self.sequencer.queue().len(),
        }
    }

    pub fn entries(&self) -> Vec<BrowserEntry> {
        let current_id = self.sequencer.current().map(|track| track.id.as_str());
        let track_entry = |track: &Track| BrowserEntry {
            kind: EntryKind::Track,
            label: track.title.clone(),
            detail: track.channel.clone(),
            playing: Some(track.id.as_str()) == current_id,
            favorite: self.library.is_favorite(&track.id),
        };
        let playlist_entry = |kind: EntryKind, summary: &PlaylistSummary| BrowserEntry {
            kind,
            label: summary.title.clone(),
            detail: summary.channel_title.clone(),
            playing: false,
            favorite: false,
        };

        match self.view {
            View::Home | View::Search => self
                .playlists
                .iter()
                .map(|summary| playlist_entry(EntryKind::Playlist, summary))
                .collect(),
            View::Playlist => self.sequencer.active().iter().map(track_entry).collect(),
            View::Queue => self.sequencer.queue().iter().map(track_entry).collect(),
            View::Library => {
                let saved = self.library.saved().iter().map(|playlist| BrowserEntry {
                    kind: EntryKind::Saved,
                    label: playlist.title.clone(),
                    detail: format!("{} songs", playlist.tracks.len()),
                    playing: false,
                    favorite: false,
                });
                let recent = self
                    .library
                    .recent()
                    .iter()
                    .map(|summary| playlist_entry(EntryKind::Recent, summary));
                saved.chain(recent).collect()
            }
        }
    }

    pub fn playlist_title(&self) -> Option<&str> {
        self.open_playlist_title.as_deref()
    }

    pub fn show(&mut self, view: View) {
        if self.view != view {
            self.view = view;
            self.selected = 0;
            self.dirty = true;
        }
    }

    pub fn go_home(&mut self) -> Option<CatalogRequest> {
        self.show(View::Home);
        self.playlists.is_empty().then(|| self.popular_request())
    }

    pub fn select_next(&mut self) {
        let count = self.entry_count();
        if count > 0 {
            self.selected = (self.selected + 1).min(count - 1);
            self.dirty = true;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.dirty = true;
    }

    pub fn activate_selected(&mut self) -> Option<CatalogRequest> {
        let index = self.selected;
        match self.view {
            View::Home | View::Search => {
                let summary = self.playlists.get(index)?.clone();
                self.open_playlist(summary)
            }
            View::Playlist => {
                self.sequencer.play_at(index);
                None
            }
            View::Queue => {
                let track = self.sequencer.dequeue_at(index)?;
                let id = track.id.clone();
                self.sequencer.play_by_id(&id, Some(track));
                None
            }
            View::Library => {
                let saved_len = self.library.saved().len();
                if index < saved_len {
                    let playlist = self.library.saved()[index].clone();
                    self.requested_playlist = None;
                    self.open_playlist_title = Some(playlist.title.clone());
                    self.sequencer.load_list(playlist.tracks);
                    self.show(View::Playlist);
                    self.set_status(&format!("Opened {}", playlist.title));
                    None
                } else {
                    let summary = self.library.recent().get(index - saved_len)?.clone();
                    self.open_playlist(summary)
                }
            }
        }
    }

    /// Opens the selected playlist and starts it from the top once loaded.
    pub fn play_all_selected(&mut self) -> Option<CatalogRequest> {
        match self.view {
            View::Home | View::Search => {
                let summary = self.playlists.get(self.selected)?.clone();
                self.pending_play_all = Some(summary.id.clone());
                self.open_playlist(summary)
            }
            _ => {
                self.play_all();
                None
            }
        }
    }

    pub fn play_all(&mut self) {
        if self.sequencer.active().is_empty() {
            self.set_status("Nothing to play");
            return;
        }
        self.sequencer.play_all();
    }

    pub fn open_playlist(&mut self, summary: PlaylistSummary) -> Option<CatalogRequest> {
        if let Some(tracks) = self.library.cached_tracks(&summary.id) {
            debug!(playlist = %summary.id, "using cached playlist tracks");
            let tracks = tracks.to_vec();
            self.requested_playlist = None;
            self.apply_tracks(summary, tracks);
            return None;
        }

        self.requested_playlist = Some(summary.id.clone());
        self.loading = true;
        self.set_status(&format!("Loading {}", summary.title));
        Some(CatalogRequest::Playlist { summary })
    }

    /// Applies a finished catalog fetch. Track lists for anything but the
    /// most recently opened playlist are cached and otherwise ignored.
    pub fn apply_catalog(&mut self, response: CatalogResponse) {
        match response {
            CatalogResponse::Playlists { from_search, items } => {
                let count = items.len();
                self.playlists = items;
                self.view = if from_search { View::Search } else { View::Home };
                self.selected = 0;
                if count == 0 {
                    self.set_status("No playlists found");
                } else {
                    self.set_status(&format!("{count} playlists"));
                }
            }
            CatalogResponse::Tracks { summary, tracks } => {
                if !tracks.is_empty() {
                    self.library.cache_tracks(&summary.id, tracks.clone());
                }
                if self.requested_playlist.as_deref() != Some(summary.id.as_str()) {
                    debug!(playlist = %summary.id, "ignoring tracks for a superseded request");
                    return;
                }
                self.requested_playlist = None;
                if tracks.is_empty() {
                    if self.pending_play_all.as_deref() == Some(summary.id.as_str()) {
                        self.pending_play_all = None;
                    }
                    self.set_status(&format!("No tracks found in {}", summary.title));
                    return;
                }
                self.apply_tracks(summary, tracks);
            }
        }
    }

    fn apply_tracks(&mut self, summary: PlaylistSummary, tracks: Vec<Track>) {
        let count = tracks.len();
        self.sequencer.load_list(tracks);
        self.open_playlist_title = Some(summary.title.clone());
        self.library.set_current_playlist(&summary.id);
        self.set_status(&format!("{} ({count} songs)", summary.title));

        if self.pending_play_all.as_deref() == Some(summary.id.as_str()) {
            self.pending_play_all = None;
            self.sequencer.play_all();
        }
        self.library.record_recent(summary);
        self.view = View::Playlist;
        self.selected = 0;
    }

    pub fn begin_search(&mut self) {
        self.search_input = Some(String::new());
        self.dirty = true;
    }

    pub fn cancel_search(&mut self) {
        self.search_input = None;
        self.dirty = true;
    }

    pub fn push_search_char(&mut self, ch: char) {
        if let Some(input) = &mut self.search_input {
            input.push(ch);
            self.dirty = true;
        }
    }

    pub fn pop_search_char(&mut self) {
        if let Some(input) = &mut self.search_input {
            input.pop();
            self.dirty = true;
        }
    }

    pub fn submit_search(&mut self) -> Option<CatalogRequest> {
        let term = self.search_input.take()?.trim().to_string();
        self.dirty = true;
        if term.is_empty() {
            return None;
        }
        self.last_search = term.clone();
        self.loading = true;
        self.set_status(&format!("Searching for {term}"));
        Some(CatalogRequest::Search {
            term,
            language: self.language.clone(),
        })
    }

    /// Switches language and resets browsing like a fresh start.
    pub fn cycle_language(&mut self) -> CatalogRequest {
        self.language = next_language(&self.language).to_string();
        info!(language = %self.language, "language changed");
        self.playlists.clear();
        self.last_search.clear();
        self.search_input = None;
        self.open_playlist_title = None;
        self.requested_playlist = None;
        self.pending_play_all = None;
        self.sequencer.load_list(Vec::new());
        if self.sequencer.current().is_some() {
            self.commands.push(PlayerCommand::Pause);
        }
        self.sequencer.set_playing(false);
        self.progress = None;
        self.view = View::Home;
        self.selected = 0;
        self.popular_request()
    }

    pub fn toggle_play(&mut self) {
        if self.sequencer.current().is_none() {
            self.play_all();
            return;
        }
        let command = if self.sequencer.is_playing() {
            PlayerCommand::Pause
        } else {
            PlayerCommand::Play
        };
        self.commands.push(command);
    }

    pub fn toggle_shuffle(&mut self) {
        self.sequencer.toggle_shuffle();
    }

    pub fn cycle_repeat(&mut self) {
        self.sequencer.toggle_repeat();
    }

    pub fn adjust_volume(&mut self, up: bool) {
        let delta = if up { VOLUME_STEP } else { -VOLUME_STEP };
        let volume = (self.settings.volume + delta).clamp(0.0, 1.0);
        if (volume - self.settings.volume).abs() < f32::EPSILON {
            return;
        }
        self.settings.volume = volume;
        self.library.save_settings(&self.settings);
        self.commands.push(PlayerCommand::SetVolume(volume));
        self.set_status(&format!("Volume {:.0}%", volume * 100.0));
    }

    /// Targets the highlighted track in track views, otherwise the current one.
    pub fn toggle_favorite(&mut self) {
        let target = match self.view {
            View::Playlist => self.sequencer.active().get(self.selected),
            View::Queue => self.sequencer.queue().get(self.selected),
            _ => None,
        }
        .or(self.sequencer.current())
        .map(|track| (track.id.clone(), track.title.clone()));

        let Some((id, title)) = target else {
            self.set_status("No track selected");
            return;
        };
        if self.library.toggle_favorite(&id) {
            self.set_status(&format!("Added {title} to favorites"));
        } else {
            self.set_status(&format!("Removed {title} from favorites"));
        }
    }

    pub fn enqueue_selected(&mut self) {
        let track = match self.view {
            View::Playlist => self.sequencer.active().get(self.selected).cloned(),
            _ => None,
        };
        let Some(track) = track else {
            self.set_status("Select a track to queue");
            return;
        };
        self.set_status(&format!("Queued {}", track.title));
        self.sequencer.enqueue(track);
    }

    pub fn dequeue_selected(&mut self) {
        if self.view != View::Queue {
            return;
        }
        if let Some(track) = self.sequencer.dequeue_at(self.selected) {
            self.set_status(&format!("Removed {} from queue", track.title));
            let count = self.sequencer.queue().len();
            if self.selected >= count {
                self.selected = count.saturating_sub(1);
            }
        }
    }

    pub fn save_current(&mut self) {
        let tracks = self.sequencer.active().to_vec();
        match self.library.save_current(&tracks) {
            Some(saved) => {
                let title = saved.title.clone();
                self.set_status(&format!("Saved {title}"));
            }
            None => self.set_status("Nothing to save"),
        }
    }

    pub fn handle_notification(&mut self, notification: PlayerNotification) {
        match notification {
            PlayerNotification::StateChanged(PlayerState::Playing) => {
                self.sequencer.set_playing(true);
            }
            PlayerNotification::StateChanged(PlayerState::Paused) => {
                self.sequencer.set_playing(false);
            }
            PlayerNotification::StateChanged(PlayerState::Ended) => {
                self.sequencer.track_ended();
            }
            PlayerNotification::Error(code @ (101 | 150)) => {
                self.set_status(&format!("Playback restricted by the owner (code {code})"));
            }
            PlayerNotification::Error(code) => {
                self.set_status(&format!("Player error {code}"));
            }
            PlayerNotification::Ready | PlayerNotification::StateChanged(_) => {}
        }
    }

    /// Applies pending sequencer events and reports whether playback is
    /// active afterwards, if that changed.
    pub fn drain_events(&mut self) -> Option<bool> {
        let mut playing_changed = None;
        while let Ok(event) = self.events.try_recv() {
            self.dirty = true;
            match event {
                SequencerEvent::TrackChanged(track) => {
                    self.progress = None;
                    self.set_status(&format!("Playing {}", track.title));
                }
                SequencerEvent::ModeChanged(mode) => {
                    self.settings.set_mode(mode);
                    self.library.save_settings(&self.settings);
                    self.set_status(&format!(
                        "Shuffle {}  Repeat {}",
                        if mode.shuffle { "on" } else { "off" },
                        mode.repeat.label()
                    ));
                }
                SequencerEvent::QueueChanged { .. } => {
                    let queue = self.sequencer.queue().to_vec();
                    self.library.save_queue(&queue);
                }
                SequencerEvent::PlayingChanged(playing) => playing_changed = Some(playing),
                SequencerEvent::Stopped => {
                    self.progress = None;
                    self.set_status("End of playlist");
                }
                SequencerEvent::ListReplaced { .. } | SequencerEvent::PositionChanged(_) => {}
            }
        }
        playing_changed
    }

    pub fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.dirty = true;
        }
    }

    pub fn set_progress(&mut self, progress: Progress) {
        self.progress = Some(progress);
        self.dirty = true;
    }

    pub fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}
