//! Playback sequencing: which track plays next.
//!
//! The sequencer owns the active track list, its pre-shuffle order, the
//! current position and the explicit play-next queue. It never talks to the
//! player directly; load requests accumulate in an outbox drained with
//! [`Sequencer::take_requests`], and observers receive [`SequencerEvent`]s
//! through channels handed out by [`Sequencer::subscribe`].

use crate::model::{PlaybackMode, RepeatMode, Track};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceCause {
    /// User pressed "next". Repeat-one is ignored.
    Skip,
    /// The player reported the current track finished.
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerRequest {
    Load(Track),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerEvent {
    TrackChanged(Track),
    ListReplaced { len: usize },
    PositionChanged(Option<usize>),
    QueueChanged { len: usize },
    ModeChanged(PlaybackMode),
    PlayingChanged(bool),
    Stopped,
}

#[derive(Debug)]
pub struct Sequencer {
    original: Vec<Track>,
    active: Vec<Track>,
    position: Option<usize>,
    current: Option<Track>,
    queue: Vec<Track>,
    mode: PlaybackMode,
    playing: bool,
    requests: Vec<PlayerRequest>,
    subscribers: Vec<Sender<SequencerEvent>>,
    shuffle_rng: SmallRng,
}

impl Sequencer {
    pub fn new(mode: PlaybackMode) -> Self {
        Self::with_rng(mode, SmallRng::from_rng(&mut rand::rng()))
    }

    pub fn with_seed(mode: PlaybackMode, seed: u64) -> Self {
        Self::with_rng(mode, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(mode: PlaybackMode, shuffle_rng: SmallRng) -> Self {
        Self {
            original: Vec::new(),
            active: Vec::new(),
            position: None,
            current: None,
            queue: Vec::new(),
            mode,
            playing: false,
            requests: Vec::new(),
            subscribers: Vec::new(),
            shuffle_rng,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<SequencerEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn take_requests(&mut self) -> Vec<PlayerRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn active(&self) -> &[Track] {
        &self.active
    }

    pub fn original(&self) -> &[Track] {
        &self.original
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Replaces the track list. Position and current track are left alone so
    /// playback of the previous list can continue.
    pub fn load_list(&mut self, tracks: Vec<Track>) {
        self.original = tracks.clone();
        self.active = tracks;
        if self.mode.shuffle {
            self.active.shuffle(&mut self.shuffle_rng);
        }
        debug!(len = self.active.len(), shuffle = self.mode.shuffle, "track list loaded");
        self.emit(SequencerEvent::ListReplaced {
            len: self.active.len(),
        });
    }

    /// Starts from the top of the list, drawing a fresh order first when
    /// shuffle is on.
    pub fn play_all(&mut self) {
        if self.active.is_empty() {
            return;
        }
        if self.mode.shuffle {
            self.active = self.original.clone();
            self.active.shuffle(&mut self.shuffle_rng);
            self.emit(SequencerEvent::ListReplaced {
                len: self.active.len(),
            });
        }
        self.play_at(0);
    }

    pub fn play_at(&mut self, index: usize) {
        let Some(track) = self.active.get(index).cloned() else {
            return;
        };

        self.position = Some(index);
        self.current = Some(track.clone());
        self.requests.push(PlayerRequest::Load(track.clone()));
        debug!(index, id = %track.id, "play at");
        self.emit(SequencerEvent::PositionChanged(self.position));
        self.emit(SequencerEvent::TrackChanged(track));
    }

    /// Plays `track_id` from the active list when present. Otherwise the
    /// fallback is loaded as-is and the list position is kept, so the next
    /// advance resumes the list where it was.
    pub fn play_by_id(&mut self, track_id: &str, fallback: Option<Track>) {
        if let Some(index) = index_of(&self.active, track_id) {
            self.play_at(index);
            return;
        }

        let Some(track) = fallback else {
            return;
        };
        debug!(id = %track.id, "playing track outside the active list");
        self.current = Some(track.clone());
        self.requests.push(PlayerRequest::Load(track.clone()));
        self.emit(SequencerEvent::TrackChanged(track));
    }

    pub fn skip_forward(&mut self) {
        self.advance(AdvanceCause::Skip);
    }

    pub fn track_ended(&mut self) {
        self.advance(AdvanceCause::Ended);
    }

    pub fn advance(&mut self, cause: AdvanceCause) {
        if cause == AdvanceCause::Ended && self.mode.repeat == RepeatMode::One {
            match (self.position, self.current.clone()) {
                (Some(position), _) => self.play_at(position),
                (None, Some(track)) => self.play_by_id(&track.id, Some(track.clone())),
                (None, None) => {}
            }
            return;
        }

        if !self.queue.is_empty() {
            let next = self.queue.remove(0);
            self.emit(SequencerEvent::QueueChanged {
                len: self.queue.len(),
            });
            let id = next.id.clone();
            self.play_by_id(&id, Some(next));
            return;
        }

        let len = self.active.len();
        match self.position {
            Some(position) if position + 1 < len => self.play_at(position + 1),
            None if len > 0 => self.play_at(0),
            _ if self.mode.repeat == RepeatMode::All && len > 0 => self.play_at(0),
            _ => self.stop(),
        }
    }

    pub fn retreat(&mut self) {
        let len = self.active.len();
        match self.position {
            Some(position) if position > 0 => self.play_at(position - 1),
            _ if self.mode.repeat == RepeatMode::All && len > 0 => self.play_at(len - 1),
            _ => {}
        }
    }

    pub fn toggle_shuffle(&mut self) {
        self.mode.shuffle = !self.mode.shuffle;
        self.active = self.original.clone();
        if self.mode.shuffle {
            self.active.shuffle(&mut self.shuffle_rng);
        }
        self.relocate_current();
        self.emit(SequencerEvent::ModeChanged(self.mode));
        self.emit(SequencerEvent::ListReplaced {
            len: self.active.len(),
        });
    }

    pub fn toggle_repeat(&mut self) {
        self.mode.repeat = self.mode.repeat.next();
        self.emit(SequencerEvent::ModeChanged(self.mode));
    }

    /// Applies a restored mode, reordering the active list if the shuffle
    /// flag differs.
    pub fn set_mode(&mut self, mode: PlaybackMode) {
        if mode.shuffle != self.mode.shuffle {
            self.toggle_shuffle();
        }
        if mode.repeat != self.mode.repeat {
            self.mode.repeat = mode.repeat;
            self.emit(SequencerEvent::ModeChanged(self.mode));
        }
    }

    pub fn enqueue(&mut self, track: Track) {
        self.queue.push(track);
        self.emit(SequencerEvent::QueueChanged {
            len: self.queue.len(),
        });
    }

    pub fn dequeue_at(&mut self, index: usize) -> Option<Track> {
        if index >= self.queue.len() {
            return None;
        }
        let removed = self.queue.remove(index);
        self.emit(SequencerEvent::QueueChanged {
            len: self.queue.len(),
        });
        Some(removed)
    }

    pub fn restore_queue(&mut self, tracks: Vec<Track>) {
        self.queue = tracks;
        self.emit(SequencerEvent::QueueChanged {
            len: self.queue.len(),
        });
    }

    pub fn set_playing(&mut self, playing: bool) {
        if self.playing == playing {
            return;
        }
        self.playing = playing;
        self.emit(SequencerEvent::PlayingChanged(playing));
    }

    fn stop(&mut self) {
        debug!("reached end of track list");
        self.set_playing(false);
        self.emit(SequencerEvent::Stopped);
    }

    // A miss keeps the old numeric position, which may now name a different
    // track. Only reachable when the list changed underneath the current track.
    fn relocate_current(&mut self) {
        let Some(current) = &self.current else {
            return;
        };
        match index_of(&self.active, &current.id) {
            Some(index) => self.position = Some(index),
            None => warn!(
                id = %current.id,
                position = ?self.position,
                "current track not in reordered list; keeping position"
            ),
        }
        self.emit(SequencerEvent::PositionChanged(self.position));
    }

    fn emit(&mut self, event: SequencerEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn index_of(tracks: &[Track], id: &str) -> Option<usize> {
    tracks.iter().position(|track| track.id == id)
}
