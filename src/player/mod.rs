mod driver;
#[cfg(unix)]
pub mod mpv;
mod progress;

pub use driver::{PlayerCommand, PlayerDriver, RETRY_DELAY};
pub use progress::{PROGRESS_INTERVAL, Progress, ProgressTicker, format_duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("player is not ready")]
    NotReady,
    #[error("player backend error: {0}")]
    Backend(String),
    #[error("player i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Playing,
    Paused,
    Buffering,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerNotification {
    Ready,
    StateChanged(PlayerState),
    Error(i32),
}

/// Embedded or external media player. Calls are requests; their effect is
/// observed later through [`PlayerWidget::poll_notifications`].
pub trait PlayerWidget {
    fn is_ready(&self) -> bool;
    fn load(&mut self, track_id: &str) -> Result<(), PlayerError>;
    fn play(&mut self) -> Result<(), PlayerError>;
    fn pause(&mut self) -> Result<(), PlayerError>;
    fn seek(&mut self, offset_seconds: f64) -> Result<(), PlayerError>;
    fn set_volume(&mut self, volume: f32) -> Result<(), PlayerError>;
    fn current_time(&self) -> Option<f64>;
    fn duration(&self) -> Option<f64>;
    fn poll_notifications(&mut self) -> Vec<PlayerNotification>;
    fn name(&self) -> &'static str;
}

impl<W: PlayerWidget + ?Sized> PlayerWidget for Box<W> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn load(&mut self, track_id: &str) -> Result<(), PlayerError> {
        (**self).load(track_id)
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        (**self).play()
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        (**self).pause()
    }

    fn seek(&mut self, offset_seconds: f64) -> Result<(), PlayerError> {
        (**self).seek(offset_seconds)
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), PlayerError> {
        (**self).set_volume(volume)
    }

    fn current_time(&self) -> Option<f64> {
        (**self).current_time()
    }

    fn duration(&self) -> Option<f64> {
        (**self).duration()
    }

    fn poll_notifications(&mut self) -> Vec<PlayerNotification> {
        (**self).poll_notifications()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Player that accepts every request and plays nothing. Used when no media
/// backend is available.
#[derive(Debug, Default)]
pub struct NullPlayer {
    loaded: Option<String>,
    paused: bool,
    volume: f32,
    pending: Vec<PlayerNotification>,
    announced: bool,
}

impl NullPlayer {
    pub fn new() -> Self {
        Self {
            volume: 1.0,
            ..Self::default()
        }
    }

    pub fn loaded(&self) -> Option<&str> {
        self.loaded.as_deref()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl PlayerWidget for NullPlayer {
    fn is_ready(&self) -> bool {
        true
    }

    fn load(&mut self, track_id: &str) -> Result<(), PlayerError> {
        self.loaded = Some(track_id.to_string());
        self.paused = false;
        self.pending
            .push(PlayerNotification::StateChanged(PlayerState::Playing));
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        if self.loaded.is_some() && self.paused {
            self.paused = false;
            self.pending
                .push(PlayerNotification::StateChanged(PlayerState::Playing));
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        if self.loaded.is_some() && !self.paused {
            self.paused = true;
            self.pending
                .push(PlayerNotification::StateChanged(PlayerState::Paused));
        }
        Ok(())
    }

    fn seek(&mut self, _offset_seconds: f64) -> Result<(), PlayerError> {
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), PlayerError> {
        self.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    fn current_time(&self) -> Option<f64> {
        None
    }

    fn duration(&self) -> Option<f64> {
        None
    }

    fn poll_notifications(&mut self) -> Vec<PlayerNotification> {
        if !self.announced {
            self.announced = true;
            self.pending.insert(0, PlayerNotification::Ready);
        }
        std::mem::take(&mut self.pending)
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_player_announces_ready_once_and_tracks_state() {
        let mut player = NullPlayer::new();
        assert_eq!(player.poll_notifications(), vec![PlayerNotification::Ready]);

        player.load("abc").expect("load");
        player.pause().expect("pause");
        player.pause().expect("pause again");
        player.play().expect("play");

        assert_eq!(
            player.poll_notifications(),
            vec![
                PlayerNotification::StateChanged(PlayerState::Playing),
                PlayerNotification::StateChanged(PlayerState::Paused),
                PlayerNotification::StateChanged(PlayerState::Playing),
            ]
        );
        assert_eq!(player.loaded(), Some("abc"));
    }

    #[test]
    fn null_player_clamps_volume() {
        let mut player = NullPlayer::new();
        player.set_volume(3.0).expect("volume");
        assert_eq!(player.volume(), 1.0);
    }
}
