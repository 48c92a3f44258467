use super::{PlayerError, PlayerNotification, PlayerState, PlayerWidget};
use crate::sequencer::PlayerRequest;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Load(String),
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Load,
    Transport,
    Seek,
    Volume,
}

impl PlayerCommand {
    fn slot(&self) -> Slot {
        match self {
            Self::Load(_) => Slot::Load,
            Self::Play | Self::Pause => Slot::Transport,
            Self::Seek(_) => Slot::Seek,
            Self::SetVolume(_) => Slot::Volume,
        }
    }
}

/// Delivers commands to a [`PlayerWidget`], parking them while the widget is
/// not ready and retrying after [`RETRY_DELAY`]. A parked command is replaced
/// by a newer one of the same kind, never dropped.
pub struct PlayerDriver<W> {
    widget: W,
    parked: Vec<PlayerCommand>,
    retry_at: Option<Instant>,
    retry_delay: Duration,
    volume: f32,
}

impl<W: PlayerWidget> PlayerDriver<W> {
    pub fn new(widget: W) -> Self {
        Self {
            widget,
            parked: Vec::new(),
            retry_at: None,
            retry_delay: RETRY_DELAY,
            volume: 1.0,
        }
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn has_parked(&self) -> bool {
        !self.parked.is_empty()
    }

    pub fn request(&mut self, request: PlayerRequest, now: Instant) {
        match request {
            PlayerRequest::Load(track) => {
                self.submit(PlayerCommand::Load(track.id), now);
                self.submit(PlayerCommand::Play, now);
            }
        }
    }

    pub fn submit(&mut self, mut command: PlayerCommand, now: Instant) {
        if let PlayerCommand::SetVolume(volume) = &mut command {
            *volume = volume.clamp(0.0, 1.0);
            self.volume = *volume;
        }

        // Keep ordering: once something is parked, later commands queue too.
        if !self.parked.is_empty() || !self.widget.is_ready() {
            self.park(command, now);
            return;
        }

        match self.send(&command) {
            Ok(()) => {}
            Err(PlayerError::NotReady) => self.park(command, now),
            Err(err) if !self.widget.is_ready() => {
                warn!(?command, "player dropped while sending, will retry: {err}");
                self.park(command, now);
            }
            Err(err) => warn!(?command, "player command failed: {err}"),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        let Some(retry_at) = self.retry_at else {
            return;
        };
        if now < retry_at {
            return;
        }
        if !self.widget.is_ready() {
            debug!(parked = self.parked.len(), "player still not ready, retrying later");
            self.retry_at = Some(now + self.retry_delay);
            return;
        }

        self.retry_at = None;
        let mut parked = std::mem::take(&mut self.parked).into_iter();
        while let Some(command) = parked.next() {
            let result = self.send(&command);
            // A failed write can take the connection down with it.
            let lost = match &result {
                Ok(()) => false,
                Err(PlayerError::NotReady) => true,
                Err(_) => !self.widget.is_ready(),
            };
            if lost {
                self.parked.push(command);
                self.parked.extend(parked);
                self.retry_at = Some(now + self.retry_delay);
                return;
            }
            if let Err(err) = result {
                warn!(?command, "player command failed: {err}");
            }
        }
    }

    /// Drains widget notifications, logging errors and re-applying the
    /// volume whenever the widget reports ready.
    pub fn poll(&mut self, now: Instant) -> Vec<PlayerNotification> {
        let notifications = self.widget.poll_notifications();
        for notification in &notifications {
            match notification {
                PlayerNotification::Ready => {
                    info!(player = self.widget.name(), "player ready");
                    self.submit(PlayerCommand::SetVolume(self.volume), now);
                    if self.retry_at.is_some() {
                        self.retry_at = Some(now);
                    }
                }
                PlayerNotification::Error(code @ (101 | 150)) => {
                    warn!(code, "playback restricted by the track owner");
                }
                PlayerNotification::Error(code) => warn!(code, "player reported an error"),
                PlayerNotification::StateChanged(PlayerState::Ended) => debug!("track ended"),
                PlayerNotification::StateChanged(_) => {}
            }
        }
        notifications
    }

    fn park(&mut self, command: PlayerCommand, now: Instant) {
        let slot = command.slot();
        self.parked.retain(|parked| {
            let superseded =
                parked.slot() == slot || (slot == Slot::Load && parked.slot() == Slot::Seek);
            !superseded
        });
        debug!(?command, "player not ready, parking command");
        self.parked.push(command);
        if self.retry_at.is_none() {
            self.retry_at = Some(now + self.retry_delay);
        }
    }

    fn send(&mut self, command: &PlayerCommand) -> Result<(), PlayerError> {
        match command {
            PlayerCommand::Load(id) => self.widget.load(id),
            PlayerCommand::Play => self.widget.play(),
            PlayerCommand::Pause => self.widget.pause(),
            PlayerCommand::Seek(offset) => self.widget.seek(*offset),
            PlayerCommand::SetVolume(volume) => self.widget.set_volume(*volume),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Track;

    #[derive(Default)]
    struct TestWidget {
        ready: bool,
        refuse_next: usize,
        break_next: usize,
        sent: Vec<PlayerCommand>,
        pending: Vec<PlayerNotification>,
    }

    impl TestWidget {
        fn record(&mut self, command: PlayerCommand) -> Result<(), PlayerError> {
            if self.refuse_next > 0 {
                self.refuse_next -= 1;
                return Err(PlayerError::NotReady);
            }
            if self.break_next > 0 {
                self.break_next -= 1;
                self.ready = false;
                return Err(PlayerError::Io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )));
            }
            self.sent.push(command);
            Ok(())
        }
    }

    impl PlayerWidget for TestWidget {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn load(&mut self, track_id: &str) -> Result<(), PlayerError> {
            self.record(PlayerCommand::Load(track_id.to_string()))
        }

        fn play(&mut self) -> Result<(), PlayerError> {
            self.record(PlayerCommand::Play)
        }

        fn pause(&mut self) -> Result<(), PlayerError> {
            self.record(PlayerCommand::Pause)
        }

        fn seek(&mut self, offset_seconds: f64) -> Result<(), PlayerError> {
            if offset_seconds < 0.0 {
                return Err(PlayerError::Backend(String::from("negative seek")));
            }
            self.record(PlayerCommand::Seek(offset_seconds))
        }

        fn set_volume(&mut self, volume: f32) -> Result<(), PlayerError> {
            self.record(PlayerCommand::SetVolume(volume))
        }

        fn current_time(&self) -> Option<f64> {
            None
        }

        fn duration(&self) -> Option<f64> {
            None
        }

        fn poll_notifications(&mut self) -> Vec<PlayerNotification> {
            std::mem::take(&mut self.pending)
        }

        fn name(&self) -> &'static str {
            "test"
        }
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: id.to_string(),
            channel: String::new(),
            thumbnail: None,
            source_playlist_id: None,
        }
    }

    #[test]
    fn ready_widget_gets_load_then_play() {
        let mut driver = PlayerDriver::new(TestWidget {
            ready: true,
            ..TestWidget::default()
        });
        driver.request(PlayerRequest::Load(track("a")), Instant::now());
        assert_eq!(
            driver.widget().sent,
            vec![PlayerCommand::Load(String::from("a")), PlayerCommand::Play]
        );
        assert!(!driver.has_parked());
    }

    #[test]
    fn unready_widget_keeps_intent_until_ready() {
        let start = Instant::now();
        let mut driver = PlayerDriver::new(TestWidget::default());
        driver.request(PlayerRequest::Load(track("a")), start);
        assert!(driver.widget().sent.is_empty());

        driver.tick(start + RETRY_DELAY);
        assert!(driver.widget().sent.is_empty());
        assert!(driver.has_parked());

        driver.widget_mut().ready = true;
        driver.tick(start + RETRY_DELAY * 2);
        assert_eq!(
            driver.widget().sent,
            vec![PlayerCommand::Load(String::from("a")), PlayerCommand::Play]
        );
        assert!(!driver.has_parked());
    }

    #[test]
    fn newer_load_supersedes_parked_load_and_seek() {
        let start = Instant::now();
        let mut driver = PlayerDriver::new(TestWidget::default());
        driver.submit(PlayerCommand::Load(String::from("a")), start);
        driver.submit(PlayerCommand::Seek(30.0), start);
        driver.submit(PlayerCommand::Pause, start);
        driver.request(PlayerRequest::Load(track("b")), start);

        driver.widget_mut().ready = true;
        driver.tick(start + RETRY_DELAY);
        assert_eq!(
            driver.widget().sent,
            vec![PlayerCommand::Load(String::from("b")), PlayerCommand::Play]
        );
    }

    #[test]
    fn not_ready_error_reparks_the_rest_in_order() {
        let start = Instant::now();
        let mut driver = PlayerDriver::new(TestWidget {
            ready: true,
            refuse_next: 1,
            ..TestWidget::default()
        });
        driver.submit(PlayerCommand::Load(String::from("a")), start);
        driver.submit(PlayerCommand::Play, start);
        assert!(driver.widget().sent.is_empty());

        driver.tick(start + RETRY_DELAY);
        assert_eq!(
            driver.widget().sent,
            vec![PlayerCommand::Load(String::from("a")), PlayerCommand::Play]
        );
    }

    #[test]
    fn write_failure_that_disconnects_keeps_the_load() {
        let start = Instant::now();
        let mut driver = PlayerDriver::new(TestWidget {
            ready: true,
            break_next: 1,
            ..TestWidget::default()
        });
        driver.request(PlayerRequest::Load(track("a")), start);
        assert!(driver.widget().sent.is_empty());
        assert!(driver.has_parked());

        driver.widget_mut().ready = true;
        driver.tick(start + RETRY_DELAY);
        assert_eq!(
            driver.widget().sent,
            vec![PlayerCommand::Load(String::from("a")), PlayerCommand::Play]
        );
        assert!(!driver.has_parked());
    }

    #[test]
    fn disconnect_during_retry_reparks_the_rest() {
        let start = Instant::now();
        let mut driver = PlayerDriver::new(TestWidget::default());
        driver.request(PlayerRequest::Load(track("a")), start);

        driver.widget_mut().ready = true;
        driver.widget_mut().break_next = 1;
        driver.tick(start + RETRY_DELAY);
        assert!(driver.widget().sent.is_empty());
        assert!(driver.has_parked());

        driver.widget_mut().ready = true;
        driver.tick(start + RETRY_DELAY * 2);
        assert_eq!(
            driver.widget().sent,
            vec![PlayerCommand::Load(String::from("a")), PlayerCommand::Play]
        );
    }

    #[test]
    fn backend_errors_are_logged_and_dropped() {
        let mut driver = PlayerDriver::new(TestWidget {
            ready: true,
            ..TestWidget::default()
        });
        let now = Instant::now();
        driver.submit(PlayerCommand::Seek(-5.0), now);
        driver.submit(PlayerCommand::Seek(1.0), now);
        assert!(!driver.has_parked());
        assert_eq!(driver.widget().sent, vec![PlayerCommand::Seek(1.0)]);
    }

    #[test]
    fn volume_is_clamped_before_sending() {
        let mut driver = PlayerDriver::new(TestWidget {
            ready: true,
            ..TestWidget::default()
        });
        driver.submit(PlayerCommand::SetVolume(1.7), Instant::now());
        assert_eq!(driver.volume(), 1.0);
        assert_eq!(driver.widget().sent, vec![PlayerCommand::SetVolume(1.0)]);
    }

    #[test]
    fn ready_notification_reapplies_volume_and_flushes() {
        let start = Instant::now();
        let mut driver = PlayerDriver::new(TestWidget::default());
        driver.submit(PlayerCommand::SetVolume(0.4), start);
        driver.submit(PlayerCommand::Load(String::from("a")), start);

        driver.widget_mut().ready = true;
        driver.widget_mut().pending.push(PlayerNotification::Ready);
        let seen = driver.poll(start);
        driver.tick(start);

        assert_eq!(seen, vec![PlayerNotification::Ready]);
        assert_eq!(
            driver.widget().sent,
            vec![
                PlayerCommand::Load(String::from("a")),
                PlayerCommand::SetVolume(0.4)
            ]
        );
    }
}
