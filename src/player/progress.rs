use super::PlayerWidget;
use std::time::{Duration, Instant};

pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub percent: f64,
    pub current: String,
    pub duration: String,
}

impl Progress {
    /// Builds a snapshot only when both readings are known and non-zero.
    pub fn from_times(current: Option<f64>, duration: Option<f64>) -> Option<Self> {
        let current = current.filter(|value| value.is_finite() && *value > 0.0)?;
        let duration = duration.filter(|value| value.is_finite() && *value > 0.0)?;
        Some(Self {
            percent: (current / duration * 100.0).clamp(0.0, 100.0),
            current: format_duration(current),
            duration: format_duration(duration),
        })
    }
}

/// Periodic progress sampling. Runs only between [`ProgressTicker::start`]
/// and [`ProgressTicker::cancel`]; it reads the player and never drives it.
#[derive(Debug)]
pub struct ProgressTicker {
    interval: Duration,
    next_due: Option<Instant>,
}

impl ProgressTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.next_due.is_none() {
            self.next_due = Some(now + self.interval);
        }
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn poll<W: PlayerWidget + ?Sized>(&mut self, widget: &W, now: Instant) -> Option<Progress> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        self.next_due = Some(now + self.interval);
        Progress::from_times(widget.current_time(), widget.duration())
    }
}

impl Default for ProgressTicker {
    fn default() -> Self {
        Self::new(PROGRESS_INTERVAL)
    }
}

pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return String::from("0:00");
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{PlayerError, PlayerNotification};

    struct FixedClock {
        time: Option<f64>,
        duration: Option<f64>,
    }

    impl PlayerWidget for FixedClock {
        fn is_ready(&self) -> bool {
            true
        }

        fn load(&mut self, _track_id: &str) -> Result<(), PlayerError> {
            Ok(())
        }

        fn play(&mut self) -> Result<(), PlayerError> {
            Ok(())
        }

        fn pause(&mut self) -> Result<(), PlayerError> {
            Ok(())
        }

        fn seek(&mut self, _offset_seconds: f64) -> Result<(), PlayerError> {
            Ok(())
        }

        fn set_volume(&mut self, _volume: f32) -> Result<(), PlayerError> {
            Ok(())
        }

        fn current_time(&self) -> Option<f64> {
            self.time
        }

        fn duration(&self) -> Option<f64> {
            self.duration
        }

        fn poll_notifications(&mut self) -> Vec<PlayerNotification> {
            Vec::new()
        }

        fn name(&self) -> &'static str {
            "clock"
        }
    }

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(f64::NAN), "0:00");
        assert_eq!(format_duration(65.9), "1:05");
        assert_eq!(format_duration(3600.0), "60:00");
    }

    #[test]
    fn ticker_samples_once_per_interval_while_running() {
        let widget = FixedClock {
            time: Some(30.0),
            duration: Some(120.0),
        };
        let start = Instant::now();
        let mut ticker = ProgressTicker::default();
        assert!(ticker.poll(&widget, start + Duration::from_secs(5)).is_none());

        ticker.start(start);
        assert!(ticker.poll(&widget, start).is_none());
        let progress = ticker
            .poll(&widget, start + PROGRESS_INTERVAL)
            .expect("due sample");
        assert_eq!(progress.percent, 25.0);
        assert_eq!(progress.current, "0:30");
        assert_eq!(progress.duration, "2:00");
        assert!(ticker.poll(&widget, start + PROGRESS_INTERVAL).is_none());

        ticker.cancel();
        assert!(!ticker.is_running());
        assert!(ticker.poll(&widget, start + PROGRESS_INTERVAL * 5).is_none());
    }

    #[test]
    fn unknown_or_zero_readings_produce_no_snapshot() {
        assert!(Progress::from_times(None, Some(10.0)).is_none());
        assert!(Progress::from_times(Some(0.0), Some(10.0)).is_none());
        assert!(Progress::from_times(Some(3.0), Some(0.0)).is_none());
    }
}
