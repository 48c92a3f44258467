use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlaybackMode {
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

/// A playable catalog item. Two tracks are the same track when their ids match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub channel: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, rename = "playlistId")]
    pub source_playlist_id: Option<String>,
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub title: String,
    #[serde(default, rename = "channelTitle")]
    pub channel_title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPlaylist {
    pub id: String,
    pub title: String,
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub repeat: RepeatMode,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl PlaybackSettings {
    pub fn mode(&self) -> PlaybackMode {
        PlaybackMode {
            shuffle: self.shuffle,
            repeat: self.repeat,
        }
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.shuffle = mode.shuffle;
        self.repeat = mode.repeat;
    }

    /// Returns the stored volume clamped to `0..=1`; NaN reads as full volume.
    pub fn clamped_volume(&self) -> f32 {
        if self.volume.is_nan() {
            return default_volume();
        }
        self.volume.clamp(0.0, 1.0)
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat: RepeatMode::Off,
            volume: default_volume(),
        }
    }
}

fn default_volume() -> f32 {
    1.0
}

pub const DEFAULT_LANGUAGE: &str = "tamil";

pub const LANGUAGES: &[&str] = &[
    "tamil",
    "english",
    "hindi",
    "telugu",
    "malayalam",
    "kannada",
    "bengali",
    "marathi",
    "gujarati",
    "punjabi",
    "urdu",
    "spanish",
    "french",
    "german",
    "japanese",
    "korean",
    "chinese",
    "arabic",
    "portuguese",
    "italian",
];

pub fn next_language(current: &str) -> &'static str {
    let idx = LANGUAGES
        .iter()
        .position(|lang| lang.eq_ignore_ascii_case(current))
        .map(|idx| (idx + 1) % LANGUAGES.len())
        .unwrap_or(0);
    LANGUAGES[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, title: &str) -> Track {
        Track {
            id: id.to_string(),
            title: title.to_string(),
            channel: String::new(),
            thumbnail: None,
            source_playlist_id: None,
        }
    }

    #[test]
    fn repeat_cycles_off_all_one() {
        assert_eq!(RepeatMode::Off.next(), RepeatMode::All);
        assert_eq!(RepeatMode::All.next(), RepeatMode::One);
        assert_eq!(RepeatMode::One.next(), RepeatMode::Off);
    }

    #[test]
    fn tracks_compare_by_id_only() {
        assert_eq!(track("a", "first"), track("a", "renamed"));
        assert_ne!(track("a", "same"), track("b", "same"));
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: PlaybackSettings = serde_json::from_str(r#"{"repeat":"all"}"#).expect("parse");
        assert!(!settings.shuffle);
        assert_eq!(settings.repeat, RepeatMode::All);
        assert_eq!(settings.volume, 1.0);
    }

    #[test]
    fn volume_is_clamped_on_read() {
        let loud = PlaybackSettings {
            volume: 4.0,
            ..PlaybackSettings::default()
        };
        assert_eq!(loud.clamped_volume(), 1.0);
        let muted = PlaybackSettings {
            volume: -1.0,
            ..PlaybackSettings::default()
        };
        assert_eq!(muted.clamped_volume(), 0.0);
    }

    #[test]
    fn language_cycle_wraps_and_recovers_from_unknown() {
        assert_eq!(next_language("tamil"), "english");
        assert_eq!(next_language("italian"), "tamil");
        assert_eq!(next_language("klingon"), "tamil");
    }
}
