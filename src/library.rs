use crate::model::{PlaybackSettings, PlaylistSummary, SavedPlaylist, Track};
use crate::store::{PreferenceStore, keys};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};

pub const RECENT_LIMIT: usize = 10;

/// User collections kept next to the sequencer: favorites, saved and recent
/// playlists, plus a session-only cache of fetched playlist tracks. Every
/// mutation is written through to the [`PreferenceStore`].
pub struct Library {
    store: PreferenceStore,
    favorites: BTreeSet<String>,
    saved: Vec<SavedPlaylist>,
    recent: Vec<PlaylistSummary>,
    current_playlist: Option<String>,
    cache: HashMap<String, Vec<Track>>,
}

impl Library {
    pub fn load(store: PreferenceStore) -> Self {
        let favorites = store.get(keys::FAVORITES);
        let saved = store.get(keys::PLAYLISTS);
        let recent: Vec<PlaylistSummary> = store.get(keys::RECENT);
        let current_playlist = store.get(keys::CURRENT_PLAYLIST);

        // Older files may hold more than the limit or repeated ids.
        let recent = recent
            .into_iter()
            .rev()
            .fold(Vec::new(), |list, entry| update_recent_playlists(&list, entry));

        Self {
            store,
            favorites,
            saved,
            recent,
            current_playlist,
            cache: HashMap::new(),
        }
    }

    pub fn is_favorite(&self, track_id: &str) -> bool {
        self.favorites.contains(track_id)
    }

    pub fn favorite_count(&self) -> usize {
        self.favorites.len()
    }

    /// Flips membership and returns whether the track is now a favorite.
    pub fn toggle_favorite(&mut self, track_id: &str) -> bool {
        let now_favorite = if self.favorites.remove(track_id) {
            false
        } else {
            self.favorites.insert(track_id.to_string());
            true
        };
        persist(&mut self.store, keys::FAVORITES, &self.favorites);
        now_favorite
    }

    pub fn saved(&self) -> &[SavedPlaylist] {
        &self.saved
    }

    pub fn save_current(&mut self, tracks: &[Track]) -> Option<&SavedPlaylist> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let playlist = saved_playlist_from(tracks, now)?;
        debug!(id = %playlist.id, tracks = playlist.tracks.len(), "saving playlist");
        self.saved.push(playlist);
        persist(&mut self.store, keys::PLAYLISTS, &self.saved);
        self.saved.last()
    }

    pub fn recent(&self) -> &[PlaylistSummary] {
        &self.recent
    }

    pub fn record_recent(&mut self, summary: PlaylistSummary) {
        self.recent = update_recent_playlists(&self.recent, summary);
        persist(&mut self.store, keys::RECENT, &self.recent);
    }

    pub fn current_playlist(&self) -> Option<&str> {
        self.current_playlist.as_deref()
    }

    pub fn set_current_playlist(&mut self, playlist_id: &str) {
        if self.current_playlist.as_deref() == Some(playlist_id) {
            return;
        }
        self.current_playlist = Some(playlist_id.to_string());
        persist(&mut self.store, keys::CURRENT_PLAYLIST, &self.current_playlist);
    }

    pub fn cached_tracks(&self, playlist_id: &str) -> Option<&[Track]> {
        self.cache.get(playlist_id).map(Vec::as_slice)
    }

    pub fn cache_tracks(&mut self, playlist_id: &str, tracks: Vec<Track>) {
        self.cache.insert(playlist_id.to_string(), tracks);
    }

    pub fn settings(&self) -> PlaybackSettings {
        self.store.get(keys::SETTINGS)
    }

    pub fn save_settings(&mut self, settings: &PlaybackSettings) {
        persist(&mut self.store, keys::SETTINGS, settings);
    }

    pub fn saved_queue(&self) -> Vec<Track> {
        self.store.get(keys::QUEUE)
    }

    pub fn save_queue(&mut self, queue: &[Track]) {
        persist(&mut self.store, keys::QUEUE, queue);
    }
}

/// Moves `summary` to the front, dropping any older entry with the same id,
/// and keeps at most [`RECENT_LIMIT`] entries.
pub fn update_recent_playlists(
    recent: &[PlaylistSummary],
    summary: PlaylistSummary,
) -> Vec<PlaylistSummary> {
    let mut next = Vec::with_capacity(RECENT_LIMIT);
    let id = summary.id.clone();
    next.push(summary);
    next.extend(recent.iter().filter(|entry| entry.id != id).cloned());
    next.truncate(RECENT_LIMIT);
    next
}

pub fn saved_playlist_from(tracks: &[Track], now: OffsetDateTime) -> Option<SavedPlaylist> {
    let first = tracks.first()?;
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let date = now.date();
    let created_at = now
        .to_offset(time::UtcOffset::UTC)
        .format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());

    Some(SavedPlaylist {
        id: format!("saved_{millis}"),
        title: format!(
            "Saved Playlist {}/{}/{}",
            u8::from(date.month()),
            date.day(),
            date.year()
        ),
        tracks: tracks.to_vec(),
        thumbnail: first.thumbnail.clone(),
        created_at,
    })
}

fn persist<T: Serialize + ?Sized>(store: &mut PreferenceStore, key: &str, value: &T) {
    if let Err(err) = store.set(key, value) {
        warn!(key, "failed to persist preference: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RepeatMode;
    use tempfile::tempdir;
    use time::macros::datetime;

    fn summary(id: &str) -> PlaylistSummary {
        PlaylistSummary {
            id: id.to_string(),
            title: format!("Playlist {id}"),
            channel_title: String::from("channel"),
            thumbnail: None,
        }
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: id.to_uppercase(),
            channel: String::new(),
            thumbnail: Some(format!("thumb-{id}")),
            source_playlist_id: None,
        }
    }

    #[test]
    fn recent_playlists_move_to_front_without_duplicates() {
        let recent = vec![summary("a"), summary("b"), summary("c")];
        let updated = update_recent_playlists(&recent, summary("b"));
        let ids: Vec<&str> = updated.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn recent_playlists_are_capped() {
        let mut recent = Vec::new();
        for n in 0..25 {
            recent = update_recent_playlists(&recent, summary(&format!("p{}", n % 13)));
            assert!(recent.len() <= RECENT_LIMIT);
            let unique: BTreeSet<&str> = recent.iter().map(|p| p.id.as_str()).collect();
            assert_eq!(unique.len(), recent.len());
        }
        assert_eq!(recent[0].id, "p11");
    }

    #[test]
    fn saved_playlist_takes_first_thumbnail_and_timestamps() {
        let now = datetime!(2024-03-05 14:30:00 UTC);
        let saved = saved_playlist_from(&[track("x"), track("y")], now).expect("saved");
        assert_eq!(saved.id, format!("saved_{}", now.unix_timestamp() * 1000));
        assert_eq!(saved.title, "Saved Playlist 3/5/2024");
        assert_eq!(saved.thumbnail.as_deref(), Some("thumb-x"));
        assert_eq!(saved.created_at, "2024-03-05T14:30:00Z");
        assert_eq!(saved.tracks.len(), 2);

        assert!(saved_playlist_from(&[], now).is_none());
    }

    #[test]
    fn collections_persist_through_the_store() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");

        let mut library = Library::load(PreferenceStore::open(&path));
        assert!(library.toggle_favorite("a"));
        assert!(library.toggle_favorite("b"));
        assert!(!library.toggle_favorite("a"));
        library.record_recent(summary("PL1"));
        library.set_current_playlist("PL1");
        assert!(library.save_current(&[track("b")]).is_some());
        assert!(library.save_current(&[]).is_none());
        library.save_settings(&PlaybackSettings {
            shuffle: true,
            repeat: RepeatMode::All,
            volume: 0.3,
        });
        library.save_queue(&[track("q")]);

        let reloaded = Library::load(PreferenceStore::open(&path));
        assert!(reloaded.is_favorite("b"));
        assert!(!reloaded.is_favorite("a"));
        assert_eq!(reloaded.recent().len(), 1);
        assert_eq!(reloaded.current_playlist(), Some("PL1"));
        assert_eq!(reloaded.saved().len(), 1);
        assert_eq!(reloaded.settings().repeat, RepeatMode::All);
        assert_eq!(reloaded.saved_queue(), vec![track("q")]);
    }

    #[test]
    fn loading_repairs_oversized_recent_lists() {
        let mut store = PreferenceStore::in_memory();
        let mut stored: Vec<PlaylistSummary> = (0..15).map(|n| summary(&n.to_string())).collect();
        stored.push(summary("0"));
        store.set(keys::RECENT, &stored).expect("seed");

        let library = Library::load(store);
        assert_eq!(library.recent().len(), RECENT_LIMIT);
        assert_eq!(library.recent()[0].id, "0");
        assert_eq!(library.recent()[1].id, "1");
    }

    #[test]
    fn cache_is_keyed_by_playlist() {
        let mut library = Library::load(PreferenceStore::in_memory());
        assert!(library.cached_tracks("PL").is_none());
        library.cache_tracks("PL", vec![track("a")]);
        assert_eq!(library.cached_tracks("PL").map(<[Track]>::len), Some(1));
    }
}
