//! Catalog access: YouTube Data API v3 search and playlist items.
//!
//! Responses are parsed item by item into [`Track`] and [`PlaylistSummary`]
//! records. Field fallbacks:
//! - thumbnail: `medium`, then `default`
//! - track channel: `videoOwnerChannelTitle`, then `channelTitle`
//! - result id: `playlistId`, then `videoId`
//!
//! Failed requests never reach the UI as errors; the `*_or_empty` helpers log
//! and return an empty list.

use crate::model::{PlaylistSummary, Track};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const SEARCH_LIMIT: u32 = 20;
pub const PLAYLIST_ITEMS_LIMIT: u32 = 50;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no catalog API key configured")]
    MissingApiKey,
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("catalog response could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

pub trait CatalogClient: Send + Sync {
    /// Searches playlists only.
    fn search(&self, query: &str, limit: u32) -> Result<Vec<PlaylistSummary>, CatalogError>;

    fn list_items(&self, playlist_id: &str, limit: u32) -> Result<Vec<Track>, CatalogError>;
}

pub fn search_or_empty(client: &dyn CatalogClient, query: &str, limit: u32) -> Vec<PlaylistSummary> {
    client.search(query, limit).unwrap_or_else(|err| {
        warn!(query, "catalog search failed: {err}");
        Vec::new()
    })
}

pub fn list_items_or_empty(client: &dyn CatalogClient, playlist_id: &str, limit: u32) -> Vec<Track> {
    client.list_items(playlist_id, limit).unwrap_or_else(|err| {
        warn!(playlist_id, "fetching playlist tracks failed: {err}");
        Vec::new()
    })
}

pub fn popular_query(language: &str) -> String {
    format!("{language} music playlists")
}

pub fn search_query(term: &str, language: &str) -> String {
    format!("{} {language} music playlist", term.trim())
}

pub struct YouTubeCatalog {
    http: reqwest::blocking::Client,
    api_key: Option<String>,
    base_url: String,
}

impl YouTubeCatalog {
    pub fn new(api_key: Option<String>) -> Result<Self, CatalogError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: Option<String>, base_url: &str) -> Result<Self, CatalogError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String, CatalogError> {
        let key = self.api_key.as_deref().ok_or(CatalogError::MissingApiKey)?;
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(%url, "catalog request");

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("part", "snippet"), ("key", key)])
            .send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl CatalogClient for YouTubeCatalog {
    fn search(&self, query: &str, limit: u32) -> Result<Vec<PlaylistSummary>, CatalogError> {
        let body = self.get(
            "search",
            &[
                ("q", query.to_string()),
                ("type", String::from("playlist")),
                ("maxResults", limit.to_string()),
            ],
        )?;
        parse_search_results(&body)
    }

    fn list_items(&self, playlist_id: &str, limit: u32) -> Result<Vec<Track>, CatalogError> {
        let body = self.get(
            "playlistItems",
            &[
                ("playlistId", playlist_id.to_string()),
                ("maxResults", limit.to_string()),
            ],
        )?;
        parse_playlist_items(&body, playlist_id)
    }
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    channel_title: Option<String>,
    video_owner_channel_title: Option<String>,
    thumbnails: Option<Thumbnails>,
    resource_id: Option<ResourceId>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
    playlist_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<ResourceId>,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    snippet: Snippet,
}

pub fn parse_search_results(body: &str) -> Result<Vec<PlaylistSummary>, CatalogError> {
    let page: Page = serde_json::from_str(body)?;
    Ok(page
        .items
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<SearchItem>(raw) {
            Ok(item) => summary_from_item(item),
            Err(err) => {
                debug!("skipping malformed search item: {err}");
                None
            }
        })
        .collect())
}

pub fn parse_playlist_items(body: &str, playlist_id: &str) -> Result<Vec<Track>, CatalogError> {
    let page: Page = serde_json::from_str(body)?;
    Ok(page
        .items
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<PlaylistItem>(raw) {
            Ok(item) => track_from_item(item, playlist_id),
            Err(err) => {
                debug!("skipping malformed playlist item: {err}");
                None
            }
        })
        .collect())
}

fn summary_from_item(item: SearchItem) -> Option<PlaylistSummary> {
    let id = item.id?;
    let id = id.playlist_id.or(id.video_id)?;
    let snippet = item.snippet;
    Some(PlaylistSummary {
        id,
        title: snippet.title.clone().unwrap_or_default(),
        channel_title: snippet.channel_title.clone().unwrap_or_default(),
        thumbnail: pick_thumbnail(snippet.thumbnails.as_ref()),
    })
}

fn track_from_item(item: PlaylistItem, playlist_id: &str) -> Option<Track> {
    let snippet = item.snippet;
    let id = snippet.resource_id.as_ref()?.video_id.clone()?;
    Some(Track {
        id,
        title: snippet.title.clone().unwrap_or_default(),
        channel: snippet
            .video_owner_channel_title
            .clone()
            .or_else(|| snippet.channel_title.clone())
            .unwrap_or_default(),
        thumbnail: pick_thumbnail(snippet.thumbnails.as_ref()),
        source_playlist_id: Some(playlist_id.to_string()),
    })
}

fn pick_thumbnail(thumbnails: Option<&Thumbnails>) -> Option<String> {
    let thumbnails = thumbnails?;
    [&thumbnails.medium, &thumbnails.default]
        .into_iter()
        .flatten()
        .find_map(|thumb| thumb.url.clone())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRequest {
    Popular { language: String },
    Search { term: String, language: String },
    Playlist { summary: PlaylistSummary },
}

#[derive(Debug, Clone)]
pub enum CatalogResponse {
    Playlists {
        from_search: bool,
        items: Vec<PlaylistSummary>,
    },
    Tracks {
        summary: PlaylistSummary,
        tracks: Vec<Track>,
    },
}

/// Runs catalog requests off the UI thread; results come back through
/// [`CatalogWorker::try_recv`].
pub struct CatalogWorker {
    client: Arc<dyn CatalogClient>,
    tx: Sender<CatalogResponse>,
    rx: Receiver<CatalogResponse>,
    in_flight: usize,
}

impl CatalogWorker {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            client,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn request(&mut self, request: CatalogRequest) {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let response = run_request(client.as_ref(), request);
            let _ = tx.send(response);
        });
    }

    pub fn try_recv(&mut self) -> Option<CatalogResponse> {
        match self.rx.try_recv() {
            Ok(response) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(response)
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<CatalogResponse> {
        let response = self.rx.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(response)
    }
}

fn run_request(client: &dyn CatalogClient, request: CatalogRequest) -> CatalogResponse {
    match request {
        CatalogRequest::Popular { language } => CatalogResponse::Playlists {
            from_search: false,
            items: search_or_empty(client, &popular_query(&language), SEARCH_LIMIT),
        },
        CatalogRequest::Search { term, language } => CatalogResponse::Playlists {
            from_search: true,
            items: search_or_empty(client, &search_query(&term, &language), SEARCH_LIMIT),
        },
        CatalogRequest::Playlist { summary } => {
            let tracks = list_items_or_empty(client, &summary.id, PLAYLIST_ITEMS_LIMIT);
            CatalogResponse::Tracks { summary, tracks }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const PLAYLIST_ITEMS: &str = r#"{
        "items": [
            {"snippet": {
                "title": "First",
                "channelTitle": "Uploader",
                "videoOwnerChannelTitle": "Artist",
                "thumbnails": {"default": {"url": "d1"}, "medium": {"url": "m1"}},
                "resourceId": {"kind": "youtube#video", "videoId": "v1"}
            }},
            {"snippet": {
                "title": "Second",
                "channelTitle": "Uploader",
                "thumbnails": {"default": {"url": "d2"}},
                "resourceId": {"videoId": "v2"}
            }},
            {"snippet": {"title": "No id"}},
            {"snippet": "broken"},
            {"snippet": {"title": "Bare", "resourceId": {"videoId": "v3"}}}
        ]
    }"#;

    #[test]
    fn playlist_items_use_documented_fallbacks() {
        let tracks = parse_playlist_items(PLAYLIST_ITEMS, "PL9").expect("parse");
        let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2", "v3"]);

        assert_eq!(tracks[0].channel, "Artist");
        assert_eq!(tracks[0].thumbnail.as_deref(), Some("m1"));
        assert_eq!(tracks[1].channel, "Uploader");
        assert_eq!(tracks[1].thumbnail.as_deref(), Some("d2"));
        assert_eq!(tracks[2].channel, "");
        assert_eq!(tracks[2].thumbnail, None);
        assert!(
            tracks
                .iter()
                .all(|t| t.source_playlist_id.as_deref() == Some("PL9"))
        );
    }

    #[test]
    fn search_results_prefer_playlist_ids() {
        let body = r#"{"items": [
            {"id": {"kind": "youtube#playlist", "playlistId": "PL1"},
             "snippet": {"title": "Hits", "channelTitle": "Label",
                         "thumbnails": {"medium": {"url": "m"}}}},
            {"id": {"videoId": "vid"}, "snippet": {"title": "Single"}},
            {"id": {"kind": "youtube#channel"}, "snippet": {"title": "Channel"}}
        ]}"#;
        let results = parse_search_results(body).expect("parse");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "PL1");
        assert_eq!(results[0].channel_title, "Label");
        assert_eq!(results[0].thumbnail.as_deref(), Some("m"));
        assert_eq!(results[1].id, "vid");
    }

    #[test]
    fn missing_items_is_an_empty_page() {
        assert!(parse_search_results("{}").expect("parse").is_empty());
        assert!(parse_search_results("[1, 2").is_err());
    }

    #[test]
    fn queries_match_home_and_search_views() {
        assert_eq!(popular_query("tamil"), "tamil music playlists");
        assert_eq!(search_query("  rahman ", "hindi"), "rahman hindi music playlist");
    }

    #[test]
    fn missing_api_key_yields_empty_results() {
        let catalog = YouTubeCatalog::new(Some(String::from("  "))).expect("client");
        assert!(matches!(
            catalog.search("x", 1),
            Err(CatalogError::MissingApiKey)
        ));
        assert!(list_items_or_empty(&catalog, "PL", 5).is_empty());
    }

    struct FakeCatalog {
        queries: Mutex<Vec<String>>,
    }

    impl CatalogClient for FakeCatalog {
        fn search(&self, query: &str, limit: u32) -> Result<Vec<PlaylistSummary>, CatalogError> {
            if let Ok(mut queries) = self.queries.lock() {
                queries.push(query.to_string());
            }
            Ok((0..limit.min(2))
                .map(|n| PlaylistSummary {
                    id: format!("PL{n}"),
                    title: format!("Playlist {n}"),
                    channel_title: String::new(),
                    thumbnail: None,
                })
                .collect())
        }

        fn list_items(&self, _playlist_id: &str, _limit: u32) -> Result<Vec<Track>, CatalogError> {
            Err(CatalogError::Status {
                status: 403,
                body: String::from("quota"),
            })
        }
    }

    #[test]
    fn worker_reports_results_and_swallows_failures() {
        let fake = Arc::new(FakeCatalog {
            queries: Mutex::new(Vec::new()),
        });
        let mut worker = CatalogWorker::new(fake.clone());

        worker.request(CatalogRequest::Search {
            term: String::from("melody"),
            language: String::from("tamil"),
        });
        assert!(worker.is_busy());
        match worker.recv_timeout(Duration::from_secs(5)) {
            Some(CatalogResponse::Playlists { from_search, items }) => {
                assert!(from_search);
                assert_eq!(items.len(), 2);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        worker.request(CatalogRequest::Playlist {
            summary: PlaylistSummary {
                id: String::from("PL0"),
                title: String::from("Playlist 0"),
                channel_title: String::new(),
                thumbnail: None,
            },
        });
        match worker.recv_timeout(Duration::from_secs(5)) {
            Some(CatalogResponse::Tracks { summary, tracks }) => {
                assert_eq!(summary.id, "PL0");
                assert!(tracks.is_empty());
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert!(!worker.is_busy());

        let queries = fake.queries.lock().expect("lock");
        assert_eq!(queries.as_slice(), ["melody tamil music playlist"]);
    }
}
