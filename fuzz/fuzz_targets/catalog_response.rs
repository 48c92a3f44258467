#![no_main]

use libfuzzer_sys::fuzz_target;
use rajify::catalog::{parse_playlist_items, parse_search_results};

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(tracks) = parse_playlist_items(body, "PL") {
        assert!(tracks.iter().all(|t| t.source_playlist_id.as_deref() == Some("PL")));
    }
    let _ = parse_search_results(body);
});
