#![no_main]

use libfuzzer_sys::fuzz_target;
use rajify::model::{PlaybackMode, Track};
use rajify::sequencer::Sequencer;

fn track(idx: usize) -> Track {
    Track {
        id: format!("track_{idx}"),
        title: format!("Track {idx}"),
        channel: String::new(),
        thumbnail: None,
        source_playlist_id: None,
    }
}

fuzz_target!(|data: &[u8]| {
    let seed = data.first().copied().unwrap_or_default();
    let mut seq = Sequencer::with_seed(PlaybackMode::default(), u64::from(seed));
    let len = (data.len() % 32).max(1);
    seq.load_list((0..len).map(track).collect());

    for byte in data {
        let arg = usize::from(byte >> 3);
        match byte % 10 {
            0 => seq.play_at(arg),
            1 => seq.skip_forward(),
            2 => seq.track_ended(),
            3 => seq.retreat(),
            4 => seq.toggle_shuffle(),
            5 => seq.toggle_repeat(),
            6 => seq.enqueue(track(arg)),
            7 => {
                let _ = seq.dequeue_at(arg);
            }
            8 => seq.load_list((0..arg % 8).map(track).collect()),
            _ => seq.play_all(),
        }
        let _ = seq.take_requests();

        let mut original: Vec<&str> = seq.original().iter().map(|t| t.id.as_str()).collect();
        let mut active: Vec<&str> = seq.active().iter().map(|t| t.id.as_str()).collect();
        original.sort_unstable();
        active.sort_unstable();
        assert_eq!(original, active);
    }
});
