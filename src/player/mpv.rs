//! Drives an `mpv` process over its JSON IPC socket.
//!
//! mpv streams the catalog's watch URLs itself, so this adapter only sends
//! commands and turns mpv events into [`PlayerNotification`]s. The widget
//! becomes ready once the IPC socket accepts a connection.

use super::{PlayerError, PlayerNotification, PlayerState, PlayerWidget};
use anyhow::Context;
use serde_json::{Value, json};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use tracing::{debug, info, warn};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const LOAD_FAILED: i32 = -1;

#[derive(Debug, Clone, PartialEq)]
enum MpvEvent {
    TimePos(Option<f64>),
    Duration(Option<f64>),
    Pause(bool),
    StartFile,
    PlaybackRestart,
    EndFile { reason: String },
    Disconnected,
}

#[derive(Debug, Default)]
struct PlaybackStatus {
    time_pos: Option<f64>,
    duration: Option<f64>,
    paused: bool,
    file_loaded: bool,
}

impl PlaybackStatus {
    fn apply(&mut self, event: MpvEvent) -> Option<PlayerNotification> {
        match event {
            MpvEvent::TimePos(value) => {
                self.time_pos = value;
                None
            }
            MpvEvent::Duration(value) => {
                self.duration = value;
                None
            }
            MpvEvent::Pause(paused) => {
                self.paused = paused;
                self.file_loaded.then_some(PlayerNotification::StateChanged(if paused {
                    PlayerState::Paused
                } else {
                    PlayerState::Playing
                }))
            }
            MpvEvent::StartFile => {
                self.file_loaded = true;
                self.time_pos = None;
                self.duration = None;
                Some(PlayerNotification::StateChanged(PlayerState::Buffering))
            }
            MpvEvent::PlaybackRestart => (!self.paused)
                .then_some(PlayerNotification::StateChanged(PlayerState::Playing)),
            // "stop" and "redirect" come from loadfile replacing the old file.
            MpvEvent::EndFile { reason } => match reason.as_str() {
                "eof" => {
                    self.file_loaded = false;
                    Some(PlayerNotification::StateChanged(PlayerState::Ended))
                }
                "error" => {
                    self.file_loaded = false;
                    Some(PlayerNotification::Error(LOAD_FAILED))
                }
                _ => None,
            },
            MpvEvent::Disconnected => None,
        }
    }
}

pub struct MpvPlayer {
    child: Child,
    socket_path: PathBuf,
    writer: Option<UnixStream>,
    events: Option<Receiver<MpvEvent>>,
    status: PlaybackStatus,
}

impl MpvPlayer {
    pub fn spawn(binary: &str, socket_path: PathBuf) -> anyhow::Result<Self> {
        let _ = fs::remove_file(&socket_path);
        let child = Command::new(binary)
            .arg("--idle=yes")
            .arg("--no-video")
            .arg("--no-terminal")
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start {binary}"))?;
        info!(binary, socket = %socket_path.display(), "started mpv");

        Ok(Self {
            child,
            socket_path,
            writer: None,
            events: None,
            status: PlaybackStatus::default(),
        })
    }

    fn try_connect(&mut self) -> Option<PlayerNotification> {
        if self.writer.is_some() {
            return None;
        }

        let stream = UnixStream::connect(&self.socket_path).ok()?;
        let reader = match stream.try_clone() {
            Ok(reader) => reader,
            Err(err) => {
                warn!("mpv socket clone failed: {err}");
                return None;
            }
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || read_events(reader, tx));
        self.writer = Some(stream);
        self.events = Some(rx);
        self.status = PlaybackStatus::default();

        for (id, name) in [(1, "time-pos"), (2, "duration"), (3, "pause")] {
            if let Err(err) = self.command(json!(["observe_property", id, name])) {
                warn!(name, "mpv observe failed: {err}");
            }
        }
        Some(PlayerNotification::Ready)
    }

    fn command(&mut self, args: Value) -> Result<(), PlayerError> {
        let Some(stream) = self.writer.as_mut() else {
            return Err(PlayerError::NotReady);
        };

        let mut bytes = serde_json::to_vec(&json!({ "command": args }))
            .map_err(|err| PlayerError::Backend(err.to_string()))?;
        bytes.push(b'\n');
        if let Err(err) = stream.write_all(&bytes).and_then(|()| stream.flush()) {
            self.disconnect();
            return Err(PlayerError::Io(err));
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.writer.take().is_some() {
            warn!("lost connection to mpv");
        }
        self.events = None;
    }
}

impl PlayerWidget for MpvPlayer {
    fn is_ready(&self) -> bool {
        self.writer.is_some()
    }

    fn load(&mut self, track_id: &str) -> Result<(), PlayerError> {
        self.command(json!(["loadfile", format!("{WATCH_URL}{track_id}"), "replace"]))
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        self.command(json!(["set_property", "pause", false]))
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.command(json!(["set_property", "pause", true]))
    }

    fn seek(&mut self, offset_seconds: f64) -> Result<(), PlayerError> {
        self.command(json!(["seek", offset_seconds, "absolute"]))
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), PlayerError> {
        let percent = f64::from(volume.clamp(0.0, 1.0)) * 100.0;
        self.command(json!(["set_property", "volume", percent]))
    }

    fn current_time(&self) -> Option<f64> {
        self.status.time_pos
    }

    fn duration(&self) -> Option<f64> {
        self.status.duration
    }

    fn poll_notifications(&mut self) -> Vec<PlayerNotification> {
        let mut out = Vec::new();
        if let Some(ready) = self.try_connect() {
            out.push(ready);
        }

        let mut received = Vec::new();
        if let Some(events) = &self.events {
            loop {
                match events.try_recv() {
                    Ok(event) => received.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        received.push(MpvEvent::Disconnected);
                        break;
                    }
                }
            }
        }

        for event in received {
            if event == MpvEvent::Disconnected {
                self.disconnect();
                continue;
            }
            out.extend(self.status.apply(event));
        }
        out
    }

    fn name(&self) -> &'static str {
        "mpv"
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        let _ = self.command(json!(["quit"]));
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = fs::remove_file(&self.socket_path);
    }
}

fn read_events(stream: UnixStream, tx: Sender<MpvEvent>) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                let _ = tx.send(MpvEvent::Disconnected);
                break;
            }
            Ok(_) => {
                let Some(event) = parse_event(line.trim_end()) else {
                    continue;
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
            Err(err) => {
                debug!("mpv read failed: {err}");
                let _ = tx.send(MpvEvent::Disconnected);
                break;
            }
        }
    }
}

fn parse_event(line: &str) -> Option<MpvEvent> {
    let value: Value = serde_json::from_str(line).ok()?;
    match value.get("event")?.as_str()? {
        "property-change" => {
            let data = value.get("data");
            match value.get("name")?.as_str()? {
                "time-pos" => Some(MpvEvent::TimePos(data.and_then(Value::as_f64))),
                "duration" => Some(MpvEvent::Duration(data.and_then(Value::as_f64))),
                "pause" => Some(MpvEvent::Pause(data?.as_bool()?)),
                _ => None,
            }
        }
        "start-file" => Some(MpvEvent::StartFile),
        "playback-restart" => Some(MpvEvent::PlaybackRestart),
        "end-file" => Some(MpvEvent::EndFile {
            reason: value
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_property_changes() {
        assert_eq!(
            parse_event(r#"{"event":"property-change","id":1,"name":"time-pos","data":12.5}"#),
            Some(MpvEvent::TimePos(Some(12.5)))
        );
        assert_eq!(
            parse_event(r#"{"event":"property-change","id":2,"name":"duration"}"#),
            Some(MpvEvent::Duration(None))
        );
        assert_eq!(
            parse_event(r#"{"event":"property-change","id":3,"name":"pause","data":true}"#),
            Some(MpvEvent::Pause(true))
        );
    }

    #[test]
    fn ignores_command_replies_and_garbage() {
        assert_eq!(parse_event(r#"{"error":"success","request_id":0}"#), None);
        assert_eq!(parse_event("not json"), None);
        assert_eq!(parse_event(r#"{"event":"idle"}"#), None);
    }

    #[test]
    fn only_natural_end_counts_as_ended() {
        let mut status = PlaybackStatus::default();
        assert_eq!(
            status.apply(MpvEvent::StartFile),
            Some(PlayerNotification::StateChanged(PlayerState::Buffering))
        );
        assert_eq!(
            status.apply(MpvEvent::EndFile {
                reason: String::from("stop")
            }),
            None
        );
        assert_eq!(
            status.apply(MpvEvent::EndFile {
                reason: String::from("eof")
            }),
            Some(PlayerNotification::StateChanged(PlayerState::Ended))
        );
        assert_eq!(
            status.apply(MpvEvent::EndFile {
                reason: String::from("error")
            }),
            Some(PlayerNotification::Error(LOAD_FAILED))
        );
    }

    #[test]
    fn pause_reports_state_only_while_a_file_is_loaded() {
        let mut status = PlaybackStatus::default();
        assert_eq!(status.apply(MpvEvent::Pause(false)), None);

        status.apply(MpvEvent::StartFile);
        assert_eq!(
            status.apply(MpvEvent::PlaybackRestart),
            Some(PlayerNotification::StateChanged(PlayerState::Playing))
        );
        assert_eq!(
            status.apply(MpvEvent::Pause(true)),
            Some(PlayerNotification::StateChanged(PlayerState::Paused))
        );
        assert_eq!(status.apply(MpvEvent::PlaybackRestart), None);
    }

    #[test]
    fn start_file_resets_cached_times() {
        let mut status = PlaybackStatus::default();
        status.apply(MpvEvent::TimePos(Some(40.0)));
        status.apply(MpvEvent::Duration(Some(200.0)));
        status.apply(MpvEvent::StartFile);
        assert_eq!(status.time_pos, None);
        assert_eq!(status.duration, None);
    }
}
