use crate::model::{DEFAULT_LANGUAGE, LANGUAGES};
use anyhow::{Context, Result, bail};
use std::env;
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "rajify";
const STATE_FILE: &str = "state.json";
const LOG_FILE: &str = "rajify.log";
const MPV_SOCKET: &str = "mpv.sock";

pub const CONFIG_DIR_ENV: &str = "RAJIFY_CONFIG_DIR";
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn state_path() -> Result<PathBuf> {
    Ok(config_root()?.join(STATE_FILE))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(config_root()?.join(LOG_FILE))
}

pub fn mpv_socket_path() -> Result<PathBuf> {
    Ok(config_root()?.join(MPV_SOCKET))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerKind {
    Null,
    #[default]
    Mpv,
}

impl PlayerKind {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "null" | "none" => Ok(Self::Null),
            "mpv" => Ok(Self::Mpv),
            other => bail!("unknown player {other}, expected null or mpv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub language: String,
    pub player: PlayerKind,
    pub mpv_binary: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            language: String::from(DEFAULT_LANGUAGE),
            player: PlayerKind::default(),
            mpv_binary: String::from("mpv"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CliAction {
    Run(AppConfig),
    Help,
}

/// Builds the runtime configuration. Flags win over `YOUTUBE_API_KEY`.
pub fn parse_args(args: &[String], env_api_key: Option<String>) -> Result<CliAction> {
    let mut config = AppConfig {
        api_key: env_api_key.filter(|key| !key.trim().is_empty()),
        ..AppConfig::default()
    };

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--api-key" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    bail!("--api-key requires a value");
                };
                if value.trim().is_empty() {
                    bail!("--api-key cannot be empty");
                }
                config.api_key = Some(value.trim().to_string());
            }
            "--language" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    bail!("--language requires a value");
                };
                let value = value.trim().to_ascii_lowercase();
                if !LANGUAGES.contains(&value.as_str()) {
                    bail!("unsupported language {value}");
                }
                config.language = value;
            }
            "--player" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    bail!("--player requires null or mpv");
                };
                config.player = PlayerKind::parse(value)?;
            }
            "--mpv" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    bail!("--mpv requires a binary path");
                };
                config.mpv_binary = value.clone();
            }
            "-h" | "--help" => return Ok(CliAction::Help),
            other => bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(CliAction::Run(config))
}

pub fn help_text() -> String {
    [
        "Rajify",
        "  --api-key KEY       YouTube Data API key (or YOUTUBE_API_KEY)",
        "  --language LANG     Language used for browsing (default tamil)",
        "  --player null|mpv   Playback backend (default mpv)",
        "  --mpv PATH          mpv binary to launch",
        "  -h, --help          Show this help",
    ]
    .join("\n")
}
