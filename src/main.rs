use anyhow::Context;
use rajify::config::{self, CliAction};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let app_config = match config::parse_args(&args, std::env::var(config::API_KEY_ENV).ok())? {
        CliAction::Run(app_config) => app_config,
        CliAction::Help => {
            println!("{}", config::help_text());
            return Ok(());
        }
    };

    init_logging()?;
    rajify::app::run(app_config)
}

// The terminal UI owns stdout, so logs go to a file in the config dir.
fn init_logging() -> anyhow::Result<()> {
    config::ensure_config_dir()?;
    let path = config::log_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rajify=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}
