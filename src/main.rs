mod app;
mod audio;
mod channel;
mod config;
mod error;
mod light;
mod messages;
mod router;
mod services;
#[cfg(test)]
mod testing;

use app::App;
use config::Config;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Bedside light and sleep-audio controller
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file (default: ~/.config/bedside/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read commands from stdin instead of the command socket
    #[arg(long)]
    stdin: bool,

    /// Exit after this many seconds; 0 runs until Ctrl+C
    #[arg(long, default_value_t = 0)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    tracing::info!("Starting bedside controller");

    let config = Config::load(args.config.as_deref())?;
    config.validate()?;

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));

    let app = App::new(&config, args.stdin).await?;
    app.run(timeout).await
}
