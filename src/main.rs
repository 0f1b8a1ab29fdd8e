use qbit_bot::config::{self, DEFAULT_CONFIG_PATH};
use qbit_bot::discord;
use qbit_bot::dispatch::Dispatcher;
use qbit_bot::qbittorrent;
use qbit_bot::torrents::Torrents;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

/// Parse args
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[clap(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> Result<()> {
    pretty_env_logger::formatted_builder()
        .filter(None, log::LevelFilter::Warn)
        .filter(Some("qbit_bot"), log::LevelFilter::Info)
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_default())
        .init();

    let args = Args::parse();

    let cfg = config::load(&args.config)?;

    let client = qbittorrent::Client::new(&cfg.qbittorrent)
        .context("Unable to create the qBittorrent client")?;
    log::info!("Using qBittorrent at {}", cfg.qbittorrent.url);

    let dispatcher = Dispatcher::new(Torrents::new(client, cfg.default_category), cfg.prefix);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Unable to start the async runtime")?
        .block_on(discord::run(&cfg.token, dispatcher))
}
