#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod archive;
mod cli;
mod config;
mod discord;
mod feed;
mod utils;

use archive::ArchiveCore;
use config::Config;
use discord::DiscordClient;

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init_tracing();

    let args = cli::Cli::parse();
    let config = Config::load(&args.config)?;
    info!("discord archiver starting up");

    let client = Arc::new(DiscordClient::new(&config));
    client.login().await?;

    let backup_root = args
        .backup_dir
        .unwrap_or_else(|| PathBuf::from(&config.archive.backup_dir));

    let core = ArchiveCore::new(client, backup_root);
    let summary = core.run().await?;

    info!(
        "backup complete: {} communities, {} channels archived, {} skipped, {} messages written",
        summary.communities,
        summary.channels_archived,
        summary.channels_skipped,
        summary.messages_written
    );
    Ok(())
}
