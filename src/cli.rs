use std::path::PathBuf;

use clap::Parser;

/// Archive the message history of every guild the bot token can see.
#[derive(Debug, Parser)]
#[command(name = "discord-archiver", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Override the backup root directory from the configuration.
    #[arg(long)]
    pub backup_dir: Option<PathBuf>,
}
