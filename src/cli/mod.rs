pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(name = "rsslite")]
#[command(about = "Serve RSS feeds scraped from HTML pages and JSON APIs", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Override the listen address (e.g., "127.0.0.1:8080")
    #[arg(short, long, global = true)]
    pub listen: Option<String>,

    /// Override the feed cache location
    #[arg(long, global = true)]
    pub cache: Option<PathBuf>,

    /// Run the server when no subcommand is given
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server and refresh schedules (default)
    Serve,
    /// Validate the configuration and list sources
    Check,
    /// Refresh one source now and update the cache
    Refresh {
        /// Slug of the source to refresh
        slug: String,
    },
    /// Write a sample configuration file
    Init,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
        if let Some(cache) = &self.cache {
            config.cache_path = cache.clone();
        }
    }
}
