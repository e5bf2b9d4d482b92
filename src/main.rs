// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use peersync::{
    ClientConfig, ClientError, CommandDispatcher, DownloadRecord, DownloadStatus, HttpTransport,
    SearchResultEntry, ShareRecord,
};

/// Exit codes following sysexits.h conventions
mod exit_codes {
    /// Success - operation completed successfully
    pub const SUCCESS: i32 = 0;
    /// General error - the server rejected the request
    pub const ERROR: i32 = 1;
    /// Service unavailable - the gateway could not be reached
    pub const SERVICE_UNAVAILABLE: i32 = 69;
    /// Internal software error - protocol violation or unexpected condition
    pub const SOFTWARE: i32 = 70;
    /// Configuration error - invalid or missing config
    pub const CONFIG: i32 = 78;
}

use exit_codes::*;

#[derive(Parser)]
#[command(
    name = "peersync",
    version,
    about = "Search, download, and share files on a p2p network"
)]
struct Cli {
    /// Gateway URL (overrides config file and environment)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Path to an alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the shared catalog by filename substring
    Search {
        /// Filename or a substring of it
        query: String,
    },
    /// Start downloading a file found via search
    Download {
        /// The unique id reported by a search result
        unique_id: String,
        /// Destination path on this machine
        local_path: String,
    },
    /// List tracked downloads
    Downloads {
        /// Keep refreshing until no download is in progress
        #[arg(long)]
        watch: bool,
    },
    /// Stop and remove a download by its id
    Cancel {
        /// Server-assigned download id (see `peersync downloads`)
        id: String,
    },
    /// Publish a local file as a share
    Share {
        /// Path of the file to share
        path: String,
    },
    /// List published shares
    Shares,
    /// Stop sharing a file by its unique id
    Unshare {
        /// Share unique id (see `peersync shares`)
        unique_id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => SUCCESS,
        Err(err) => report_error(&err),
    };
    std::process::exit(code);
}

fn report_error(err: &anyhow::Error) -> i32 {
    eprintln!("{} {}", "[✗]".red(), err);
    match err.downcast_ref::<ClientError>() {
        Some(ClientError::Network(_)) => SERVICE_UNAVAILABLE,
        Some(ClientError::Business(_)) => ERROR,
        Some(ClientError::Protocol(_)) => SOFTWARE,
        None => {
            if err.to_string().contains("config") {
                CONFIG
            } else {
                ERROR
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    let transport = HttpTransport::new(&config.server_url)
        .with_request_timeout(config.request_timeout());
    let dispatcher = CommandDispatcher::new(Arc::new(transport), config.poll_interval());

    match cli.command {
        Command::Search { query } => {
            let results = dispatcher.search(&query).await?;
            print_search_results(&query, &results);
        }
        Command::Download {
            unique_id,
            local_path,
        } => {
            let records = dispatcher.start_download(&unique_id, &local_path).await?;
            println!("{} download started", "[✓]".green());
            print_downloads(&records);
        }
        Command::Downloads { watch } => {
            if watch {
                watch_downloads(&dispatcher, config.poll_interval()).await?;
            } else {
                let records = dispatcher.refresh_downloads().await?;
                print_downloads(&records);
            }
        }
        Command::Cancel { id } => {
            let records = dispatcher.stop_download(&id).await?;
            println!("{} download removed", "[✓]".green());
            print_downloads(&records);
        }
        Command::Share { path } => {
            let shares = dispatcher.publish_share(&path).await?;
            println!("{} now sharing {}", "[✓]".green(), path);
            print_shares(&shares);
        }
        Command::Shares => {
            let shares = dispatcher.refresh_shares().await?;
            print_shares(&shares);
        }
        Command::Unshare { unique_id } => {
            let shares = dispatcher.unpublish_share(&unique_id).await?;
            println!("{} share retracted", "[✓]".green());
            print_shares(&shares);
        }
    }

    dispatcher.shutdown();
    Ok(())
}

/// Refresh-and-render loop for `downloads --watch`. The first refresh arms
/// the tracker's poll chain; this loop only reads the view and exits once
/// the chain has quiesced.
async fn watch_downloads(
    dispatcher: &CommandDispatcher<HttpTransport>,
    interval: Duration,
) -> Result<()> {
    let mut records = dispatcher.refresh_downloads().await?;
    loop {
        println!(
            "{}",
            format!("as of {}", chrono::Local::now().format("%H:%M:%S")).dimmed()
        );
        print_downloads(&records);
        if !dispatcher.downloads_polling() {
            break;
        }
        tokio::time::sleep(interval).await;
        println!();
        records = dispatcher.downloads();
    }
    Ok(())
}

fn print_search_results(query: &str, results: &[SearchResultEntry]) {
    if results.is_empty() {
        println!("no files matching '{}'", query);
        return;
    }
    println!("{} result(s) for '{}':", results.len(), query);
    for entry in results {
        println!("  {}  {}", entry.unique_id.cyan(), entry.description);
    }
}

fn print_downloads(records: &[DownloadRecord]) {
    if records.is_empty() {
        println!("no tracked downloads");
        return;
    }
    for record in records {
        let status = match record.status {
            DownloadStatus::InProgress => record
                .progress
                .as_deref()
                .unwrap_or("in progress")
                .cyan(),
            DownloadStatus::Done => "done".green(),
            DownloadStatus::Failed => "failed".red(),
        };
        println!(
            "  {}  {:<30} {:<40} {}",
            record.id.cyan(),
            record.name,
            record.local_path,
            status
        );
    }
}

fn print_shares(shares: &[ShareRecord]) {
    if shares.is_empty() {
        println!("nothing shared");
        return;
    }
    for share in shares {
        println!("  {}  {}", share.unique_id.cyan(), share.local_path);
    }
}
