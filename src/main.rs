// Copyright (c) 2026 Edgeprint Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Edgeprint - CLI Entry Point
 * Passive-active fingerprinting of HTTP edge defenses
 *
 * @copyright 2026 Edgeprint Oy
 * @license Proprietary
 */

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};

use edgeprint::config::{
    RunConfig, DEFAULT_CONCURRENCY, DEFAULT_JITTER_MAX_MS, DEFAULT_JITTER_MIN_MS,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use edgeprint::errors::EdgeprintError;

/// Edgeprint - behavioral fingerprinting of WAF/CDN/rate-limiter edges
#[derive(Parser)]
#[command(name = "edgeprint")]
#[command(version = "0.2.0")]
#[command(about = "Infer how an HTTP edge escalates: throttling, challenges, blocking", long_about = None)]
struct Cli {
    /// Target base URL
    #[arg(short, long)]
    url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Maximum pooled connections to the target
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Minimum inter-request jitter in milliseconds
    #[arg(long, default_value_t = DEFAULT_JITTER_MIN_MS)]
    jitter_min: u64,

    /// Maximum inter-request jitter in milliseconds
    #[arg(long, default_value_t = DEFAULT_JITTER_MAX_MS)]
    jitter_max: u64,

    /// User-Agent header
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Write the JSON report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("edgeprint-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let cfg = RunConfig::new(&cli.url)?
        .with_timeout(cli.timeout)
        .with_concurrency(cli.concurrency)
        .with_jitter(cli.jitter_min, cli.jitter_max)?
        .with_user_agent(&cli.user_agent);

    info!(target_url = %cfg.target, "starting fingerprint run");
    let report = edgeprint::fingerprint(&cfg).await?;

    let json = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &json).map_err(|e| EdgeprintError::ReportWrite {
                path: path.display().to_string(),
                source: e,
            })?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", json),
    }

    Ok(())
}
