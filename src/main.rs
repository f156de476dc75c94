// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use redis_archiver::{Archiver, ArchiverConfig, BlobStoreRegistry, ExitPolicy, Mode, RedisStore};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Drain a Redis work queue and archive changed documents to blob storage.
#[derive(Debug, Parser)]
#[command(name = "redis-archiver", version)]
struct Cli {
    /// JSON config file; missing fields take their defaults
    #[arg(short, long, env = "ARCHIVER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "ARCHIVER_HOST")]
    host: Option<String>,

    #[arg(long, env = "ARCHIVER_PORT")]
    port: Option<u16>,

    /// Snapshot generation to record history and tombstones under
    #[arg(long)]
    snapshot_id: Option<String>,

    /// Redis key prefix
    #[arg(long)]
    namespace: Option<String>,

    /// Push processed keys onto this list
    #[arg(long, conflicts_with = "expire")]
    outq: Option<String>,

    /// Expire processed source keys after this many seconds
    #[arg(long)]
    expire: Option<u64>,

    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Stop when the queue is empty instead of waiting for the sentinel
    #[arg(long, value_enum)]
    exit: Option<ExitPolicy>,

    /// Blob backend name (fs, memory)
    #[arg(long)]
    blob_store_type: Option<String>,

    /// Root directory for the fs blob backend
    #[arg(long)]
    blob_path: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "ARCHIVER_JSON_LOGS")]
    json_logs: bool,
}

impl Cli {
    fn load_config(&self) -> Result<ArchiverConfig> {
        let mut config = match &self.config {
            Some(path) => ArchiverConfig::from_file(path)?,
            None => ArchiverConfig::default(),
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(id) = &self.snapshot_id {
            config.snapshot_id = id.clone();
        }
        if let Some(ns) = &self.namespace {
            config.namespace = ns.clone();
        }
        if let Some(outq) = &self.outq {
            config.outq = Some(outq.clone());
        }
        if let Some(secs) = self.expire {
            config.expire = Some(secs);
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(exit) = self.exit {
            config.exit = exit;
        }
        if let Some(kind) = &self.blob_store_type {
            config.blob_store_type = kind.clone();
        }
        if let Some(path) = &self.blob_path {
            config.blob_store.path = path.clone();
        }
        if let Some(level) = &self.log_level {
            config.logger_level = level.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_tracing(&config.logger_level, cli.json_logs);

    let blobs = BlobStoreRegistry::with_defaults()
        .create(&config.blob_store_type, &config.blob_store)
        .with_context(|| format!("creating '{}' blob store", config.blob_store_type))?;

    let store = RedisStore::new(&config.redis_url(), config.keyspace())
        .await
        .with_context(|| format!("connecting to {}", config.redis_url()))?;

    let summary = Archiver::new(&config, Arc::new(store), blobs).run().await;
    tracing::info!(
        reason = %summary.exit,
        processed = summary.stats.processed(),
        failed = summary.stats.failed,
        "Archiver stopped"
    );
    Ok(())
}
