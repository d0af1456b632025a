//! lrumap smoke driver - apply a batch of writes, drain, print recency order

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lrumap::{CacheConfig, EvictionEnd, LruMap};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file (flags below override it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cache capacity (number of entries)
    #[arg(short, long)]
    capacity: Option<usize>,

    /// Pending writes before `set` blocks
    #[arg(short, long)]
    queue_depth: Option<usize>,

    /// Which end of the recency list to evict from
    #[arg(short, long, value_enum)]
    eviction: Option<EvictionArg>,

    /// Writes to apply, in order, as key=value
    #[arg(value_parser = parse_write, default_values_t = default_writes())]
    writes: Vec<Write>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EvictionArg {
    Oldest,
    Newest,
}

impl From<EvictionArg> for EvictionEnd {
    fn from(arg: EvictionArg) -> Self {
        match arg {
            EvictionArg::Oldest => EvictionEnd::Oldest,
            EvictionArg::Newest => EvictionEnd::Newest,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Write {
    key: String,
    value: String,
}

impl std::fmt::Display for Write {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

fn parse_write(raw: &str) -> std::result::Result<Write, String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok(Write {
            key: key.to_string(),
            value: value.to_string(),
        }),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn default_writes() -> Vec<Write> {
    ["qwe=123", "asd=124", "qwe=125", "zxc=126"]
        .iter()
        .filter_map(|raw| parse_write(raw).ok())
        .collect()
}

impl Args {
    fn cache_config(&self) -> Result<CacheConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str::<CacheConfig>(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => CacheConfig::new(2),
        };

        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(queue_depth) = self.queue_depth {
            config.queue_depth = queue_depth;
        }
        if let Some(eviction) = self.eviction {
            config.eviction = eviction.into();
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = args.cache_config()?;

    info!("Starting lrumap v{}", env!("CARGO_PKG_VERSION"));
    info!(
        capacity = config.capacity,
        queue_depth = config.queue_depth,
        eviction = ?config.eviction,
        "Cache configured"
    );

    let cache = LruMap::with_config(config)?;

    for write in &args.writes {
        cache.set(write.key.clone(), write.value.clone());
    }
    cache.flush()?;

    cache.debug_dump(std::io::stdout().lock())?;

    let stats = cache.stats();
    info!(
        entries = cache.len(),
        inserts = stats.inserts(),
        updates = stats.updates(),
        evictions = stats.evictions(),
        "Writes applied"
    );

    cache.close();
    Ok(())
}
