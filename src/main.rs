use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mirrorcache::{
    CacheConfig, CacheHost, FileRecordStore, HostRequest, HttpRemoteSource, StaleNestedPolicy,
    ValidateOptions,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mirrorcache", about = "Local entity caches mirrored from a remote API")]
struct Cli {
    /// Directory holding the cache files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL of the remote API
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Per-page request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed empty caches from the remote source
    Init {
        /// Collection to seed; all collections when omitted
        collection: Option<String>,
    },
    /// Compare a cache with the remote source and optionally repair it
    Validate {
        collection: String,
        #[arg(long)]
        auto_fix: bool,
        #[arg(long)]
        remove_orphaned: bool,
        /// Prune stale nested items only when orphans are removed too
        #[arg(long)]
        strict_nested: bool,
    },
    /// Print a cached collection
    List { collection: String },
    /// Send a raw named operation through the host facade
    Call {
        collection: String,
        operation: String,
        /// JSON payload
        #[arg(default_value = "null")]
        payload: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = CacheConfig::from_env().context("failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config = config.data_dir(dir);
    }
    if let Some(url) = cli.base_url.as_deref() {
        config = config.base_url(url);
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.request_timeout(Duration::from_secs(secs));
    }

    let store = Arc::new(
        FileRecordStore::open(&config.data_dir)
            .with_context(|| format!("failed to open {}", config.data_dir.display()))?,
    );
    let remote = Arc::new(
        HttpRemoteSource::new(&config.base_url, config.request_timeout)
            .context("failed to build remote client")?,
    );
    info!(
        data_dir = %config.data_dir.display(),
        base_url = %config.base_url,
        "cache host starting"
    );
    let mut host = CacheHost::open(config, store, remote).context("failed to open caches")?;

    match cli.command {
        Command::Init { collection } => {
            let targets: Vec<String> = match collection {
                Some(name) => vec![name],
                None => CacheHost::collections().iter().map(|c| c.to_string()).collect(),
            };
            let mut failed = 0;
            for name in targets {
                match host
                    .call(HostRequest::new(&name, "initialize", Value::Null))
                    .await
                {
                    Ok(outcome) => println!("{}: {}", name, outcome),
                    Err(err) => {
                        failed += 1;
                        error!(collection = %name, error = %err, "bootstrap failed");
                    }
                }
            }
            if failed > 0 {
                bail!("{} collection(s) could not be initialized", failed);
            }
        }
        Command::Validate {
            collection,
            auto_fix,
            remove_orphaned,
            strict_nested,
        } => {
            let mut options = ValidateOptions::report_only()
                .auto_fix(auto_fix)
                .remove_orphaned(remove_orphaned);
            if strict_nested {
                options = options.stale_nested(StaleNestedPolicy::FollowRemoveOrphaned);
            }
            let report = host
                .call(HostRequest::new(
                    &collection,
                    "validate",
                    serde_json::to_value(options)?,
                ))
                .await
                .with_context(|| format!("validation of '{}' failed", collection))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::List { collection } => {
            let items = host
                .call(HostRequest::new(&collection, "get_all", Value::Null))
                .await?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Command::Call {
            collection,
            operation,
            payload,
        } => {
            let payload: Value =
                serde_json::from_str(&payload).context("payload must be valid JSON")?;
            let result = host
                .call(HostRequest::new(&collection, &operation, payload))
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mirrorcache=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
