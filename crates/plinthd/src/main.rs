//! plinthd — local runner for the ingestion handler.
//!
//! Binds a small HTTP push endpoint and feeds each posted finalize event
//! to one handler invocation. Connection parameters come from the
//! environment (`DB_NAME`, `DB_USER`, `DB_PASS`/`DB_PASSWORD`, and
//! `CLOUD_SQL_CONNECTION_NAME` or `DB_HOST`), exactly as in the deployed
//! function.
//!
//! # Usage
//!
//! ```text
//! plinthd serve --bind 127.0.0.1:8080
//! plinthd serve --bind 127.0.0.1:8080 --memory   # no database needed
//! plinthd serve --config ./plinth.toml           # [retry] section applies
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use plinth_core::config::PlinthConfig;
use plinth_ingest::{
    EnvResolver, IngestHandler, MemoryConnector, MemoryDb, PgConnector, RetryPolicy,
    StaticResolver,
};
use plinth_ingest::resolver::{DB_HOST, DB_NAME, DB_PASS, DB_USER};

mod server;

#[derive(Parser)]
#[command(name = "plinthd", about = "Plinth ingestion dev runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the push endpoint.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// Record uploads in memory instead of Postgres.
        #[arg(long)]
        memory: bool,

        /// plinth.toml to read the [retry] section from.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Report malformed events as retryable to the delivery channel.
        /// Overrides the config file.
        #[arg(long)]
        retry_validation_errors: bool,
    },
}

/// The flag wins when set; otherwise the [retry] section decides.
fn retry_policy(config: Option<&PlinthConfig>, flag: bool) -> RetryPolicy {
    RetryPolicy {
        retry_validation_errors: flag
            || config.map(|c| c.retry_validation_errors()).unwrap_or(false),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,plinthd=debug,plinth=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            memory,
            config,
            retry_validation_errors,
        } => serve(bind, memory, config, retry_validation_errors).await,
    }
}

async fn serve(
    bind: SocketAddr,
    memory: bool,
    config: Option<PathBuf>,
    retry_validation_errors: bool,
) -> anyhow::Result<()> {
    let config = config.map(|path| PlinthConfig::from_file(&path)).transpose()?;
    let policy = retry_policy(config.as_ref(), retry_validation_errors);

    let handler = if memory {
        info!("using in-memory upload store");
        // The memory connector ignores connection parameters, so the
        // resolver can be canned.
        let resolver = StaticResolver::new([
            (DB_NAME, "memory"),
            (DB_USER, "memory"),
            (DB_PASS, "memory"),
            (DB_HOST, "memory"),
        ]);
        let connector = MemoryConnector::new(MemoryDb::new());
        IngestHandler::new(Arc::new(resolver), Arc::new(connector)).with_policy(policy)
    } else {
        IngestHandler::new(Arc::new(EnvResolver), Arc::new(PgConnector)).with_policy(policy)
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = server::PushServer::new(bind, Arc::new(handler));
    let serve_task = tokio::spawn(server.serve(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);
    serve_task.await??;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_core::config::RetryConfig;

    fn config_with_retry(value: bool) -> PlinthConfig {
        let mut config = PlinthConfig::scaffold("demo", "p-1");
        config.retry = Some(RetryConfig {
            retry_validation_errors: Some(value),
        });
        config
    }

    #[test]
    fn retry_section_drives_the_policy() {
        let config = config_with_retry(true);
        assert!(retry_policy(Some(&config), false).retry_validation_errors);
        let config = config_with_retry(false);
        assert!(!retry_policy(Some(&config), false).retry_validation_errors);
    }

    #[test]
    fn flag_overrides_the_config_file() {
        let config = config_with_retry(false);
        assert!(retry_policy(Some(&config), true).retry_validation_errors);
    }

    #[test]
    fn defaults_to_dropping_malformed_events() {
        assert!(!retry_policy(None, false).retry_validation_errors);
    }
}
