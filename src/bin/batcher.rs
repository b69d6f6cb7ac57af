//! Runnable host for the durable batcher.
//!
//! Reads one work-item id per line from stdin, batches them with the echo
//! processor, and logs every checkpoint as JSON. Set `BATCHER_CONFIG` to a JSON
//! file to override the defaults and `RUST_LOG` to change verbosity.

use std::sync::Arc;

use durable_batcher::{BatcherConfig, BatcherError, BatcherSupervisor, EchoProcessor, SignalSender};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "BATCHER_CONFIG";

fn load_config() -> Result<BatcherConfig, BatcherError> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            let json = std::fs::read_to_string(&path).map_err(|e| {
                BatcherError::validation(format!("Failed to read config file '{}': {}", path, e))
            })?;
            tracing::info!(path = %path, "Loaded batcher configuration");
            BatcherConfig::from_json(&json)
        }
        Err(_) => Ok(BatcherConfig::default()),
    }
}

async fn forward_stdin(sender: SignalSender) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let id = line.trim();
                if id.is_empty() {
                    continue;
                }
                if let Err(error) = sender.signal(id).await {
                    tracing::error!(error = %error, "Failed to signal work item");
                    return;
                }
            }
            Ok(None) => break,
            Err(error) => {
                tracing::error!(error = %error, "Failed to read stdin");
                break;
            }
        }
    }
    tracing::info!("Input closed, waiting for pending items to drain");
    // Holding the sender keeps the channel open so the deadline can still flush.
    let _sender = sender;
    std::future::pending::<()>().await;
}

#[tokio::main]
async fn main() -> Result<(), BatcherError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = load_config()?;
    let (supervisor, sender) =
        BatcherSupervisor::new(config, Arc::new(EchoProcessor::default()))?;
    let mut supervisor = supervisor.on_checkpoint(|checkpoint| match checkpoint.to_json() {
        Ok(json) => tracing::info!(checkpoint = %json, "Checkpoint taken"),
        Err(error) => tracing::warn!(error = %error, "Failed to serialize checkpoint"),
    });

    let queries = supervisor.query_handle();
    tokio::spawn(forward_stdin(sender));

    tokio::select! {
        result = supervisor.run() => {
            let error = match result {
                Ok(never) => match never {},
                Err(error) => error,
            };
            tracing::error!(
                error = %error,
                reason = ?error.termination_reason(),
                "Batcher stopped"
            );
            Err(error)
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(
                pending = queries.current_pending().len(),
                generation = queries.generation(),
                "Shutting down"
            );
            Ok(())
        }
    }
}
