//! Faux serveur matériel en standalone.
//!
//! Usage : aura-fake-hardware [readings.json]
//! Bind via AURA_FAKE_BIND (défaut 0.0.0.0:5000).

use anyhow::{Context, Result};
use aura_devkit::fake_hardware::DEFAULT_NODES_PATH;
use aura_devkit::{reading, FakeHardwareServer};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let readings = match std::env::args().nth(1) {
        Some(path) => {
            let txt = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {path}"))?;
            serde_json::from_str::<Vec<Value>>(&txt).with_context(|| format!("{path} is not a JSON array"))?
        }
        None => vec![
            reading("node-1", "online", "idle", 45.0),
            reading("node-2", "online", "busy", 82.0),
            reading("node-3", "offline", "unknown", 30.0),
        ],
    };

    let bind = std::env::var("AURA_FAKE_BIND").unwrap_or_else(|_| "0.0.0.0:5000".into());
    let server = FakeHardwareServer::spawn_on(&bind, DEFAULT_NODES_PATH, readings).await?;
    tracing::info!("[fake-hw] register this server with address {}", server.address());
    server.wait().await
}
