//! Récupération des lectures live d'un serveur matériel (GET /api/v1/nodes).
//!
//! Pas de retry ici : un échec remonte tel quel, le cycle suivant réessaiera.

use crate::models::LiveNodeReading;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Erreur réseau ou timeout
    #[error("unreachable: {0}")]
    Unreachable(String),
    /// Le serveur a répondu avec un statut non-2xx
    #[error("server error: HTTP {status}")]
    ServerError { status: u16 },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_live_nodes(&self, server_address: &str) -> Result<Vec<LiveNodeReading>, FetchError>;
}

pub struct HttpTelemetry {
    client: reqwest::Client,
    node_status_path: String,
}

impl HttpTelemetry {
    pub fn new(timeout: Duration, node_status_path: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| FetchError::Unreachable(format!("http client init: {e}")))?;
        Ok(Self { client, node_status_path: node_status_path.to_string() })
    }

    pub fn status_url(&self, server_address: &str) -> String {
        format!("http://{}{}", server_address, self.node_status_path)
    }
}

#[async_trait]
impl TelemetrySource for HttpTelemetry {
    async fn fetch_live_nodes(&self, server_address: &str) -> Result<Vec<LiveNodeReading>, FetchError> {
        let url = self.status_url(server_address);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError { status: status.as_u16() });
        }

        // lecture du corps séparée du parse : un timeout pendant la lecture reste "unreachable"
        let body = response.bytes().await.map_err(|e| classify(&url, e))?;
        serde_json::from_slice::<Vec<LiveNodeReading>>(&body)
            .map_err(|e| FetchError::InvalidPayload(format!("{url}: {e}")))
    }
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Unreachable(format!("{url}: timed out"))
    } else {
        FetchError::Unreachable(format!("{url}: {e}"))
    }
}
