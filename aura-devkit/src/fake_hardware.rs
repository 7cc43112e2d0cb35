/*!
Faux serveur matériel pour développer et tester sans rack réel.

Sert `GET /api/v1/nodes` avec des lectures scriptées. Les lectures et le mode
de panne sont modifiables à chaud entre deux cycles de sync.
*/

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const DEFAULT_NODES_PATH: &str = "/api/v1/nodes";

/// Comportement du serveur pour les prochaines requêtes
#[derive(Debug, Clone, PartialEq)]
pub enum FailureMode {
    /// Répond 200 avec les lectures courantes
    Healthy,
    /// Répond avec ce statut HTTP
    Status(u16),
    /// Répond 200 avec un corps qui n'est pas du JSON
    Garbage,
    /// Attend avant de répondre normalement (pour provoquer un timeout)
    Delay(Duration),
}

#[derive(Debug)]
struct FakeState {
    readings: Vec<Value>,
    mode: FailureMode,
    requests: usize,
}

type SharedFake = Arc<Mutex<FakeState>>;

/// Serveur lancé sur 127.0.0.1 (port éphémère), arrêté au drop
pub struct FakeHardwareServer {
    addr: SocketAddr,
    state: SharedFake,
    handle: Option<JoinHandle<()>>,
}

impl FakeHardwareServer {
    pub async fn spawn(readings: Vec<Value>) -> Result<Self> {
        Self::spawn_on("127.0.0.1:0", DEFAULT_NODES_PATH, readings).await
    }

    pub async fn spawn_on(bind: &str, path: &str, readings: Vec<Value>) -> Result<Self> {
        let state: SharedFake = Arc::new(Mutex::new(FakeState {
            readings,
            mode: FailureMode::Healthy,
            requests: 0,
        }));

        let app = router(path, state.clone());
        let listener = TcpListener::bind(bind).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("[fake-hw] server stopped: {}", e);
            }
        });

        tracing::info!("[fake-hw] serving {} on http://{}", path, addr);
        Ok(Self { addr, state, handle: Some(handle) })
    }

    /// Adresse host:port à enregistrer comme adresse du serveur
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn set_readings(&self, readings: Vec<Value>) {
        self.state.lock().readings = readings;
    }

    pub fn set_mode(&self, mode: FailureMode) {
        self.state.lock().mode = mode;
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests
    }

    /// Attend la fin du serveur (utilisé par le binaire)
    pub async fn wait(mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle.await?;
        }
        Ok(())
    }
}

impl Drop for FakeHardwareServer {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

fn router(path: &str, state: SharedFake) -> Router {
    Router::new().route(path, get(get_nodes)).with_state(state)
}

async fn get_nodes(State(state): State<SharedFake>) -> Response {
    let (mode, readings) = {
        let mut st = state.lock();
        st.requests += 1;
        (st.mode.clone(), st.readings.clone())
    };

    match mode {
        FailureMode::Healthy => Json(readings).into_response(),
        FailureMode::Status(code) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, "hardware failure").into_response()
        }
        FailureMode::Garbage => (StatusCode::OK, "<html>not json</html>").into_response(),
        FailureMode::Delay(delay) => {
            tokio::time::sleep(delay).await;
            Json(readings).into_response()
        }
    }
}

/// Lecture au format matériel : {nodeId, status, state, temperature}
pub fn reading(node_id: &str, status: &str, state: &str, temperature: f64) -> Value {
    json!({
        "nodeId": node_id,
        "status": status,
        "state": state,
        "temperature": temperature,
    })
}
