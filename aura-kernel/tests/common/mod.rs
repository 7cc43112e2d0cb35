//! Harness partagé : store JSON temporaire + notifier qui enregistre.

#![allow(dead_code)]

use async_trait::async_trait;
use aura_kernel::models::{Alert, Node, NodeStatus, Server};
use aura_kernel::notify::{Notifier, NotifyError};
use aura_kernel::store::AlertFilter;
use aura_kernel::{AlertEmitter, HttpTelemetry, JsonStore, Store, SyncService, Thresholds};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_immediate(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        self.sent.lock().push((title.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<JsonStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub sync: SyncService,
}

impl Harness {
    /// Seed le store puis câble un SyncService sur HTTP réel
    pub fn new(servers: Vec<Server>, nodes: Vec<Node>, fetch_timeout: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("servers.json"), serde_json::to_string(&servers).unwrap()).unwrap();
        std::fs::write(dir.path().join("nodes.json"), serde_json::to_string(&nodes).unwrap()).unwrap();

        let store = Arc::new(JsonStore::open(dir.path()).unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let emitter = AlertEmitter::new(store.clone(), notifier.clone(), "Aura Critical Alert");
        let telemetry = HttpTelemetry::new(fetch_timeout, "/api/v1/nodes").unwrap();
        let sync = SyncService::new(store.clone(), Arc::new(telemetry), emitter, Thresholds::default());

        Self { dir, store, notifier, sync }
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.store.list_alerts(&AlertFilter::default()).unwrap()
    }

    /// Messages triés (plusieurs alertes peuvent partager le même horodatage)
    pub fn alert_messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self.alerts().into_iter().map(|a| a.message).collect();
        messages.sort();
        messages
    }

    pub fn node(&self, server_id: &str, node_id: &str) -> Node {
        self.store
            .list_nodes(server_id)
            .unwrap()
            .into_iter()
            .find(|n| n.node_id == node_id)
            .unwrap()
    }
}

pub fn server(id: &str, name: &str, address: &str) -> Server {
    Server { id: id.into(), name: name.into(), address: address.into() }
}

pub fn node(id: &str, node_id: &str, name: &str, server_id: &str, temperature: f64) -> Node {
    Node {
        id: id.into(),
        node_id: node_id.into(),
        name: name.into(),
        server_id: server_id.into(),
        status: NodeStatus::Online,
        state: "idle".into(),
        temperature: Some(temperature),
    }
}
