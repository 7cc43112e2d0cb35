/**
 * SYNC ORCHESTRATOR - Cycle de synchronisation des statuts matériels
 *
 * RÔLE :
 * Un cycle = tous les serveurs connus, un par un :
 *   fetch live → (échec) alerte serveur injoignable/offline, serveur suivant
 *              → (succès) réconciliation → alertes → mise à jour du cache nodes
 *
 * GARANTIES :
 * - Un serveur en panne n'interrompt jamais le cycle des autres
 * - Aucune erreur ne sort du cycle (tout est loggé / transformé en alerte)
 * - Les cycles ne se chevauchent pas : une seule task les enchaîne
 */

use crate::alerts::AlertEmitter;
use crate::config::Thresholds;
use crate::health::HealthTracker;
use crate::models::{NewAlert, Server};
use crate::reconcile::reconcile;
use crate::store::Store;
use crate::telemetry::{FetchError, TelemetrySource};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ServerOutcome {
    Synced {
        nodes_updated: usize,
        alerts_raised: usize,
        skipped_readings: usize,
    },
    Failed {
        reason: String,
        alert_raised: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerReport {
    pub server_id: String,
    pub server_name: String,
    #[serde(flatten)]
    pub outcome: ServerOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
    pub servers: Vec<ServerReport>,
}

impl CycleReport {
    pub fn servers_ok(&self) -> usize {
        self.servers
            .iter()
            .filter(|s| matches!(s.outcome, ServerOutcome::Synced { .. }))
            .count()
    }

    pub fn servers_failed(&self) -> usize {
        self.servers.len() - self.servers_ok()
    }
}

pub struct SyncService {
    store: Arc<dyn Store>,
    telemetry: Arc<dyn TelemetrySource>,
    emitter: AlertEmitter,
    thresholds: Thresholds,
    health: Option<HealthTracker>,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn Store>,
        telemetry: Arc<dyn TelemetrySource>,
        emitter: AlertEmitter,
        thresholds: Thresholds,
    ) -> Self {
        Self { store, telemetry, emitter, thresholds, health: None }
    }

    pub fn with_health_tracker(mut self, health: HealthTracker) -> Self {
        self.health = Some(health);
        self
    }

    /// Exécute un cycle complet sur tous les serveurs
    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = OffsetDateTime::now_utc();
        info!("[sync] starting device status sync");

        let servers = match self.store.list_servers() {
            Ok(servers) => servers,
            Err(e) => {
                error!("[sync] failed to load servers: {}", e);
                Vec::new()
            }
        };

        let mut reports = Vec::with_capacity(servers.len());
        for server in &servers {
            let outcome = self.sync_server(server).await;
            reports.push(ServerReport {
                server_id: server.id.clone(),
                server_name: server.name.clone(),
                outcome,
            });
        }

        let report = CycleReport { started_at, finished_at: OffsetDateTime::now_utc(), servers: reports };
        info!(
            "[sync] device status sync complete ({} ok, {} failed)",
            report.servers_ok(),
            report.servers_failed()
        );

        if let Some(health) = &self.health {
            health.record_cycle(&report);
        }
        report
    }

    async fn sync_server(&self, server: &Server) -> ServerOutcome {
        // probing
        let live = match self.telemetry.fetch_live_nodes(&server.address).await {
            Ok(live) => live,
            Err(e) => {
                warn!("[sync] failed to sync with server {}: {}", server.name, e);
                let alert_raised = self.emitter.emit(server_failure_alert(server, &e)).await.is_some();
                return ServerOutcome::Failed { reason: e.to_string(), alert_raised };
            }
        };

        // reconciling
        let cached = match self.store.list_nodes(&server.id) {
            Ok(nodes) => nodes,
            Err(e) => {
                error!("[sync] failed to load nodes of server {}: {}", server.name, e);
                return ServerOutcome::Failed { reason: format!("store: {e}"), alert_raised: false };
            }
        };

        let rec = reconcile(server, &cached, &live, &self.thresholds);
        if !rec.skipped.is_empty() {
            debug!("[sync] {}: ignored readings for unknown nodes {:?}", server.name, rec.skipped);
        }

        let mut alerts_raised = 0;
        for alert in rec.alerts {
            if self.emitter.emit(alert).await.is_some() {
                alerts_raised += 1;
            }
        }

        let mut nodes_updated = 0;
        for change in &rec.changes {
            match self.store.update_node(&change.node_id, &change.update) {
                Ok(()) => nodes_updated += 1,
                Err(e) => error!("[sync] failed to update node {}: {}", change.node_id, e),
            }
        }

        debug!(
            "[sync] {}: {} readings, {} nodes updated, {} alerts",
            server.name,
            live.len(),
            nodes_updated,
            alerts_raised
        );
        ServerOutcome::Synced { nodes_updated, alerts_raised, skipped_readings: rec.skipped.len() }
    }
}

/// Alerte levée quand un serveur ne livre pas ses lectures
fn server_failure_alert(server: &Server, err: &FetchError) -> NewAlert {
    let message = match err {
        FetchError::ServerError { .. } => format!("Server '{}' is offline.", server.name),
        FetchError::Unreachable(_) | FetchError::InvalidPayload(_) => {
            format!("Server '{}' is unreachable.", server.name)
        }
    };
    NewAlert::critical(None, message)
}

/// Démarre la boucle périodique. Les cycles sont enchaînés dans une seule task :
/// un cycle trop long retarde le suivant au lieu de se chevaucher avec lui.
pub fn spawn_sync_loop(service: Arc<SyncService>, period: Duration) -> JoinHandle<()> {
    info!("[sync] starting periodic sync (every {}s)", period.as_secs());

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            service.run_cycle().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Alert, LiveNodeReading, Node, NodeStatus, NodeUpdate};
    use crate::notify::LogNotifier;
    use crate::store::{AlertFilter, JsonStore, StoreError};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Source de télémétrie scriptée par adresse de serveur
    struct ScriptedTelemetry {
        responses: HashMap<String, Result<Vec<LiveNodeReading>, u16>>,
    }

    #[async_trait]
    impl TelemetrySource for ScriptedTelemetry {
        async fn fetch_live_nodes(&self, server_address: &str) -> Result<Vec<LiveNodeReading>, FetchError> {
            match self.responses.get(server_address) {
                Some(Ok(readings)) => Ok(readings.clone()),
                Some(Err(status)) => Err(FetchError::ServerError { status: *status }),
                None => Err(FetchError::Unreachable("connection refused".into())),
            }
        }
    }

    fn seeded_store(dir: &std::path::Path) -> Arc<JsonStore> {
        let servers = vec![
            Server { id: "s1".into(), name: "Rack A".into(), address: "a:80".into() },
            Server { id: "s2".into(), name: "Rack B".into(), address: "b:80".into() },
            Server { id: "s3".into(), name: "Rack C".into(), address: "c:80".into() },
        ];
        let nodes = vec![Node {
            id: "local-1".into(),
            node_id: "n-1".into(),
            name: "Node-1".into(),
            server_id: "s3".into(),
            status: NodeStatus::Online,
            state: "idle".into(),
            temperature: Some(70.0),
        }];
        std::fs::write(dir.join("servers.json"), serde_json::to_string(&servers).unwrap()).unwrap();
        std::fs::write(dir.join("nodes.json"), serde_json::to_string(&nodes).unwrap()).unwrap();
        Arc::new(JsonStore::open(dir).unwrap())
    }

    fn service(store: Arc<JsonStore>, telemetry: ScriptedTelemetry) -> SyncService {
        let emitter = AlertEmitter::new(store.clone(), Arc::new(LogNotifier), "Aura Critical Alert");
        SyncService::new(store, Arc::new(telemetry), emitter, Thresholds::default())
    }

    #[tokio::test]
    async fn test_failing_servers_do_not_stop_the_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let mut responses = HashMap::new();
        responses.insert("b:80".to_string(), Err(503));
        responses.insert(
            "c:80".to_string(),
            Ok(vec![LiveNodeReading {
                node_id: "n-1".into(),
                status: NodeStatus::Online,
                state: "busy".into(),
                temperature: Some(82.0),
            }]),
        );
        let sync = service(store.clone(), ScriptedTelemetry { responses });

        let report = sync.run_cycle().await;
        assert_eq!(report.servers.len(), 3);
        assert_eq!(report.servers_failed(), 2);
        assert_eq!(
            report.servers[2].outcome,
            ServerOutcome::Synced { nodes_updated: 1, alerts_raised: 1, skipped_readings: 0 }
        );

        let mut messages: Vec<String> = store
            .list_alerts(&AlertFilter::default())
            .unwrap()
            .into_iter()
            .map(|a| a.message)
            .collect();
        messages.sort();
        assert_eq!(
            messages,
            vec![
                "High temp warning for 'Node-1'. Temp: 82°C.".to_string(),
                "Server 'Rack A' is unreachable.".to_string(),
                "Server 'Rack B' is offline.".to_string(),
            ]
        );
        assert_eq!(store.list_nodes("s3").unwrap()[0].temperature, Some(82.0));
    }

    /// Store JSON dont certaines opérations échouent à la demande
    #[derive(Default)]
    struct Faults {
        list_servers: bool,
        list_nodes_of: Option<&'static str>,
        update_of: Option<&'static str>,
    }

    struct FaultyStore {
        inner: Arc<JsonStore>,
        faults: Faults,
    }

    fn io_failure() -> StoreError {
        StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
    }

    impl Store for FaultyStore {
        fn list_servers(&self) -> Result<Vec<Server>, StoreError> {
            if self.faults.list_servers {
                return Err(io_failure());
            }
            self.inner.list_servers()
        }

        fn list_nodes(&self, server_id: &str) -> Result<Vec<Node>, StoreError> {
            if self.faults.list_nodes_of == Some(server_id) {
                return Err(io_failure());
            }
            self.inner.list_nodes(server_id)
        }

        fn update_node(&self, node_id: &str, update: &NodeUpdate) -> Result<(), StoreError> {
            if self.faults.update_of == Some(node_id) {
                return Err(io_failure());
            }
            self.inner.update_node(node_id, update)
        }

        fn create_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
            self.inner.create_alert(alert)
        }

        fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError> {
            self.inner.list_alerts(filter)
        }

        fn acknowledge_alert(&self, alert_id: &str) -> Result<Alert, StoreError> {
            self.inner.acknowledge_alert(alert_id)
        }
    }

    fn faulty_service(inner: Arc<JsonStore>, faults: Faults, telemetry: ScriptedTelemetry) -> SyncService {
        let store: Arc<dyn Store> = Arc::new(FaultyStore { inner, faults });
        let emitter = AlertEmitter::new(store.clone(), Arc::new(LogNotifier), "Aura Critical Alert");
        SyncService::new(store, Arc::new(telemetry), emitter, Thresholds::default())
    }

    fn live(node_id: &str, status: NodeStatus, temperature: f64) -> LiveNodeReading {
        LiveNodeReading { node_id: node_id.into(), status, state: "busy".into(), temperature: Some(temperature) }
    }

    #[tokio::test]
    async fn test_failed_node_write_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let servers = vec![Server { id: "s1".into(), name: "Rack A".into(), address: "a:80".into() }];
        let nodes: Vec<Node> = ["1", "2"]
            .iter()
            .map(|i| Node {
                id: format!("local-{i}"),
                node_id: format!("n-{i}"),
                name: format!("Node-{i}"),
                server_id: "s1".into(),
                status: NodeStatus::Online,
                state: "idle".into(),
                temperature: Some(70.0),
            })
            .collect();
        std::fs::write(dir.path().join("servers.json"), serde_json::to_string(&servers).unwrap()).unwrap();
        std::fs::write(dir.path().join("nodes.json"), serde_json::to_string(&nodes).unwrap()).unwrap();
        let inner = Arc::new(JsonStore::open(dir.path()).unwrap());

        let mut responses = HashMap::new();
        responses.insert(
            "a:80".to_string(),
            Ok(vec![live("n-1", NodeStatus::Offline, 70.0), live("n-2", NodeStatus::Online, 96.0)]),
        );
        let sync = faulty_service(
            inner.clone(),
            Faults { update_of: Some("local-1"), ..Default::default() },
            ScriptedTelemetry { responses },
        );

        let report = sync.run_cycle().await;
        assert_eq!(
            report.servers[0].outcome,
            ServerOutcome::Synced { nodes_updated: 1, alerts_raised: 2, skipped_readings: 0 }
        );

        let cached = inner.list_nodes("s1").unwrap();
        let n1 = cached.iter().find(|n| n.id == "local-1").unwrap();
        let n2 = cached.iter().find(|n| n.id == "local-2").unwrap();
        assert_eq!(n1.status, NodeStatus::Online);
        assert_eq!(n2.temperature, Some(96.0));
        assert_eq!(inner.list_alerts(&AlertFilter::default()).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_node_listing_moves_to_next_server() {
        let dir = tempfile::tempdir().unwrap();
        let inner = seeded_store(dir.path());
        let mut responses = HashMap::new();
        responses.insert("a:80".to_string(), Ok(Vec::new()));
        responses.insert("b:80".to_string(), Ok(Vec::new()));
        responses.insert("c:80".to_string(), Ok(vec![live("n-1", NodeStatus::Online, 71.0)]));
        let sync = faulty_service(
            inner.clone(),
            Faults { list_nodes_of: Some("s1"), ..Default::default() },
            ScriptedTelemetry { responses },
        );

        let report = sync.run_cycle().await;
        assert!(matches!(report.servers[0].outcome, ServerOutcome::Failed { alert_raised: false, .. }));
        assert!(matches!(report.servers[1].outcome, ServerOutcome::Synced { .. }));
        assert!(matches!(report.servers[2].outcome, ServerOutcome::Synced { nodes_updated: 1, .. }));
        assert!(inner.list_alerts(&AlertFilter::default()).unwrap().is_empty());
        assert_eq!(inner.list_nodes("s3").unwrap()[0].temperature, Some(71.0));
    }

    #[tokio::test]
    async fn test_failed_server_listing_yields_empty_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let inner = seeded_store(dir.path());
        let health = HealthTracker::new();
        let sync = faulty_service(
            inner.clone(),
            Faults { list_servers: true, ..Default::default() },
            ScriptedTelemetry { responses: HashMap::new() },
        )
        .with_health_tracker(health.clone());

        let report = sync.run_cycle().await;
        assert!(report.servers.is_empty());
        assert!(inner.list_alerts(&AlertFilter::default()).unwrap().is_empty());
        assert_eq!(health.get_health().cycles_completed, 1);
    }

    #[tokio::test]
    async fn test_health_tracker_sees_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let health = HealthTracker::new();
        let sync = service(store, ScriptedTelemetry { responses: HashMap::new() })
            .with_health_tracker(health.clone());

        sync.run_cycle().await;
        sync.run_cycle().await;
        let snapshot = health.get_health();
        assert_eq!(snapshot.cycles_completed, 2);
        assert_eq!(snapshot.last_cycle_servers_failed, Some(3));
        assert_eq!(snapshot.alerts_raised_total, 6);
    }

    #[test]
    fn test_server_failure_messages() {
        let server = Server { id: "s".into(), name: "Rack A".into(), address: "a".into() };
        assert_eq!(
            server_failure_alert(&server, &FetchError::ServerError { status: 500 }).message,
            "Server 'Rack A' is offline."
        );
        assert_eq!(
            server_failure_alert(&server, &FetchError::InvalidPayload("eof".into())).message,
            "Server 'Rack A' is unreachable."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_loop_runs_periodically() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let health = HealthTracker::new();
        let sync = Arc::new(
            service(store, ScriptedTelemetry { responses: HashMap::new() }).with_health_tracker(health.clone()),
        );

        let handle = spawn_sync_loop(sync, Duration::from_secs(30));
        // premier tick immédiat, puis un toutes les 30s
        tokio::time::sleep(Duration::from_secs(65)).await;
        handle.abort();
        assert_eq!(health.get_health().cycles_completed, 3);
    }
}
