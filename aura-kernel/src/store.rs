/**
 * STORE - Persistance locale des serveurs, nodes et alertes
 *
 * RÔLE :
 * Interface unique entre le kernel de sync et les données persistées.
 * Le kernel lit les serveurs, lit/met à jour les nodes, crée les alertes.
 *
 * FONCTIONNEMENT :
 * - Store trait = opérations utilisées par le cycle de sync (+ lecture/ack des alertes)
 * - JsonStore = implémentation fichiers JSON (servers.json, nodes.json, alerts.json)
 * - Cache mémoire derrière un Mutex, réécriture complète du fichier à chaque mutation
 *
 * Le store ne crée jamais de node ni de serveur : le provisioning est externe.
 */

use crate::models::{Alert, NewAlert, Node, NodeUpdate, Server};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Filtre de lecture des alertes
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    /// true = uniquement les alertes non acquittées
    pub active_only: bool,
    pub limit: Option<usize>,
}

pub trait Store: Send + Sync {
    fn list_servers(&self) -> Result<Vec<Server>, StoreError>;

    fn list_nodes(&self, server_id: &str) -> Result<Vec<Node>, StoreError>;

    fn update_node(&self, node_id: &str, update: &NodeUpdate) -> Result<(), StoreError>;

    fn create_alert(&self, alert: NewAlert) -> Result<Alert, StoreError>;

    /// Alertes triées de la plus récente à la plus ancienne
    fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError>;

    fn acknowledge_alert(&self, alert_id: &str) -> Result<Alert, StoreError>;
}

/// Une collection = un fichier JSON + son cache mémoire
struct JsonCollection<T> {
    path: PathBuf,
    cache: Mutex<Vec<T>>,
}

impl<T: Serialize + DeserializeOwned + Clone> JsonCollection<T> {
    fn open(path: PathBuf) -> Result<Self, StoreError> {
        if !path.exists() {
            fs::write(&path, "[]")?;
        }
        let content = fs::read_to_string(&path)?;
        let items: Vec<T> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&content)?
        };
        Ok(Self { path, cache: Mutex::new(items) })
    }

    fn snapshot(&self) -> Vec<T> {
        self.cache.lock().clone()
    }

    fn save(&self, items: &[T]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

pub struct JsonStore {
    servers: JsonCollection<Server>,
    nodes: JsonCollection<Node>,
    alerts: JsonCollection<Alert>,
}

impl JsonStore {
    /// Ouvre (ou crée) le store dans `data_dir`
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)?;
        let store = Self {
            servers: JsonCollection::open(dir.join("servers.json"))?,
            nodes: JsonCollection::open(dir.join("nodes.json"))?,
            alerts: JsonCollection::open(dir.join("alerts.json"))?,
        };
        info!(
            "[store] opened {:?} ({} servers, {} nodes, {} alerts)",
            dir,
            store.servers.cache.lock().len(),
            store.nodes.cache.lock().len(),
            store.alerts.cache.lock().len()
        );
        Ok(store)
    }
}

impl Store for JsonStore {
    fn list_servers(&self) -> Result<Vec<Server>, StoreError> {
        Ok(self.servers.snapshot())
    }

    fn list_nodes(&self, server_id: &str) -> Result<Vec<Node>, StoreError> {
        Ok(self
            .nodes
            .cache
            .lock()
            .iter()
            .filter(|n| n.server_id == server_id)
            .cloned()
            .collect())
    }

    fn update_node(&self, node_id: &str, update: &NodeUpdate) -> Result<(), StoreError> {
        let mut nodes = self.nodes.cache.lock();
        let idx = nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or_else(|| StoreError::NotFound(format!("node {node_id}")))?;
        let previous = nodes[idx].clone();
        nodes[idx].apply(update);
        if let Err(e) = self.nodes.save(&nodes) {
            nodes[idx] = previous;
            return Err(e);
        }
        Ok(())
    }

    fn create_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let created = Alert {
            id: Uuid::new_v4().to_string(),
            device_id: alert.device_id,
            level: alert.level,
            message: alert.message,
            acknowledged: false,
            created_at: OffsetDateTime::now_utc(),
        };

        let mut alerts = self.alerts.cache.lock();
        alerts.push(created.clone());
        if let Err(e) = self.alerts.save(&alerts) {
            // le cache doit refléter le disque
            alerts.pop();
            return Err(e);
        }
        Ok(created)
    }

    fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError> {
        let mut results: Vec<Alert> = self
            .alerts
            .cache
            .lock()
            .iter()
            .filter(|a| !filter.active_only || !a.acknowledged)
            .cloned()
            .collect();

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn acknowledge_alert(&self, alert_id: &str) -> Result<Alert, StoreError> {
        let mut alerts = self.alerts.cache.lock();
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| StoreError::NotFound(format!("alert {alert_id}")))?;
        alert.acknowledged = true;
        let acked = alert.clone();
        self.alerts.save(&alerts)?;
        Ok(acked)
    }
}
