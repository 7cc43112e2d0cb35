/**
 * RECONCILER - Diff entre lectures live et cache local des nodes
 *
 * RÔLE :
 * Pour un serveur, compare chaque lecture live au node en cache, décide des
 * alertes à lever et produit la mise à jour du cache.
 *
 * RÈGLES (par node matché, sur transition uniquement) :
 * 1. passage à offline                              → critical "has gone offline"
 * 2. température franchit le seuil critique          → critical "Overheating"
 * 3. sinon, température franchit le seuil d'alerte   → normal "High temp warning"
 * La règle 1 est indépendante des règles 2/3.
 *
 * Le franchissement se juge sur la valeur en cache (cycle précédent) : un node
 * qui reste au-dessus d'un seuil ne déclenche qu'une seule alerte.
 *
 * Fonction pure : aucune I/O, le cycle de sync persiste le résultat.
 */

use crate::config::Thresholds;
use crate::models::{LiveNodeReading, NewAlert, Node, NodeStatus, NodeUpdate, Server};
use std::collections::HashMap;

/// Mise à jour à persister pour un node (par id local)
#[derive(Debug, Clone, PartialEq)]
pub struct NodeChange {
    pub node_id: String,
    pub update: NodeUpdate,
}

#[derive(Debug, Default)]
pub struct Reconciliation {
    pub alerts: Vec<NewAlert>,
    pub changes: Vec<NodeChange>,
    /// Lectures sans node correspondant en cache
    pub skipped: Vec<String>,
}

pub fn reconcile(
    server: &Server,
    cached: &[Node],
    live: &[LiveNodeReading],
    thresholds: &Thresholds,
) -> Reconciliation {
    // copie de travail : une lecture en double se compare à l'état produit par la précédente
    let mut by_hw_id: HashMap<&str, Node> = cached
        .iter()
        .filter(|n| n.server_id == server.id)
        .map(|n| (n.node_id.as_str(), n.clone()))
        .collect();

    let mut out = Reconciliation::default();

    for reading in live {
        let Some(node) = by_hw_id.get_mut(reading.node_id.as_str()) else {
            out.skipped.push(reading.node_id.clone());
            continue;
        };

        out.alerts.extend(evaluate(node, reading, thresholds));

        let update = NodeUpdate::from(reading);
        node.apply(&update);
        out.changes.push(NodeChange { node_id: node.id.clone(), update });
    }

    out
}

/// Alertes déclenchées par une lecture par rapport à l'état en cache
pub fn evaluate(previous: &Node, reading: &LiveNodeReading, thresholds: &Thresholds) -> Vec<NewAlert> {
    let mut alerts = Vec::new();
    let device = Some(previous.id.clone());

    if reading.status == NodeStatus::Offline && previous.status != NodeStatus::Offline {
        alerts.push(NewAlert::critical(
            device.clone(),
            format!("Device '{}' has gone offline.", previous.name),
        ));
    }

    if let Some(temp) = reading.temperature {
        if crossed(previous.temperature, temp, thresholds.critical_temp_c) {
            alerts.push(NewAlert::critical(
                device,
                format!("Overheating in '{}'. Temp: {}°C.", previous.name, temp),
            ));
        } else if crossed(previous.temperature, temp, thresholds.warning_temp_c) {
            alerts.push(NewAlert::normal(
                device,
                format!("High temp warning for '{}'. Temp: {}°C.", previous.name, temp),
            ));
        }
    }

    alerts
}

/// `current >= threshold` alors que la valeur précédente était en dessous.
/// Pas de valeur précédente = en dessous de tout seuil.
fn crossed(previous: Option<f64>, current: f64, threshold: f64) -> bool {
    current >= threshold && previous.map_or(true, |p| p < threshold)
}
