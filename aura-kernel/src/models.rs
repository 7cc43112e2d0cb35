use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Passerelle matérielle locale (provisionnée hors du kernel, lecture seule ici)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub address: String, // host:port sur le LAN
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Online => f.write_str("online"),
            NodeStatus::Offline => f.write_str("offline"),
        }
    }
}

/// Copie locale d'un device géré par un serveur matériel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    pub node_id: String, // identifiant côté matériel (clé des lectures live)
    pub name: String,
    pub server_id: String,
    pub status: NodeStatus,
    pub state: String,
    pub temperature: Option<f64>,
}

impl Node {
    pub fn apply(&mut self, update: &NodeUpdate) {
        self.status = update.status;
        self.state = update.state.clone();
        self.temperature = update.temperature;
    }
}

/// Lecture live renvoyée par GET /api/v1/nodes (jamais persistée)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveNodeReading {
    pub node_id: String,
    pub status: NodeStatus,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeUpdate {
    pub status: NodeStatus,
    pub state: String,
    pub temperature: Option<f64>,
}

impl From<&LiveNodeReading> for NodeUpdate {
    fn from(reading: &LiveNodeReading) -> Self {
        Self {
            status: reading.status,
            state: reading.state.clone(),
            temperature: reading.temperature,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Normal,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Normal => f.write_str("normal"),
            AlertLevel::Critical => f.write_str("critical"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub device_id: Option<String>,
    pub level: AlertLevel,
    pub message: String,
    pub acknowledged: bool,
    pub created_at: OffsetDateTime,
}

/// Ce que le kernel demande au store de créer
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub device_id: Option<String>,
    pub level: AlertLevel,
    pub message: String,
}

impl NewAlert {
    pub fn critical(device_id: Option<String>, message: impl Into<String>) -> Self {
        Self { device_id, level: AlertLevel::Critical, message: message.into() }
    }

    pub fn normal(device_id: Option<String>, message: impl Into<String>) -> Self {
        Self { device_id, level: AlertLevel::Normal, message: message.into() }
    }
}
