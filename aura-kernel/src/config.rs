use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid thresholds: {0}")]
    Thresholds(String),
    #[error("invalid setting: {0}")]
    Setting(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub data_dir: String,
    pub sync_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub node_status_path: String,
    pub notification_title: String,
    pub thresholds: Thresholds,
    pub mqtt: Option<MqttConf>,
    pub http: HttpConf,
}

/// Seuils de température (°C), comparés en `>=` au passage depuis `<`
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Thresholds {
    pub critical_temp_c: f64,
    pub warning_temp_c: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConf {
    pub bind: String,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { critical_temp_c: 95.0, warning_temp_c: 80.0 }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.critical_temp_c.is_finite() || !self.warning_temp_c.is_finite() {
            return Err(ConfigError::Thresholds("thresholds must be finite numbers".into()));
        }
        if self.warning_temp_c >= self.critical_temp_c {
            return Err(ConfigError::Thresholds(format!(
                "warningTempC ({}) must be below criticalTempC ({})",
                self.warning_temp_c, self.critical_temp_c
            )));
        }
        Ok(())
    }
}

impl Default for HttpConf {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".into() }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
            sync_interval_secs: 30,
            fetch_timeout_secs: 5,
            node_status_path: "/api/v1/nodes".into(),
            notification_title: "Aura Critical Alert".into(),
            thresholds: Thresholds::default(),
            mqtt: None,
            http: HttpConf::default(),
        }
    }
}

impl SyncConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        if self.sync_interval_secs == 0 {
            return Err(ConfigError::Setting("sync_interval_secs must be > 0".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Setting("fetch_timeout_secs must be > 0".into()));
        }
        if !self.node_status_path.starts_with('/') {
            return Err(ConfigError::Setting("node_status_path must start with '/'".into()));
        }
        Ok(())
    }

    /// Parse + valide un document YAML (vide = config par défaut)
    pub fn from_yaml(txt: &str) -> Result<Self, ConfigError> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: SyncConfig = serde_yaml::from_str(txt)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

pub async fn load_config() -> SyncConfig {
    let path = std::env::var("AURA_SYNC_CONFIG").unwrap_or_else(|_| "aura.yaml".into());
    load_config_from(Path::new(&path)).await
}

async fn load_config_from(path: &Path) -> SyncConfig {
    if !path.exists() {
        info!("[config] no {}, using defaults", path.display());
        return SyncConfig::default();
    }
    let txt = match fs::read_to_string(path).await {
        Ok(txt) => txt,
        Err(e) => {
            warn!("[config] cannot read {} ({e}), using defaults", path.display());
            return SyncConfig::default();
        }
    };
    SyncConfig::from_yaml(&txt).unwrap_or_else(|e| {
        warn!("[config] {} rejected ({e}), using defaults", path.display());
        SyncConfig::default()
    })
}
