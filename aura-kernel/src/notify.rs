//! Notifications immédiates pour les alertes critiques.
//!
//! Best-effort : un échec est remonté à l'appelant qui se contente de le logger.

use crate::config::MqttConf;
use async_trait::async_trait;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde::Serialize;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{info, warn};

pub const CRITICAL_ALERT_TOPIC: &str = "aura/alerts/critical@v1";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("publish failed: {0}")]
    Publish(#[from] rumqttc::ClientError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_immediate(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct CriticalNotification<'a> {
    title: &'a str,
    body: &'a str,
    timestamp: String,
}

/// Publie les notifications sur le broker MQTT (les apps mobiles sont abonnées au topic)
pub struct MqttNotifier {
    client: AsyncClient,
}

impl MqttNotifier {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }

    /// Crée le client + spawn la boucle d'events (reconnexion auto par rumqttc)
    pub fn connect(conf: &MqttConf) -> Self {
        let mut opts = MqttOptions::new("aura-kernel-notify", &conf.host, conf.port);
        opts.set_keep_alive(Duration::from_secs(15));
        let (client, mut eventloop) = AsyncClient::new(opts, 10);

        tokio::spawn(async move {
            loop {
                if let Err(e) = eventloop.poll().await {
                    warn!("[notify] MQTT error: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        });

        info!("[notify] publishing critical alerts to {}:{} on {}", conf.host, conf.port, CRITICAL_ALERT_TOPIC);
        Self::new(client)
    }
}

#[async_trait]
impl Notifier for MqttNotifier {
    async fn send_immediate(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let timestamp = OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        let payload = serde_json::to_vec(&CriticalNotification { title, body, timestamp })?;
        // jamais d'attente sur la file du client : broker down + file pleine = erreur immédiate
        self.client
            .try_publish(CRITICAL_ALERT_TOPIC, QoS::AtLeastOnce, false, payload)?;
        Ok(())
    }
}

/// Fallback sans broker : la notification finit dans les logs
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_immediate(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        warn!("[notify] {title}: {body}");
        Ok(())
    }
}
