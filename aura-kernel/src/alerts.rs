//! Émission des alertes : persistance + notification immédiate si critique.
//!
//! Aucune erreur ne remonte : un échec d'écriture ou d'envoi est loggé et le
//! cycle de sync continue avec les autres nodes.

use crate::models::{Alert, AlertLevel, NewAlert};
use crate::notify::Notifier;
use crate::store::Store;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct AlertEmitter {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    notification_title: String,
}

impl AlertEmitter {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, notification_title: &str) -> Self {
        Self { store, notifier, notification_title: notification_title.to_string() }
    }

    /// Retourne l'alerte créée, ou None si la persistance a échoué
    pub async fn emit(&self, alert: NewAlert) -> Option<Alert> {
        let created = match self.store.create_alert(alert.clone()) {
            Ok(created) => created,
            Err(e) => {
                error!("[alerts] failed to record alert \"{}\": {}", alert.message, e);
                return None;
            }
        };
        info!("[alerts] {} alert recorded: {}", created.level, created.message);

        if created.level == AlertLevel::Critical {
            if let Err(e) = self.notifier.send_immediate(&self.notification_title, &created.message).await {
                warn!("[alerts] notification failed for alert {}: {}", created.id, e);
            }
        }

        Some(created)
    }
}
