/**
 * AURA KERNEL - Point d'entrée du service de synchronisation
 *
 * RÔLE : Bootstrap config, store, notifications, télémétrie, boucle de sync et API statut.
 * Le store et le notifier sont construits ici puis injectés dans le SyncService.
 */

use anyhow::{Context, Result};
use aura_kernel::config::load_config;
use aura_kernel::health::HealthTracker;
use aura_kernel::http::{build_router, AppState};
use aura_kernel::notify::{LogNotifier, MqttNotifier, Notifier};
use aura_kernel::{spawn_sync_loop, AlertEmitter, HttpTelemetry, JsonStore, Store, SyncService};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config().await;

    let store: Arc<dyn Store> = Arc::new(
        JsonStore::open(&cfg.data_dir).with_context(|| format!("failed to open store in {}", cfg.data_dir))?,
    );

    let notifier: Arc<dyn Notifier> = match &cfg.mqtt {
        Some(mqtt) => Arc::new(MqttNotifier::connect(mqtt)),
        None => {
            info!("[kernel] no mqtt broker configured, critical alerts go to the log");
            Arc::new(LogNotifier)
        }
    };

    let telemetry = HttpTelemetry::new(cfg.fetch_timeout(), &cfg.node_status_path)
        .context("failed to build telemetry client")?;

    let health = HealthTracker::new();
    let emitter = AlertEmitter::new(store.clone(), notifier, &cfg.notification_title);
    let service = SyncService::new(store.clone(), Arc::new(telemetry), emitter, cfg.thresholds)
        .with_health_tracker(health.clone());

    let _sync = spawn_sync_loop(Arc::new(service), cfg.sync_interval());

    let app = build_router(AppState { store, health });
    let listener = TcpListener::bind(cfg.http.bind.as_str())
        .await
        .with_context(|| format!("failed to bind {}", cfg.http.bind))?;
    info!("[kernel] listening on http://{}", cfg.http.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
