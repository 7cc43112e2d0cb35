//! Aura Sync kernel: synchronisation des statuts matériels et alertes.
//!
//! Un cycle de sync interroge chaque serveur matériel, compare les lectures
//! live au cache local des nodes et lève des alertes sur les transitions
//! (offline, surchauffe, température haute).

pub mod alerts;
pub mod config;
pub mod health;
pub mod http;
pub mod models;
pub mod notify;
pub mod reconcile;
pub mod store;
pub mod sync;
pub mod telemetry;

pub use alerts::AlertEmitter;
pub use config::{SyncConfig, Thresholds};
pub use store::{JsonStore, Store};
pub use sync::{spawn_sync_loop, CycleReport, ServerOutcome, SyncService};
pub use telemetry::{FetchError, HttpTelemetry, TelemetrySource};
