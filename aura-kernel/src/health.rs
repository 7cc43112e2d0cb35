use crate::sync::{CycleReport, ServerOutcome};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Serialize)]
pub struct SyncHealth {
    pub uptime_seconds: u64,
    pub cycles_completed: u64,
    pub alerts_raised_total: u64,
    pub last_cycle_at: Option<String>, // RFC3339
    pub last_cycle_duration_ms: Option<u64>,
    pub last_cycle_servers_ok: Option<usize>,
    pub last_cycle_servers_failed: Option<usize>,
    pub memory_usage_mb: f32,
}

/// Résumé du dernier cycle, seul état conservé entre deux cycles
#[derive(Debug, Clone)]
struct LastCycle {
    finished_at: String,
    duration_ms: u64,
    servers_ok: usize,
    servers_failed: usize,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    cycles_completed: Arc<AtomicU64>,
    alerts_raised: Arc<AtomicU64>,
    last_cycle: Arc<Mutex<Option<LastCycle>>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            cycles_completed: Arc::new(AtomicU64::new(0)),
            alerts_raised: Arc::new(AtomicU64::new(0)),
            last_cycle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn record_cycle(&self, report: &CycleReport) {
        let alerts: usize = report
            .servers
            .iter()
            .map(|s| match &s.outcome {
                ServerOutcome::Synced { alerts_raised, .. } => *alerts_raised,
                ServerOutcome::Failed { alert_raised, .. } => usize::from(*alert_raised),
            })
            .sum();

        let duration = report.finished_at - report.started_at;
        let summary = LastCycle {
            finished_at: report.finished_at.format(&Rfc3339).unwrap_or_default(),
            duration_ms: duration.whole_milliseconds().max(0) as u64,
            servers_ok: report.servers_ok(),
            servers_failed: report.servers_failed(),
        };

        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.alerts_raised.fetch_add(alerts as u64, Ordering::Relaxed);
        *self.last_cycle.lock() = Some(summary);
    }

    pub fn get_health(&self) -> SyncHealth {
        let last = self.last_cycle.lock().clone();
        SyncHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            alerts_raised_total: self.alerts_raised.load(Ordering::Relaxed),
            last_cycle_at: last.as_ref().map(|l| l.finished_at.clone()),
            last_cycle_duration_ms: last.as_ref().map(|l| l.duration_ms),
            last_cycle_servers_ok: last.as_ref().map(|l| l.servers_ok),
            last_cycle_servers_failed: last.as_ref().map(|l| l.servers_failed),
            memory_usage_mb: get_memory_usage_mb(),
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if let Some(rest) = line.strip_prefix("VmRSS:") {
                    if let Some(Ok(kb)) = rest.split_whitespace().next().map(str::parse::<u64>) {
                        return (kb as f32) / 1024.0;
                    }
                }
            }
        }
    }

    0.0
}
