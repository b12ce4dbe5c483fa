//! Shared server state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Local};
use fanline_core::api::{Pipeline, RunControl};

/// Shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub runs: RunRegistry,
    pub stats: Arc<RwLock<ServerStats>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            runs: RunRegistry::default(),
            stats: Arc::new(RwLock::new(ServerStats::new())),
        }
    }
}

/// Cancellation handles of runs still in progress, by run id.
#[derive(Clone, Default)]
pub struct RunRegistry {
    inner: Arc<Mutex<HashMap<String, RunControl>>>,
}

impl RunRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, RunControl>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, run_id: String, control: RunControl) {
        self.lock().insert(run_id, control);
    }

    pub fn get(&self, run_id: &str) -> Option<RunControl> {
        self.lock().get(run_id).cloned()
    }

    pub fn remove(&self, run_id: &str) -> Option<RunControl> {
        self.lock().remove(run_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ServerStats {
    pub runs_started: u64,
    pub start_time: DateTime<Local>,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            runs_started: 0,
            start_time: Local::now(),
        }
    }

    pub fn uptime_seconds(&self) -> f64 {
        let now = Local::now();
        (now - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_stats_new() {
        let stats = ServerStats::new();
        assert_eq!(stats.runs_started, 0);
        assert!(stats.uptime_seconds() < 1.0);
    }

    #[test]
    fn registry_shares_controls() {
        let runs = RunRegistry::default();
        let control = RunControl::new();
        runs.insert("r1".into(), control.clone());
        assert_eq!(runs.len(), 1);

        runs.get("r1").unwrap().cancel_all();
        assert!(control.is_cancelled());

        assert!(runs.remove("r1").is_some());
        assert!(runs.is_empty());
        assert!(runs.get("r1").is_none());
    }
}
