// Adapters layer: concrete implementations of the domain ports for a headless host.

use crate::domain::ports::{AnalyticsSink, ClientRuntime, Clock};
use crate::utils::error::{OutageError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

/// Emits analytics events as structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn track(&self, event: &str, props: Option<serde_json::Value>) {
        match props {
            Some(props) => tracing::info!(event, %props, "analytics event"),
            None => tracing::info!(event, "analytics event"),
        }
    }
}

/// In-process stand-in for a client with named caches and background workers.
#[derive(Debug, Default)]
pub struct HeadlessRuntime {
    workers: Mutex<Vec<String>>,
    caches: Mutex<Vec<String>>,
    reloaded: AtomicBool,
}

impl HeadlessRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(workers: Vec<String>, caches: Vec<String>) -> Self {
        Self {
            workers: Mutex::new(workers),
            caches: Mutex::new(caches),
            reloaded: AtomicBool::new(false),
        }
    }

    pub fn reload_requested(&self) -> bool {
        self.reloaded.load(Ordering::SeqCst)
    }

    fn remove(list: &Mutex<Vec<String>>, what: &str, name: &str) -> Result<()> {
        let mut entries = list.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match entries.iter().position(|entry| entry == name) {
            Some(index) => {
                entries.remove(index);
                Ok(())
            }
            None => Err(OutageError::ValidationError {
                message: format!("no {} named {}", what, name),
            }),
        }
    }

    fn snapshot(list: &Mutex<Vec<String>>) -> Vec<String> {
        list.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ClientRuntime for HeadlessRuntime {
    async fn worker_registrations(&self) -> Result<Vec<String>> {
        Ok(Self::snapshot(&self.workers))
    }

    async fn unregister_worker(&self, registration: &str) -> Result<()> {
        tracing::debug!("Unregistering worker {}", registration);
        Self::remove(&self.workers, "worker", registration)
    }

    async fn cache_names(&self) -> Result<Vec<String>> {
        Ok(Self::snapshot(&self.caches))
    }

    async fn delete_cache(&self, name: &str) -> Result<()> {
        tracing::debug!("Deleting cache {}", name);
        Self::remove(&self.caches, "cache", name)
    }

    async fn reload(&self) {
        tracing::info!("Reload requested; restart the client to pick up the new build");
        self.reloaded.store(true, Ordering::SeqCst);
    }
}
