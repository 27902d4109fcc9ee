//! Forced-update protocol: poll the remote minimum version and, when the running
//! build is too old, tear down client caches and workers and reload.
//!
//! State flow per cycle: `Idle -> Checking -> UpToDate | UpdateRequired`, and
//! `UpdateRequired` always continues to `Reloading`. A failed fetch returns the
//! enforcer to `Idle` and the cycle is skipped.

use crate::domain::model::VersionDescriptor;
use crate::domain::ports::{AnalyticsSink, ClientRuntime, Clock};
use crate::utils::error::{OutageError, Result};
use futures::future::join_all;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use url::Url;

/// Version baked into this build.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const FORCE_UPDATE_EVENT: &str = "pwa-force-update-triggered";
pub const DEFAULT_UPDATE_MESSAGE: &str = "A critical update is required.";
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Numeric, component-wise comparison; missing or non-numeric components count as 0.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|p| p.trim().parse().unwrap_or(0))
            .collect()
    };
    let (left, right) = (parts(a), parts(b));

    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            unequal => return unequal,
        }
    }
    Ordering::Equal
}

pub fn needs_update(build_version: &str, descriptor: &VersionDescriptor) -> bool {
    descriptor.force_update.unwrap_or(false)
        || compare_versions(build_version, &descriptor.min) == Ordering::Less
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Checking,
    UpToDate,
    UpdateRequired { message: String },
    Reloading,
}

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub endpoint: String,
    pub build_version: String,
    pub check_interval: Duration,
    /// Upper bound on a single descriptor request.
    pub timeout: Duration,
    pub development_mode: bool,
}

impl UpdateConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            build_version: APP_VERSION.to_string(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            timeout: DEFAULT_CHECK_TIMEOUT,
            development_mode: false,
        }
    }
}

/// Outcome of the best-effort teardown that precedes a reload.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub workers_unregistered: usize,
    pub caches_deleted: usize,
    pub failures: Vec<OutageError>,
}

pub struct UpdateEnforcer<R, A, C>
where
    R: ClientRuntime,
    A: AnalyticsSink,
    C: Clock,
{
    client: Client,
    config: UpdateConfig,
    runtime: R,
    analytics: A,
    clock: C,
    state: watch::Sender<UpdateState>,
}

impl<R, A, C> UpdateEnforcer<R, A, C>
where
    R: ClientRuntime,
    A: AnalyticsSink,
    C: Clock,
{
    pub fn new(config: UpdateConfig, runtime: R, analytics: A, clock: C) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });
        Self::with_client(client, config, runtime, analytics, clock)
    }

    pub fn with_client(
        client: Client,
        config: UpdateConfig,
        runtime: R,
        analytics: A,
        clock: C,
    ) -> Self {
        let (state, _) = watch::channel(UpdateState::Idle);
        Self {
            client,
            config,
            runtime,
            analytics,
            clock,
            state,
        }
    }

    pub fn state(&self) -> UpdateState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    fn set_state(&self, next: UpdateState) {
        tracing::debug!("Update state -> {:?}", next);
        self.state.send_replace(next);
    }

    fn version_url(&self) -> Result<Url> {
        let mut url =
            Url::parse(&self.config.endpoint).map_err(|e| OutageError::VersionCheckFailed {
                message: format!("invalid endpoint {}: {}", self.config.endpoint, e),
            })?;
        // The random part keeps requests distinct when the clock is pinned.
        let buster = format!(
            "{}-{}",
            self.clock.now().timestamp_millis(),
            fastrand::u32(..)
        );
        url.query_pairs_mut().append_pair("_", &buster);
        Ok(url)
    }

    /// Fetches the descriptor past every intermediate cache.
    pub async fn fetch_descriptor(&self) -> Result<VersionDescriptor> {
        let check_failed = |message: String| OutageError::VersionCheckFailed { message };

        let url = self.version_url()?;
        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| check_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(check_failed(format!("HTTP status {}", response.status())));
        }

        response
            .json::<VersionDescriptor>()
            .await
            .map_err(|e| check_failed(format!("invalid version descriptor: {}", e)))
    }

    /// Runs one check cycle and returns the state it ended in.
    ///
    /// Never fails: fetch or parse errors are logged and the cycle is skipped.
    pub async fn check_for_updates(&self) -> UpdateState {
        self.set_state(UpdateState::Checking);

        let descriptor = match self.fetch_descriptor().await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::warn!("Version check skipped: {}", e);
                self.set_state(UpdateState::Idle);
                return UpdateState::Idle;
            }
        };

        if !needs_update(&self.config.build_version, &descriptor) {
            tracing::debug!(
                "Build {} satisfies minimum {}",
                self.config.build_version,
                descriptor.min
            );
            self.set_state(UpdateState::UpToDate);
            return UpdateState::UpToDate;
        }

        let message = descriptor
            .message
            .clone()
            .unwrap_or_else(|| DEFAULT_UPDATE_MESSAGE.to_string());
        tracing::info!(
            "Forced update required: build {} < minimum {} (force flag: {})",
            self.config.build_version,
            descriptor.min,
            descriptor.force_update.unwrap_or(false)
        );
        self.set_state(UpdateState::UpdateRequired { message });

        if self.config.development_mode {
            tracing::debug!("Development mode: analytics event {} not sent", FORCE_UPDATE_EVENT);
        } else {
            self.analytics.track(
                FORCE_UPDATE_EVENT,
                Some(serde_json::json!({
                    "currentVersion": self.config.build_version,
                    "minVersion": descriptor.min,
                })),
            );
        }

        self.force_update().await;
        UpdateState::Reloading
    }

    /// Unregisters workers and clears caches concurrently, then reloads no matter
    /// how many of those steps failed.
    pub async fn force_update(&self) -> TeardownReport {
        let ((workers, mut worker_failures), (caches, cache_failures)) =
            tokio::join!(self.unregister_workers(), self.clear_caches());

        worker_failures.extend(cache_failures);
        for failure in &worker_failures {
            tracing::warn!("{}", failure);
        }

        let report = TeardownReport {
            workers_unregistered: workers,
            caches_deleted: caches,
            failures: worker_failures,
        };
        tracing::info!(
            "Reloading after teardown: {} workers unregistered, {} caches deleted, {} failures",
            report.workers_unregistered,
            report.caches_deleted,
            report.failures.len()
        );

        self.set_state(UpdateState::Reloading);
        self.runtime.reload().await;
        report
    }

    async fn unregister_workers(&self) -> (usize, Vec<OutageError>) {
        let registrations = match self.runtime.worker_registrations().await {
            Ok(registrations) => registrations,
            Err(e) => return (0, vec![step_failed("list worker registrations", e)]),
        };

        let results = join_all(registrations.iter().map(|registration| async move {
            self.runtime
                .unregister_worker(registration)
                .await
                .map_err(|e| step_failed(&format!("unregister worker {}", registration), e))
        }))
        .await;
        split_results(results)
    }

    async fn clear_caches(&self) -> (usize, Vec<OutageError>) {
        let names = match self.runtime.cache_names().await {
            Ok(names) => names,
            Err(e) => return (0, vec![step_failed("list caches", e)]),
        };

        let results = join_all(names.iter().map(|name| async move {
            self.runtime
                .delete_cache(name)
                .await
                .map_err(|e| step_failed(&format!("delete cache {}", name), e))
        }))
        .await;
        split_results(results)
    }
}

fn step_failed(step: &str, error: OutageError) -> OutageError {
    match error {
        already @ OutageError::ForcedUpdateStepFailed { .. } => already,
        other => OutageError::ForcedUpdateStepFailed {
            step: step.to_string(),
            message: other.to_string(),
        },
    }
}

fn split_results(results: Vec<Result<()>>) -> (usize, Vec<OutageError>) {
    let mut succeeded = 0;
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(()) => succeeded += 1,
            Err(e) => failures.push(e),
        }
    }
    (succeeded, failures)
}

/// Handle to the background check loop. Dropping it cancels the loop.
pub struct PeriodicCheck {
    handle: JoinHandle<()>,
    guard: DropGuard,
}

impl PeriodicCheck {
    pub async fn stop(self) {
        let PeriodicCheck { handle, guard } = self;
        drop(guard);
        if let Err(e) = handle.await {
            tracing::warn!("Version check task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<R, A, C> UpdateEnforcer<R, A, C>
where
    R: ClientRuntime + 'static,
    A: AnalyticsSink + 'static,
    C: Clock + 'static,
{
    /// Checks once immediately, then every `check_interval`, until cancelled or reloading.
    ///
    /// Cancellation also abandons a cycle that is still in flight, so nothing
    /// reaches the runtime once the handle is stopped or dropped.
    pub fn spawn_periodic(self: Arc<Self>) -> PeriodicCheck {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let period = self.config.check_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let outcome = tokio::select! {
                    _ = cancelled.cancelled() => {
                        tracing::debug!("Version check abandoned mid-cycle");
                        self.set_state(UpdateState::Idle);
                        break;
                    }
                    outcome = self.check_for_updates() => outcome,
                };
                if outcome == UpdateState::Reloading {
                    break;
                }
            }
            tracing::debug!("Version check loop stopped");
        });

        PeriodicCheck {
            handle,
            guard: token.drop_guard(),
        }
    }
}
