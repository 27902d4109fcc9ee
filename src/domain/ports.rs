use crate::domain::model::DayBuckets;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of "now" for every temporal computation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[async_trait]
pub trait OutageSource: Send + Sync {
    /// Latest `{today, future}` buckets. Failures surface as `FeedFetchFailed`.
    async fn fetch_latest(&self) -> Result<DayBuckets>;
}

pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &str, props: Option<serde_json::Value>);
}

/// The host client whose caches and background workers are torn down on a forced update.
#[async_trait]
pub trait ClientRuntime: Send + Sync {
    async fn worker_registrations(&self) -> Result<Vec<String>>;
    async fn unregister_worker(&self, registration: &str) -> Result<()>;
    async fn cache_names(&self) -> Result<Vec<String>>;
    async fn delete_cache(&self, name: &str) -> Result<()>;
    /// Hard reload. The host is expected to restart after this.
    async fn reload(&self);
}
