use crate::domain::model::{Dataset, DayBuckets, OutageRecord};
use crate::domain::ports::OutageSource;
use crate::utils::error::{OutageError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_FEED_BASE: &str =
    "https://raw.githubusercontent.com/MrSunshyne/mauritius-dataset-electricity/main/data/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    base: String,
}

impl FeedEndpoints {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self { base }
    }

    pub fn full(&self) -> String {
        format!("{}power-outages.json", self.base)
    }

    pub fn latest(&self) -> String {
        format!("{}power-outages.latest.json", self.base)
    }

    pub fn daily(&self, date: NaiveDate) -> String {
        format!("{}daily/{}.json", self.base, date.format("%Y-%m-%d"))
    }

    pub fn locality(&self, slug: &str) -> String {
        format!("{}localities/{}.json", self.base, slug)
    }
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_BASE)
    }
}

/// The feed publishes either grouped records or a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedPayload {
    Flat(Vec<OutageRecord>),
    Grouped(Dataset),
}

impl FeedPayload {
    fn into_dataset(self) -> Dataset {
        match self {
            FeedPayload::Grouped(dataset) => dataset,
            FeedPayload::Flat(records) => {
                let mut dataset = Dataset::new();
                for record in records {
                    dataset.entry(record.date.clone()).or_default().push(record);
                }
                dataset
            }
        }
    }
}

fn drop_ill_formed(records: Vec<OutageRecord>) -> Vec<OutageRecord> {
    records
        .into_iter()
        .filter(|record| {
            let ok = record.is_well_formed();
            if !ok {
                tracing::warn!("Dropping outage {} with start not before end", record.id);
            }
            ok
        })
        .collect()
}

pub struct HttpOutageFeed {
    client: Client,
    endpoints: FeedEndpoints,
}

impl HttpOutageFeed {
    pub fn new(endpoints: FeedEndpoints, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        });
        Self::with_client(client, endpoints)
    }

    pub fn with_client(client: Client, endpoints: FeedEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn endpoints(&self) -> &FeedEndpoints {
        &self.endpoints
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let fetch_failed = |message: String| OutageError::FeedFetchFailed {
            url: url.to_string(),
            message,
        };

        tracing::debug!("Making feed request to: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        tracing::debug!("Feed response status: {}", response.status());
        if !response.status().is_success() {
            return Err(fetch_failed(format!("HTTP status {}", response.status())));
        }

        // Served as text/plain by some hosts, so decode the body ourselves.
        let body = response
            .text()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| fetch_failed(format!("invalid payload: {}", e)))
    }

    /// The whole published history, grouped by key.
    pub async fn fetch_dataset(&self) -> Result<Dataset> {
        let payload: FeedPayload = self.fetch_json(&self.endpoints.full()).await?;
        Ok(payload
            .into_dataset()
            .into_iter()
            .map(|(key, records)| (key, drop_ill_formed(records)))
            .collect())
    }

    pub async fn fetch_daily(&self, date: NaiveDate) -> Result<Vec<OutageRecord>> {
        let payload: FeedPayload = self.fetch_json(&self.endpoints.daily(date)).await?;
        Ok(drop_ill_formed(
            payload.into_dataset().into_values().flatten().collect(),
        ))
    }

    pub async fn fetch_locality(&self, slug: &str) -> Result<Vec<OutageRecord>> {
        let payload: FeedPayload = self.fetch_json(&self.endpoints.locality(slug)).await?;
        Ok(drop_ill_formed(
            payload.into_dataset().into_values().flatten().collect(),
        ))
    }
}

#[async_trait]
impl OutageSource for HttpOutageFeed {
    async fn fetch_latest(&self) -> Result<DayBuckets> {
        let buckets: DayBuckets = self.fetch_json(&self.endpoints.latest()).await?;
        Ok(DayBuckets {
            today: drop_ill_formed(buckets.today),
            future: drop_ill_formed(buckets.future),
        })
    }
}
