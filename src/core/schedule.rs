use crate::core::mock_data::{MockDataConfig, MockSynthesizer};
use crate::core::partition::{filter_by_date, flatten, partition};
use crate::domain::model::{DayBuckets, OutageRecord};
use crate::domain::ports::{Clock, OutageSource};
use crate::utils::error::Result;
use chrono::{DateTime, NaiveDate, Utc};

/// Records split around the civil day of `generated_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleView {
    pub generated_at: DateTime<Utc>,
    pub past: Vec<OutageRecord>,
    pub today: Vec<OutageRecord>,
    pub upcoming: Vec<OutageRecord>,
}

impl ScheduleView {
    pub fn all(&self) -> impl Iterator<Item = &OutageRecord> {
        self.past.iter().chain(self.today.iter()).chain(self.upcoming.iter())
    }

    pub fn len(&self) -> usize {
        self.past.len() + self.today.len() + self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, id: &str) -> Option<&OutageRecord> {
        self.all().find(|record| record.id == id)
    }

    pub fn for_locality(&self, slug: &str) -> Vec<&OutageRecord> {
        self.all()
            .filter(|record| record.locality_slug() == slug)
            .collect()
    }

    pub fn on_date(&self, date: NaiveDate) -> Vec<&OutageRecord> {
        filter_by_date(self.all(), date)
    }
}

pub struct ScheduleEngine<S: OutageSource, C: Clock> {
    source: S,
    clock: C,
    mock: MockDataConfig,
}

impl<S: OutageSource, C: Clock> ScheduleEngine<S, C> {
    pub fn new(source: S, clock: C, mock: MockDataConfig) -> Self {
        Self {
            source,
            clock,
            mock,
        }
    }

    /// Latest buckets with mock entries composed in when mock mode is active.
    ///
    /// A feed failure is returned to the caller unless mock mode is active, in
    /// which case the synthetic schedule stands in for the missing data.
    pub async fn load_buckets(&self) -> Result<DayBuckets> {
        let real = match self.source.fetch_latest().await {
            Ok(buckets) => Some(buckets),
            Err(e) if self.mock.is_active() => {
                tracing::warn!("Outage feed unavailable, serving mock data only: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        Ok(MockSynthesizer::new(&self.clock, self.mock).merge_with_mock(real))
    }

    pub async fn load(&self) -> Result<ScheduleView> {
        let now = self.clock.now();
        let dataset = self.load_buckets().await?.into_dataset();
        let records = flatten(Some(&dataset));
        tracing::info!("Loaded {} outage records", records.len());

        let parts = partition(records, &now);
        let owned = |records: Vec<&OutageRecord>| -> Vec<OutageRecord> {
            records.into_iter().cloned().collect()
        };

        Ok(ScheduleView {
            generated_at: now,
            past: owned(parts.before_today),
            today: owned(parts.today),
            upcoming: owned(parts.after_today),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FixedClock;
    use crate::core::mock_data::synthesize;
    use crate::core::time_format::parse_instant;
    use crate::utils::error::OutageError;
    use async_trait::async_trait;

    struct StaticSource(Option<DayBuckets>);

    #[async_trait]
    impl OutageSource for StaticSource {
        async fn fetch_latest(&self) -> Result<DayBuckets> {
            self.0.clone().ok_or_else(|| OutageError::FeedFetchFailed {
                url: "static".to_string(),
                message: "offline".to_string(),
            })
        }
    }

    fn clock() -> FixedClock {
        // 12:00 local on 2024-06-01
        FixedClock::new(parse_instant("2024-06-01T08:00:00Z").unwrap())
    }

    fn mock_on() -> MockDataConfig {
        MockDataConfig {
            development_mode: true,
            mock_data_enabled: true,
        }
    }

    #[tokio::test]
    async fn test_feed_failure_surfaces_without_mock() {
        let engine = ScheduleEngine::new(StaticSource(None), clock(), MockDataConfig::default());
        let err = engine.load().await.unwrap_err();
        assert!(matches!(err, OutageError::FeedFetchFailed { .. }));
    }

    #[tokio::test]
    async fn test_feed_failure_falls_back_to_mock() {
        let engine = ScheduleEngine::new(StaticSource(None), clock(), mock_on());
        let view = engine.load().await.unwrap();
        assert_eq!(view.today.len(), 4);
        assert_eq!(view.upcoming.len(), 5);
        assert!(view.past.is_empty());
    }

    #[tokio::test]
    async fn test_stale_latest_entries_are_classified_as_past() {
        // Buckets published a week earlier: their "today" is our past.
        let stale = synthesize(&parse_instant("2024-05-25T08:00:00Z").unwrap());
        let engine = ScheduleEngine::new(
            StaticSource(Some(stale.clone())),
            clock(),
            MockDataConfig::default(),
        );

        let view = engine.load().await.unwrap();
        assert_eq!(view.past.len(), stale.len());
        assert!(view.today.is_empty());
        assert!(view.upcoming.is_empty());
    }

    #[tokio::test]
    async fn test_lookups() {
        let engine = ScheduleEngine::new(StaticSource(Some(DayBuckets::default())), clock(), mock_on());
        let view = engine.load().await.unwrap();

        let record = view.find("mock-2024-06-02-3").unwrap();
        assert_eq!(record.locality, "Tamarin");
        assert_eq!(view.for_locality("tamarin").len(), 1);
        assert_eq!(
            view.on_date(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()).len(),
            5
        );
        assert!(view.find("missing").is_none());
    }
}
