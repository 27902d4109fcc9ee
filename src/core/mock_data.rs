//! Synthetic outage schedule for development when the real feed is thin or down.
//!
//! Output depends only on the civil date and hour of "now", so two runs inside
//! the same hour produce identical records.

use crate::core::slug::generate_slug;
use crate::core::time_format::{civil_date, civil_hour, to_civil};
use crate::domain::model::{DayBuckets, District, OutageRecord};
use crate::domain::ports::Clock;
use chrono::{DateTime, Days, NaiveDate, Timelike, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockDataConfig {
    pub development_mode: bool,
    pub mock_data_enabled: bool,
}

impl MockDataConfig {
    /// Both flags are required; either one alone leaves real data untouched.
    pub fn is_active(&self) -> bool {
        self.development_mode && self.mock_data_enabled
    }
}

struct Window {
    start_hour: u32,
    end_hour: u32,
    district: District,
    locality: &'static str,
    streets: &'static str,
    index: u32,
}

const TOMORROW: [Window; 5] = [
    Window {
        start_hour: 9,
        end_hour: 12,
        district: District::Pamplemousses,
        locality: "Pamplemousses",
        streets: "Route Royale, Rue des Jardins, Avenue SSR",
        index: 1,
    },
    Window {
        start_hour: 10,
        end_hour: 14,
        district: District::GrandPort,
        locality: "Mahebourg",
        streets: "Rue des Hollandais, Rue de la Passe, Waterfront Road",
        index: 2,
    },
    Window {
        start_hour: 13,
        end_hour: 16,
        district: District::BlackRiver,
        locality: "Tamarin",
        streets: "Coastal Road, Avenue des Salines, Rue Manioc",
        index: 3,
    },
    Window {
        start_hour: 15,
        end_hour: 18,
        district: District::Savanne,
        locality: "Souillac",
        streets: "Route Royale, Rue du Port, Avenue Telfair",
        index: 4,
    },
    Window {
        start_hour: 8,
        end_hour: 11,
        district: District::RiviereDuRempart,
        locality: "Goodlands",
        streets: "Rue Paul et Virginie, Avenue Antelme, Impasse Desroches",
        index: 5,
    },
];

fn mock_id(date: NaiveDate, index: u32) -> String {
    format!("mock-{}-{}", date.format("%Y-%m-%d"), index)
}

fn create_outage(date: NaiveDate, window: &Window) -> OutageRecord {
    OutageRecord {
        id: mock_id(date, window.index),
        date: date.format("%Y-%m-%d").to_string(),
        locality: window.locality.to_string(),
        precomputed_slug: Some(generate_slug(window.locality)),
        streets: window.streets.to_string(),
        district: window.district,
        start: civil_hour(date, window.start_hour),
        end: civil_hour(date, window.end_hour),
    }
}

fn today_windows(current_hour: u32) -> Vec<Window> {
    let mut windows = Vec::new();

    // Already finished.
    if current_hour > 10 {
        windows.push(Window {
            start_hour: 8,
            end_hour: 10,
            district: District::PortLouis,
            locality: "Port Louis",
            streets: "Rue Royale, Rue La Corderie, Rue Desforges",
            index: 1,
        });
    }

    // Straddles the current hour.
    if (9..17).contains(&current_hour) {
        windows.push(Window {
            start_hour: current_hour - 1,
            end_hour: current_hour + 2,
            district: District::PlainesWilhems,
            locality: "Curepipe",
            streets: "Royal Road, Avenue Victoria, Rue Pope Hennessy, Impasse des Lilas",
            index: 2,
        });
    }

    if current_hour < 20 {
        let start_hour = (current_hour + 2).max(14);
        windows.push(Window {
            start_hour,
            end_hour: start_hour + 3,
            district: District::Moka,
            locality: "Moka",
            streets: "Avenue Belle Rose, Rue Gustave Colin, Cite EDC",
            index: 3,
        });
    }

    if current_hour < 18 {
        let start_hour = (current_hour + 4).max(16);
        windows.push(Window {
            start_hour,
            end_hour: start_hour + 2,
            district: District::Flacq,
            locality: "Centre de Flacq",
            streets: "Rue Centrale, Avenue de la Gare, Impasse des Bambous",
            index: 4,
        });
    }

    windows
}

/// Today's panel depends on the civil hour of `now`; tomorrow's is fixed.
pub fn synthesize(now: &DateTime<Utc>) -> DayBuckets {
    let today = civil_date(now);
    let tomorrow = today + Days::new(1);
    let current_hour = to_civil(now).hour();

    DayBuckets {
        today: today_windows(current_hour)
            .iter()
            .map(|window| create_outage(today, window))
            .collect(),
        future: TOMORROW
            .iter()
            .map(|window| create_outage(tomorrow, window))
            .collect(),
    }
}

pub struct MockSynthesizer<C: Clock> {
    clock: C,
    config: MockDataConfig,
}

impl<C: Clock> MockSynthesizer<C> {
    pub fn new(clock: C, config: MockDataConfig) -> Self {
        Self { clock, config }
    }

    pub fn config(&self) -> MockDataConfig {
        self.config
    }

    pub fn generate(&self) -> DayBuckets {
        synthesize(&self.clock.now())
    }

    /// Mock entries go ahead of real ones in each bucket; nothing is deduplicated.
    pub fn merge_with_mock(&self, real: Option<DayBuckets>) -> DayBuckets {
        if !self.config.is_active() {
            return real.unwrap_or_default();
        }

        let mock = self.generate();
        tracing::debug!(
            "Mock data active: adding {} today / {} future synthetic outages",
            mock.today.len(),
            mock.future.len()
        );

        match real {
            None => mock,
            Some(real) => DayBuckets {
                today: mock.today.into_iter().chain(real.today).collect(),
                future: mock.future.into_iter().chain(real.future).collect(),
            },
        }
    }
}
