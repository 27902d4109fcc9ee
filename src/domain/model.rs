use crate::core::slug::generate_slug;
use crate::utils::error::{OutageError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum District {
    BlackRiver,
    Flacq,
    GrandPort,
    Moka,
    Pamplemousses,
    #[serde(rename = "plainewilhems")]
    PlainesWilhems,
    PortLouis,
    RiviereDuRempart,
    Savanne,
    Rodrigues,
}

impl District {
    pub const ALL: [District; 10] = [
        District::BlackRiver,
        District::Flacq,
        District::GrandPort,
        District::Moka,
        District::Pamplemousses,
        District::PlainesWilhems,
        District::PortLouis,
        District::RiviereDuRempart,
        District::Savanne,
        District::Rodrigues,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            District::BlackRiver => "Black River",
            District::Flacq => "Flacq",
            District::GrandPort => "Grand Port",
            District::Moka => "Moka",
            District::Pamplemousses => "Pamplemousses",
            District::PlainesWilhems => "Plaines Wilhems",
            District::PortLouis => "Port Louis",
            District::RiviereDuRempart => "Riviere du Rempart",
            District::Savanne => "Savanne",
            District::Rodrigues => "Rodrigues",
        }
    }
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One scheduled outage window for a locality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageRecord {
    pub id: String,
    /// Civil date as published by the feed, `YYYY-MM-DD`.
    pub date: String,
    pub locality: String,
    #[serde(
        rename = "localitySlug",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub precomputed_slug: Option<String>,
    pub streets: String,
    pub district: District,
    #[serde(rename = "from")]
    pub start: DateTime<Utc>,
    #[serde(rename = "to")]
    pub end: DateTime<Utc>,
}

impl OutageRecord {
    pub fn new(
        id: impl Into<String>,
        date: impl Into<String>,
        locality: impl Into<String>,
        streets: impl Into<String>,
        district: District,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self> {
        let id = id.into();
        if start >= end {
            return Err(OutageError::ValidationError {
                message: format!(
                    "record {}: start {} must precede end {}",
                    id,
                    start.to_rfc3339(),
                    end.to_rfc3339()
                ),
            });
        }

        let locality = locality.into();
        Ok(Self {
            id,
            date: date.into(),
            precomputed_slug: Some(generate_slug(&locality)),
            locality,
            streets: streets.into(),
            district,
            start,
            end,
        })
    }

    /// The feed's slug when it ships one, otherwise derived from the locality name.
    pub fn locality_slug(&self) -> String {
        match &self.precomputed_slug {
            Some(slug) if !slug.is_empty() => slug.clone(),
            _ => generate_slug(&self.locality),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }
}

/// Records grouped under an arbitrary key (usually a civil date).
///
/// A `BTreeMap` keeps flattening deterministic; group order carries no meaning.
pub type Dataset = BTreeMap<String, Vec<OutageRecord>>;

/// The `{ today, future }` shape served by the latest feed and by the mock synthesizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayBuckets {
    #[serde(default)]
    pub today: Vec<OutageRecord>,
    #[serde(default)]
    pub future: Vec<OutageRecord>,
}

impl DayBuckets {
    pub fn is_empty(&self) -> bool {
        self.today.is_empty() && self.future.is_empty()
    }

    pub fn len(&self) -> usize {
        self.today.len() + self.future.len()
    }

    pub fn into_dataset(self) -> Dataset {
        let mut dataset = Dataset::new();
        dataset.insert("today".to_string(), self.today);
        dataset.insert("future".to_string(), self.future);
        dataset
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    /// Decimal hours in `[0, 24)`, e.g. 6.25 for 6:15 AM.
    pub sunrise: f64,
    pub sunset: f64,
    pub sunrise_formatted: String,
    pub sunset_formatted: String,
    pub golden_hour: String,
    pub day_length: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    pub current: String,
    pub min: String,
    #[serde(default)]
    pub force_update: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}
