//! Day-relative classification of outage records.
//!
//! A record belongs to the civil day in which its window *starts*; a window
//! that runs past midnight still counts for the day it began.

use crate::core::time_format::{civil_date, civil_day_start, civil_midnight};
use crate::domain::model::{Dataset, OutageRecord};
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;

/// All records of a dataset in group order; an absent dataset is empty.
pub fn flatten(dataset: Option<&Dataset>) -> Vec<&OutageRecord> {
    match dataset {
        Some(groups) => groups.values().flatten().collect(),
        None => Vec::new(),
    }
}

fn day_relation(record: &OutageRecord, boundary: DateTime<Utc>) -> Ordering {
    civil_day_start(&record.start).cmp(&boundary)
}

fn filter_by_relation<'a, I>(
    records: I,
    now: &DateTime<Utc>,
    wanted: Ordering,
) -> Vec<&'a OutageRecord>
where
    I: IntoIterator<Item = &'a OutageRecord>,
{
    let boundary = civil_day_start(now);
    records
        .into_iter()
        .filter(|record| day_relation(record, boundary) == wanted)
        .collect()
}

pub fn filter_today<'a, I>(records: I, now: &DateTime<Utc>) -> Vec<&'a OutageRecord>
where
    I: IntoIterator<Item = &'a OutageRecord>,
{
    filter_by_relation(records, now, Ordering::Equal)
}

pub fn filter_after_today<'a, I>(records: I, now: &DateTime<Utc>) -> Vec<&'a OutageRecord>
where
    I: IntoIterator<Item = &'a OutageRecord>,
{
    filter_by_relation(records, now, Ordering::Greater)
}

pub fn filter_before_today<'a, I>(records: I, now: &DateTime<Utc>) -> Vec<&'a OutageRecord>
where
    I: IntoIterator<Item = &'a OutageRecord>,
{
    filter_by_relation(records, now, Ordering::Less)
}

pub fn filter_by_date<'a, I>(records: I, date: NaiveDate) -> Vec<&'a OutageRecord>
where
    I: IntoIterator<Item = &'a OutageRecord>,
{
    let boundary = civil_midnight(date);
    records
        .into_iter()
        .filter(|record| day_relation(record, boundary) == Ordering::Equal)
        .collect()
}

/// Single-pass split into the three disjoint day buckets.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DayPartition<'a> {
    pub before_today: Vec<&'a OutageRecord>,
    pub today: Vec<&'a OutageRecord>,
    pub after_today: Vec<&'a OutageRecord>,
}

impl<'a> DayPartition<'a> {
    pub fn len(&self) -> usize {
        self.before_today.len() + self.today.len() + self.after_today.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn partition<'a, I>(records: I, now: &DateTime<Utc>) -> DayPartition<'a>
where
    I: IntoIterator<Item = &'a OutageRecord>,
{
    let boundary = civil_day_start(now);
    let mut buckets = DayPartition::default();
    for record in records {
        match day_relation(record, boundary) {
            Ordering::Less => buckets.before_today.push(record),
            Ordering::Equal => buckets.today.push(record),
            Ordering::Greater => buckets.after_today.push(record),
        }
    }

    tracing::debug!(
        "Partitioned {} records around {}: {} before, {} today, {} after",
        buckets.len(),
        civil_date(now),
        buckets.before_today.len(),
        buckets.today.len(),
        buckets.after_today.len()
    );
    buckets
}
