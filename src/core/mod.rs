pub mod calendar;
pub mod feed;
pub mod mock_data;
pub mod partition;
pub mod schedule;
pub mod slug;
pub mod sun_times;
pub mod time_format;
pub mod update;

pub use crate::domain::model::{
    CalendarEvent, Dataset, DayBuckets, District, OutageRecord, SunTimes, VersionDescriptor,
};
pub use crate::domain::ports::{AnalyticsSink, ClientRuntime, Clock, OutageSource};
pub use crate::utils::error::Result;
