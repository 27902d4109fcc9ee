pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{FixedClock, HeadlessRuntime, SystemClock, TracingAnalytics};
pub use config::toml_config::AppConfig;
pub use core::{
    calendar::CalendarExporter,
    feed::{FeedEndpoints, HttpOutageFeed},
    mock_data::{MockDataConfig, MockSynthesizer},
    schedule::{ScheduleEngine, ScheduleView},
    sun_times::{SunTimeService, SunTimesConfig},
    update::{UpdateConfig, UpdateEnforcer, UpdateState},
};
pub use utils::error::{OutageError, Result};
