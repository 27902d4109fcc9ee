use crate::adapters::{FixedClock, SystemClock};
use crate::config::toml_config::AppConfig;
use crate::core::calendar::DEFAULT_ICS_FILENAME;
use crate::core::time_format::{parse_civil_date, parse_instant};
use crate::domain::ports::Clock;
use crate::utils::error::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Parser)]
#[command(name = "outage-schedule")]
#[command(about = "Scheduled power outages for Mauritius: schedule, calendar export, sun times")]
pub struct CliConfig {
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Pin the clock to an RFC 3339 instant")]
    pub now: Option<String>,

    #[arg(long, global = true, help = "Run in development mode")]
    pub dev: bool,

    #[arg(long, global = true, help = "Enable mock outage data (development mode only)")]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show today's, upcoming and past outages
    Schedule {
        #[arg(long, help = "Only list outages starting on this date (YYYY-MM-DD)")]
        date: Option<String>,
    },
    /// Export one outage as an iCalendar document
    Ics {
        id: String,
        #[arg(
            long,
            num_args = 0..=1,
            default_missing_value = DEFAULT_ICS_FILENAME,
            help = "Write to this file instead of stdout (power-outage.ics when no path is given)"
        )]
        output: Option<PathBuf>,
        #[arg(long, help = "Reference URL to embed in the event")]
        url: Option<String>,
    },
    /// Print a Google Calendar link for one outage
    CalendarLink {
        id: String,
        #[arg(long, help = "Reference URL to append to the details")]
        url: Option<String>,
    },
    /// Sunrise and sunset for a date
    Sun {
        #[arg(long, help = "Date (YYYY-MM-DD), defaults to today")]
        date: Option<String>,
    },
    /// Compare this build against the remote minimum version
    CheckVersion,
}

impl CliConfig {
    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn load_app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };

        if self.dev {
            config.app.development_mode = true;
        }
        if self.mock {
            config.mock.enabled = true;
        }
        Ok(config)
    }

    pub fn clock(&self) -> Result<Arc<dyn Clock>> {
        match &self.now {
            Some(instant) => Ok(Arc::new(FixedClock::new(parse_instant(instant)?))),
            None => Ok(Arc::new(SystemClock)),
        }
    }
}

pub fn parse_date_arg(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value.map(parse_civil_date).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let cli = CliConfig::parse_from(["outage-schedule", "--dev", "--mock", "schedule"]);
        let config = cli.load_app_config().unwrap();
        assert!(config.mock_config().is_active());
    }

    #[test]
    fn test_fixed_clock_from_flag() {
        let cli = CliConfig::parse_from([
            "outage-schedule",
            "--now",
            "2024-06-01T08:00:00Z",
            "sun",
        ]);
        let now = cli.clock().unwrap().now();
        assert_eq!(now, parse_instant("2024-06-01T08:00:00Z").unwrap());

        let bad = CliConfig::parse_from(["outage-schedule", "--now", "noon", "sun"]);
        assert!(bad.clock().is_err());
    }

    #[test]
    fn test_ics_output_defaults_to_suggested_filename() {
        let output = |args: &[&str]| match CliConfig::parse_from(args).command {
            Command::Ics { output, .. } => output,
            other => panic!("unexpected command {:?}", other),
        };

        assert_eq!(output(&["outage-schedule", "ics", "r1"]), None);
        assert_eq!(
            output(&["outage-schedule", "ics", "r1", "--output"]),
            Some(PathBuf::from(DEFAULT_ICS_FILENAME))
        );
        assert_eq!(
            output(&["outage-schedule", "ics", "r1", "--output", "cal/outage.ics"]),
            Some(PathBuf::from("cal/outage.ics"))
        );
    }

    #[test]
    fn test_parse_date_arg() {
        assert_eq!(parse_date_arg(None).unwrap(), None);
        assert_eq!(
            parse_date_arg(Some("2024-06-02")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 2)
        );
        assert!(parse_date_arg(Some("02/06/2024")).is_err());
    }
}
