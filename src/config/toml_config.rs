use crate::core::feed::{FeedEndpoints, DEFAULT_FEED_BASE};
use crate::core::mock_data::MockDataConfig;
use crate::core::sun_times::{SunLocation, SunTimesConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_SUN_API};
use crate::core::update::{UpdateConfig, APP_VERSION};
use crate::utils::error::{OutageError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub feed: FeedSection,
    pub mock: MockSection,
    pub sun_times: SunTimesSection,
    pub version_check: VersionCheckSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// Build version compared against the remote minimum.
    pub version: String,
    pub development_mode: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            version: APP_VERSION.to_string(),
            development_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSection {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_BASE.to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MockSection {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SunTimesSection {
    pub endpoint: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub cache_capacity: usize,
    pub timeout_seconds: u64,
}

impl Default for SunTimesSection {
    fn default() -> Self {
        let location = SunLocation::default();
        Self {
            endpoint: DEFAULT_SUN_API.to_string(),
            latitude: location.latitude,
            longitude: location.longitude,
            timezone: location.timezone,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionCheckSection {
    /// Location of the `{ current, min, forceUpdate?, message? }` descriptor.
    pub endpoint: Option<String>,
    pub interval_seconds: u64,
    pub timeout_seconds: u64,
}

impl Default for VersionCheckSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            interval_seconds: 60 * 60,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub format: LogFormat,
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OutageError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| OutageError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_dotted_version("app.version", &self.app.version)?;

        validation::validate_url("feed.base_url", &self.feed.base_url)?;
        validation::validate_positive_number("feed.timeout_seconds", self.feed.timeout_seconds, 1)?;

        validation::validate_url("sun_times.endpoint", &self.sun_times.endpoint)?;
        validation::validate_range("sun_times.latitude", self.sun_times.latitude, -90.0, 90.0)?;
        validation::validate_range("sun_times.longitude", self.sun_times.longitude, -180.0, 180.0)?;
        validation::validate_non_empty_string("sun_times.timezone", &self.sun_times.timezone)?;
        validation::validate_positive_number(
            "sun_times.cache_capacity",
            self.sun_times.cache_capacity as u64,
            1,
        )?;

        if let Some(endpoint) = &self.version_check.endpoint {
            validation::validate_url("version_check.endpoint", endpoint)?;
        }
        validation::validate_positive_number(
            "version_check.interval_seconds",
            self.version_check.interval_seconds,
            1,
        )?;
        validation::validate_positive_number(
            "version_check.timeout_seconds",
            self.version_check.timeout_seconds,
            1,
        )?;

        Ok(())
    }

    pub fn mock_config(&self) -> MockDataConfig {
        MockDataConfig {
            development_mode: self.app.development_mode,
            mock_data_enabled: self.mock.enabled,
        }
    }

    pub fn feed_endpoints(&self) -> FeedEndpoints {
        FeedEndpoints::new(self.feed.base_url.clone())
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed.timeout_seconds)
    }

    pub fn sun_times_config(&self) -> SunTimesConfig {
        SunTimesConfig {
            endpoint: self.sun_times.endpoint.clone(),
            location: SunLocation {
                latitude: self.sun_times.latitude,
                longitude: self.sun_times.longitude,
                timezone: self.sun_times.timezone.clone(),
            },
            cache_capacity: self.sun_times.cache_capacity,
            timeout: Duration::from_secs(self.sun_times.timeout_seconds),
        }
    }

    pub fn update_config(&self) -> Result<UpdateConfig> {
        let endpoint =
            validation::validate_required_field("version_check.endpoint", &self.version_check.endpoint)?;
        Ok(UpdateConfig {
            endpoint: endpoint.clone(),
            build_version: self.app.version.clone(),
            check_interval: Duration::from_secs(self.version_check.interval_seconds),
            timeout: Duration::from_secs(self.version_check.timeout_seconds),
            development_mode: self.app.development_mode,
        })
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
