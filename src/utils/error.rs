use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutageError {
    #[error("Invalid instant '{value}': {reason}")]
    InvalidInstant { value: String, reason: String },

    #[error("Outage feed fetch failed for {url}: {message}")]
    FeedFetchFailed { url: String, message: String },

    #[error("Sun time lookup failed: {message}")]
    SunTimeLookupFailed { message: String },

    #[error("Version check failed: {message}")]
    VersionCheckFailed { message: String },

    #[error("Forced update step '{step}' failed: {message}")]
    ForcedUpdateStepFailed { step: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OutageError {
    /// Failures with a safe default are `Low`; the binary exits cleanly on them.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OutageError::SunTimeLookupFailed { .. }
            | OutageError::VersionCheckFailed { .. }
            | OutageError::ForcedUpdateStepFailed { .. } => ErrorSeverity::Low,
            OutageError::FeedFetchFailed { .. } => ErrorSeverity::Medium,
            OutageError::InvalidInstant { .. } | OutageError::ValidationError { .. } => {
                ErrorSeverity::High
            }
            OutageError::IoError(_)
            | OutageError::ConfigError { .. }
            | OutageError::InvalidConfigValueError { .. }
            | OutageError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            OutageError::InvalidInstant { .. } => {
                "Use an RFC 3339 timestamp such as 2024-06-01T04:00:00Z"
            }
            OutageError::FeedFetchFailed { .. } => {
                "Check network connectivity and the [feed] base_url setting, then retry"
            }
            OutageError::SunTimeLookupFailed { .. } => {
                "Default sun times are used until the lookup succeeds"
            }
            OutageError::VersionCheckFailed { .. } => {
                "The check is retried on the next cycle"
            }
            OutageError::ForcedUpdateStepFailed { .. } => {
                "The reload still proceeds; stale caches are dropped on next start"
            }
            OutageError::IoError(_) => "Check file paths and permissions",
            OutageError::ConfigError { .. }
            | OutageError::InvalidConfigValueError { .. }
            | OutageError::MissingConfigError { .. } => "Fix the configuration file and retry",
            OutageError::ValidationError { .. } => "Check the input values",
        }
    }

    pub(crate) fn invalid_instant(value: &str, reason: impl std::fmt::Display) -> Self {
        OutageError::InvalidInstant {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OutageError>;
