//! Error types for migration operations.

use thiserror::Error;

/// Migration-specific errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Failed to authenticate with a platform.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A project, repository or resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded on a platform API.
    #[error("Rate limit exceeded{}", retry_after_suffix(.0))]
    RateLimited(Option<u64>),

    /// Network-level failure (connection, DNS, TLS).
    #[error("Network error: {0}")]
    NetworkError(String),

    /// An operation exceeded its configured timeout.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// API request failed with an unexpected status.
    #[error("API request failed: {0}")]
    ApiError(String),

    /// Payload rejected by the platform.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to clone the source repository.
    #[error("Git clone failed: {0}")]
    GitCloneFailed(String),

    /// Failed to push to the target repository.
    #[error("Git push failed: {0}")]
    GitPushFailed(String),

    /// All retry attempts were exhausted.
    #[error("Operation failed after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<MigrationError>,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

fn retry_after_suffix(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(", retry after {secs} seconds"),
        None => String::new(),
    }
}

/// How an error should be treated by [`crate::retry::RetryPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retrying cannot help; propagate immediately.
    Permanent,
    /// Worth retrying with backoff.
    Transient,
}

impl MigrationError {
    /// Classify this error for retry purposes.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::AuthenticationFailed(_)
            | Self::NotFound(_)
            | Self::ValidationError(_)
            | Self::InvalidConfig(_)
            | Self::JsonError(_)
            | Self::YamlError(_)
            | Self::RetryExhausted { .. } => FailureKind::Permanent,
            Self::RateLimited(_)
            | Self::NetworkError(_)
            | Self::Timeout(_)
            | Self::ApiError(_)
            | Self::GitCloneFailed(_)
            | Self::GitPushFailed(_)
            | Self::IoError(_)
            | Self::HttpError(_) => FailureKind::Transient,
        }
    }

    /// True when retrying this error has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_classification() {
        assert_eq!(
            MigrationError::AuthenticationFailed("bad token".into()).kind(),
            FailureKind::Permanent
        );
        assert_eq!(
            MigrationError::NotFound("repo".into()).kind(),
            FailureKind::Permanent
        );
        assert_eq!(
            MigrationError::ValidationError("title required".into()).kind(),
            FailureKind::Permanent
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(MigrationError::RateLimited(Some(30)).is_transient());
        assert!(MigrationError::NetworkError("connection reset".into()).is_transient());
        assert!(MigrationError::Timeout("git clone".into()).is_transient());
    }

    #[test]
    fn test_retry_exhausted_is_not_retried_again() {
        let err = MigrationError::RetryExhausted {
            attempts: 3,
            source: Box::new(MigrationError::RateLimited(None)),
        };
        assert_eq!(err.kind(), FailureKind::Permanent);
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn test_rate_limited_display() {
        assert_eq!(
            MigrationError::RateLimited(Some(42)).to_string(),
            "Rate limit exceeded, retry after 42 seconds"
        );
        assert_eq!(
            MigrationError::RateLimited(None).to_string(),
            "Rate limit exceeded"
        );
    }
}
