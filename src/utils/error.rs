use crate::domain::model::CategoryFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Response from {url} is not valid UTF-8 text")]
    Decode { url: String },

    #[error("Extraction failed for {context}: {message}")]
    Extraction { context: String, message: String },

    #[error("All assemblers failed: {}", join_failures(.failures))]
    Refresh { failures: Vec<CategoryFailure> },

    #[error("Refresh was cancelled")]
    Cancelled,

    #[error("Background task failed: {message}")]
    TaskError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

fn join_failures(failures: &[CategoryFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClinicError {
    pub fn extraction(context: impl Into<String>, message: impl Into<String>) -> Self {
        ClinicError::Extraction {
            context: context.into(),
            message: message.into(),
        }
    }

    /// 呼叫端可以考慮重試的錯誤
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClinicError::Network { .. } | ClinicError::TaskError { .. })
    }

    /// 給使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            ClinicError::InvalidUrl { url, .. } => format!("The address '{}' is not valid", url),
            ClinicError::Network { .. } => {
                "Could not reach the clinic website. Check your connection and try again".to_string()
            }
            ClinicError::Decode { .. } => "The clinic website returned unreadable data".to_string(),
            ClinicError::Extraction { context, .. } => {
                format!("The clinic website layout changed ({})", context)
            }
            ClinicError::Refresh { .. } => "No clinic data could be loaded".to_string(),
            ClinicError::Cancelled => "Loading was cancelled".to_string(),
            ClinicError::ConfigError { .. }
            | ClinicError::ConfigValidationError { .. }
            | ClinicError::InvalidConfigValueError { .. } => {
                format!("Configuration problem: {}", self)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClinicError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Category;

    #[test]
    fn test_refresh_error_lists_every_category() {
        let err = ClinicError::Refresh {
            failures: vec![
                CategoryFailure {
                    category: Category::Doctors,
                    message: "timeout".to_string(),
                },
                CategoryFailure {
                    category: Category::Services,
                    message: "HTTP 503".to_string(),
                },
            ],
        };

        assert_eq!(
            err.to_string(),
            "All assemblers failed: doctors: timeout; services: HTTP 503"
        );
    }

    #[test]
    fn test_retryable_errors() {
        let network = ClinicError::Network {
            url: "https://example.com".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(network.is_retryable());
        assert!(!ClinicError::Cancelled.is_retryable());
        assert!(!ClinicError::Decode {
            url: "https://example.com".to_string()
        }
        .is_retryable());
    }
}
