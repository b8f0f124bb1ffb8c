use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status}: {message}")]
    ApiStatusError { status: u16, message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("SAM_API_KEY is not set")]
    MissingApiKey,

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::ApiStatusError { .. } => ErrorCategory::Network,
            EtlError::MissingApiKey
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // Transport failures and throttling are retryable.
            EtlError::ApiError(_) => ErrorSeverity::Medium,
            EtlError::ApiStatusError { status, .. } => {
                if *status == 429 || *status >= 500 {
                    ErrorSeverity::Medium
                } else {
                    ErrorSeverity::High
                }
            }
            EtlError::MissingApiKey
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorSeverity::High,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::ZipError(_) => ErrorSeverity::High,
            EtlError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ApiError(e) => format!("Could not reach the SAM.gov API: {}", e),
            EtlError::ApiStatusError { status, .. } => match *status {
                401 | 403 => "The SAM.gov API rejected the API key.".to_string(),
                429 => "The SAM.gov API is rate limiting this key.".to_string(),
                _ => format!("The SAM.gov API returned HTTP {}.", status),
            },
            EtlError::MissingApiKey => "No SAM.gov API key was provided.".to_string(),
            EtlError::MissingConfigError { field } => {
                format!("Required setting '{}' is missing.", field)
            }
            EtlError::InvalidConfigValueError { field, value, .. } => {
                format!("Setting '{}' has an invalid value: '{}'.", field, value)
            }
            EtlError::ConfigValidationError { field, message } => {
                format!("Configuration problem in '{}': {}", field, message)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ApiError(_) => {
                "Check the network connection and the API endpoint, then run again.".to_string()
            }
            EtlError::ApiStatusError { status, .. } => match *status {
                401 | 403 => {
                    "Verify SAM_API_KEY. Keys are issued under Account Details at https://sam.gov."
                        .to_string()
                }
                429 => "Wait a few minutes before retrying, or raise the page delay.".to_string(),
                _ if *status >= 500 => {
                    "SAM.gov is having trouble; retry later or configure retry_attempts."
                        .to_string()
                }
                _ => "Check the search parameters against the API documentation.".to_string(),
            },
            EtlError::MissingApiKey => {
                "Set SAM_API_KEY in the environment or a .env file, or pass --api-key.".to_string()
            }
            EtlError::MissingConfigError { field }
            | EtlError::ConfigValidationError { field, .. } => {
                format!("Fix '{}' in the configuration and run again.", field)
            }
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("{} (setting: '{}')", reason, field)
            }
            EtlError::IoError(_) => {
                "Check that the output path exists and is writable.".to_string()
            }
            _ => "Run with --verbose for details.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
