use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaterfallError {
    #[error("Revenue SKU not found: {sku_id}")]
    RevenueSkuNotFound { sku_id: String },

    #[error("Revenue SKU {sku_id} has no linked COGS SKU")]
    CogsLinkNotFound { sku_id: String },

    #[error("COGS SKU {cogs_sku_id} (linked from {sku_id}) has no schedule rows")]
    CogsScheduleNotFound { sku_id: String, cogs_sku_id: String },

    #[error("Catalog request failed with status {status}: {message}")]
    UpstreamFailure { status: u16, message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Upstream,
    Output,
    Configuration,
    Input,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl WaterfallError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RevenueSkuNotFound { .. }
            | Self::CogsLinkNotFound { .. }
            | Self::CogsScheduleNotFound { .. } => ErrorCategory::NotFound,
            Self::UpstreamFailure { .. } | Self::ApiError(_) => ErrorCategory::Upstream,
            Self::ZipError(_) | Self::CsvError(_) | Self::IoError(_) => ErrorCategory::Output,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::ValidationError { .. } | Self::SerializationError(_) => ErrorCategory::Input,
            Self::ProcessingError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::NotFound | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Output | ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// 是否為「找不到」類錯誤 (對外應回報為 not found)
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::RevenueSkuNotFound { sku_id } => {
                format!("Check that revenue SKU '{}' exists in the catalog", sku_id)
            }
            Self::CogsLinkNotFound { sku_id } => {
                format!("Link a COGS SKU to revenue SKU '{}' (cogs_sku_id)", sku_id)
            }
            Self::CogsScheduleNotFound { cogs_sku_id, .. } => {
                format!("Add cogs_breakdown rows for COGS SKU '{}'", cogs_sku_id)
            }
            Self::UpstreamFailure { status, .. } if *status == 401 || *status == 403 => {
                "Verify catalog.api_key".to_string()
            }
            Self::UpstreamFailure { .. } | Self::ApiError(_) => {
                "Check catalog.endpoint and network connectivity, then retry".to_string()
            }
            Self::ZipError(_) | Self::IoError(_) | Self::CsvError(_) => {
                "Check that output.output_path is writable".to_string()
            }
            Self::SerializationError(_) => "Check the JSON input file format".to_string(),
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => {
                "Fix the configuration file and run again".to_string()
            }
            Self::ValidationError { .. } => "Fix the scenario request and run again".to_string(),
            Self::ProcessingError { .. } => "Re-run with --verbose and report the log".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::NotFound => format!("Not found: {}", self),
            ErrorCategory::Upstream => format!("Catalog unavailable: {}", self),
            ErrorCategory::Output => format!("Could not write report: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Input => format!("Invalid request: {}", self),
            ErrorCategory::Internal => format!("Unexpected failure: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, WaterfallError>;
