use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Missing input: {source_name} ({reason})")]
    MissingInput { source_name: String, reason: String },

    #[error("Schema mismatch in {source_name}: {message}")]
    SchemaMismatch { source_name: String, message: String },

    #[error("Invalid argument '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("Invalid scenario '{scenario}': {reason}")]
    InvalidScenario { scenario: String, reason: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Request,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

pub type Result<T> = std::result::Result<T, FlowError>;

impl FlowError {
    pub fn missing_input(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MissingInput {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn schema_mismatch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_scenario(scenario: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidScenario {
            scenario: scenario.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingInput { .. } | Self::SchemaMismatch { .. } | Self::CsvError(_) => {
                ErrorCategory::Input
            }
            Self::InvalidArgument { .. } | Self::InvalidScenario { .. } => ErrorCategory::Request,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    /// 決定 CLI 退出碼
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidArgument { .. } => ErrorSeverity::Low,
            Self::InvalidScenario { .. } => ErrorSeverity::Medium,
            Self::MissingInput { .. }
            | Self::SchemaMismatch { .. }
            | Self::CsvError(_)
            | Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::High,
            Self::IoError(_) | Self::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::MissingInput { source_name, .. } => format!(
                "Check that '{}' exists and contains at least one data row",
                source_name
            ),
            Self::SchemaMismatch { .. } => {
                "Check the [columns] section of the config against the CSV header".to_string()
            }
            Self::InvalidArgument { .. } => {
                "Use direction=incoming|outgoing and a positive integer limit".to_string()
            }
            Self::InvalidScenario { .. } => {
                "Fix the scenario in [[export.scenarios]]; other scenarios are unaffected"
                    .to_string()
            }
            Self::CsvError(_) => "Make sure the input file is valid UTF-8 CSV".to_string(),
            Self::IoError(_) => "Check file paths and permissions".to_string(),
            Self::SerializationError(_) => "Report this as a bug".to_string(),
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Make sure the config file exists and is valid TOML format".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Input data problem: {}", self),
            ErrorCategory::Request => format!("Bad request: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}
