use thiserror::Error;

/// 使用者操作被拒絕的原因。在任何狀態改變前回報，使用者修正後可重試
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    #[error("No participant with id '{id}'")]
    UnknownParticipant { id: String },

    #[error("Participant '{evaluator_id}' has already submitted an evaluation")]
    AlreadySubmitted { evaluator_id: String },

    #[error("You can select maximum {max} group members")]
    GroupFull { max: usize },

    #[error("You must include yourself in the group")]
    SelfRemovalBlocked,

    #[error("Group has {size} members, expected between {min} and {max}")]
    GroupSizeOutOfBounds { size: usize, min: usize, max: usize },

    #[error("The evaluator must be part of the selected group")]
    EvaluatorNotSelected,

    #[error("Please provide a rating for {participant_name}")]
    MissingRating { participant_name: String },

    #[error("Rating {value} is not on the rating scale")]
    RatingNotInScale { value: f64 },

    #[error("Participant '{id}' is not in the selected group")]
    RatingForNonMember { id: String },

    #[error("Participant '{id}' is not in the selected group; their comment would be lost")]
    CommentForNonMember { id: String },

    #[error("No evaluation data to export")]
    NothingToExport,

    #[error("This action needs explicit confirmation")]
    ConfirmationRequired,
}

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Data unavailable ({source_name}): {message}")]
    DataUnavailable { source_name: String, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("Ledger was modified by another writer since it was read")]
    LedgerConflict,

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Data,
    Validation,
    Storage,
    Configuration,
    Network,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// CLI 的退出碼。任何錯誤都不會以 0 結束，Low 與 High 同樣回傳 1。
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low | ErrorSeverity::High => 1, // 處理錯誤
            ErrorSeverity::Medium => 2,                    // 使用者可修正後重試
            ErrorSeverity::Critical => 3,                  // 系統或資料來源錯誤
        }
    }
}

impl EvalError {
    pub fn data_unavailable(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        EvalError::DataUnavailable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EvalError::DataUnavailable { .. } => ErrorCategory::Data,
            EvalError::Validation(_) => ErrorCategory::Validation,
            EvalError::LedgerConflict | EvalError::IoError(_) | EvalError::ZipError(_) => {
                ErrorCategory::Storage
            }
            EvalError::HttpError(_) => ErrorCategory::Network,
            EvalError::ConfigError { .. }
            | EvalError::InvalidConfigValueError { .. }
            | EvalError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EvalError::CsvError(_)
            | EvalError::SerializationError(_)
            | EvalError::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EvalError::Validation(ValidationFailure::NothingToExport) => ErrorSeverity::Low,
            EvalError::Validation(_) | EvalError::LedgerConflict => ErrorSeverity::Medium,
            EvalError::DataUnavailable { .. } | EvalError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, EvalError::Validation(_))
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EvalError::DataUnavailable { source_name, .. } => format!(
                "Failed to initialize application: could not load {}",
                source_name
            ),
            EvalError::Validation(failure) => failure.to_string(),
            EvalError::LedgerConflict => {
                "Another session saved an evaluation at the same time. Nothing was saved."
                    .to_string()
            }
            EvalError::HttpError(_) => "Could not reach the data source".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EvalError::DataUnavailable { .. } => {
                "Check that students.csv and config.json exist and are well-formed"
            }
            EvalError::Validation(ValidationFailure::AlreadySubmitted { .. }) => {
                "Each participant can submit only once; contact the instructor to reset"
            }
            EvalError::Validation(ValidationFailure::ConfirmationRequired) => {
                "Re-run the command with --yes"
            }
            EvalError::Validation(_) => "Correct the input and try again",
            EvalError::LedgerConflict => "Retry the submission",
            EvalError::HttpError(_) => "Check the source URL and your network connection",
            EvalError::ConfigError { .. }
            | EvalError::InvalidConfigValueError { .. }
            | EvalError::MissingConfigError { .. } => "Fix the configuration and try again",
            _ => "Re-run with --verbose for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_are_medium_severity() {
        let err: EvalError = ValidationFailure::SelfRemovalBlocked.into();
        assert!(err.is_validation());
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.user_friendly_message(), "You must include yourself in the group");
    }

    #[test]
    fn every_error_exits_non_zero() {
        let nothing: EvalError = ValidationFailure::NothingToExport.into();
        assert_eq!(nothing.severity(), ErrorSeverity::Low);
        assert_eq!(nothing.severity().exit_code(), 1);

        assert_eq!(ErrorSeverity::Medium.exit_code(), 2);
        assert_eq!(ErrorSeverity::High.exit_code(), 1);
        assert_eq!(ErrorSeverity::Critical.exit_code(), 3);
    }

    #[test]
    fn data_unavailable_is_critical() {
        let err = EvalError::data_unavailable("students.csv", "file not found");
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.to_string().contains("students.csv"));
    }
}
