use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CashFlowError {
    #[error("Ledger is missing required column(s): {}", .missing.join(", "))]
    SchemaError { missing: Vec<String> },

    #[error("Row {row}, column '{column}': {details}")]
    RowParseError {
        row: usize,
        column: String,
        details: String,
    },

    #[error("Duplicate date {0} in ledger: each week must appear once")]
    DuplicateDateError(NaiveDate),

    #[error("Ledger contains no data rows")]
    EmptyLedgerError,

    #[error("Invalid month key '{0}': expected YYYY-MM")]
    InvalidMonthKey(String),

    #[error("Invalid analysis configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CashFlowError>;

/// Failures of the external recommendation collaborator. These never escape the
/// analysis; they are logged and turned into "no recommendation".
#[derive(Error, Debug)]
pub enum RecommendationError {
    #[error("Recommendation request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Recommendation provider unavailable: {0}")]
    Unavailable(String),

    #[error("Recommendation API error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Recommendation transport error: {0}")]
    Transport(String),

    #[error("Recommendation provider returned an empty response")]
    EmptyResponse,
}

impl RecommendationError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RecommendationError::Timeout(_) | RecommendationError::Transport(_) => true,
            RecommendationError::Http { status, .. } => *status == 429 || *status >= 500,
            RecommendationError::Unavailable(_) | RecommendationError::EmptyResponse => false,
        }
    }
}

#[cfg(feature = "llm")]
impl From<reqwest::Error> for RecommendationError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RecommendationError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None if err.is_timeout() => {
                RecommendationError::Transport(format!("request timed out: {}", err))
            }
            None => RecommendationError::Transport(err.to_string()),
        }
    }
}
