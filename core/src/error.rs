use thiserror::Error;

#[derive(Error, Debug)]
pub enum CohortError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid month '{value}': expected YYYY-MM")]
    InvalidMonth { value: String },

    #[error("Invalid range: end month {end} is before start month {start}")]
    InvalidRange { start: String, end: String },

    #[error("Unknown metric '{value}': expected 'investors' or 'aum'")]
    UnknownMetric { value: String },

    #[error("{record} record for user '{user_id}' is missing required field '{field}'")]
    MissingField {
        record: &'static str,
        user_id: String,
        field: &'static str,
    },

    #[error("{record} record for user '{user_id}' is invalid: {reason}")]
    InvalidRecord {
        record: &'static str,
        user_id: String,
        reason: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CohortResult<T> = Result<T, CohortError>;
