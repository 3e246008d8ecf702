use diesel::result::Error as DieselError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Custom error type for daily-ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// SETTLED is terminal; writing official figures twice is a bug upstream.
    #[error("Already settled: {0}")]
    AlreadySettled(String),
}

impl From<DieselError> for LedgerError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => LedgerError::NotFound("Record not found".to_string()),
            _ => LedgerError::DatabaseError(err.to_string()),
        }
    }
}

impl From<LedgerError> for String {
    fn from(error: LedgerError) -> Self {
        error.to_string()
    }
}
