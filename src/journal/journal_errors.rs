use diesel::result::Error as DieselError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JournalError>;

/// Custom error type for adjustment-journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<DieselError> for JournalError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => JournalError::NotFound("Record not found".to_string()),
            _ => JournalError::DatabaseError(err.to_string()),
        }
    }
}

impl From<JournalError> for String {
    fn from(error: JournalError) -> Self {
        error.to_string()
    }
}
