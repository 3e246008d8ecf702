use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketDataError>;

/// Errors surfaced by quote/profile adapters.
///
/// These are always recoverable from the caller's point of view: the
/// valuation router degrades to the next tier and the settlement engine
/// leaves the row pending for a later retry.
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
