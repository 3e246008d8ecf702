pub mod db;

pub mod constants;
pub mod errors;
pub mod schema;

pub mod instruments;
pub mod intraday;
pub mod journal;
pub mod ledger;
pub mod market_data;
pub mod portfolio;
pub mod scheduler;
pub mod snapshot;
pub mod trading_calendar;
pub mod utils;
pub mod valuation;
pub mod watchlist;

pub use errors::{Error, Result};

pub use journal::*;
pub use snapshot::*;
