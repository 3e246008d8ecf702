pub(crate) mod market_data_errors;
pub(crate) mod market_data_model;
pub(crate) mod market_data_traits;

pub use market_data_errors::MarketDataError;
pub use market_data_model::{
    normalize_constituent_code, ConstituentQuote, HoldingWeight, HoldingsDisclosure,
    IndicativeQuote, OfficialPrice, ProfileData,
};
pub use market_data_traits::{ProfileProvider, QuoteProvider};
