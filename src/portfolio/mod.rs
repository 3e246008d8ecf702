pub(crate) mod history_service;
pub(crate) mod portfolio_model;
pub(crate) mod portfolio_service;
pub(crate) mod portfolio_traits;


pub use history_service::HistoryService;
pub use portfolio_model::{
    HistoryPoint, PortfolioHistoryPoint, PortfolioTotals, PriceSource, RealtimePositionView,
    RealtimeView,
};
pub use portfolio_service::PortfolioService;
pub use portfolio_traits::{HistoryServiceTrait, PortfolioServiceTrait};
