pub(crate) mod intraday_constants;
pub(crate) mod intraday_model;
pub(crate) mod intraday_repository;
pub(crate) mod intraday_service;
pub(crate) mod intraday_traits;


pub use intraday_constants::*;
pub use intraday_model::{IntradayPoint, IntradayPointDB, NewIntradayPoint, NewIntradayPointDB};
pub use intraday_repository::IntradayRepository;
pub use intraday_service::IntradayService;
pub use intraday_traits::{IntradayRepositoryTrait, IntradayServiceTrait};
