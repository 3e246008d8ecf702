pub(crate) mod watchlist_model;
pub(crate) mod watchlist_repository;
pub(crate) mod watchlist_service;
pub(crate) mod watchlist_traits;


pub use watchlist_model::{WatchlistItem, WatchlistItemDB};
pub use watchlist_repository::WatchlistRepository;
pub use watchlist_service::WatchlistService;
pub use watchlist_traits::{WatchlistRepositoryTrait, WatchlistServiceTrait};
