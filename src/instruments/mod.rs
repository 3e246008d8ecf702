pub(crate) mod instruments_constants;
pub(crate) mod instruments_model;
pub(crate) mod instruments_repository;
pub(crate) mod instruments_service;
pub(crate) mod instruments_traits;


pub use instruments_constants::*;
pub use instruments_model::{guess_passively_tracked, InstrumentProfile, InstrumentProfileDB};
pub use instruments_repository::InstrumentsRepository;
pub use instruments_service::InstrumentsService;
pub use instruments_traits::{InstrumentsRepositoryTrait, InstrumentsServiceTrait};
