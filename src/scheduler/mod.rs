pub(crate) mod scheduler_config;
pub(crate) mod scheduler_service;
pub(crate) mod scheduler_status;

#[cfg(test)]
mod scheduler_service_tests;

pub use scheduler_config::SchedulerConfig;
pub use scheduler_service::SchedulerService;
pub use scheduler_status::{SchedulerPhase, SchedulerStatus, StatusHandle};
