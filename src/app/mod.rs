pub mod catalog_service;
pub mod counter_service;
pub mod event_router;
pub mod publish_scheduler;
pub mod runtime;
