pub mod event_log_repository;
pub mod memory_repository;
pub mod postgres_event_log_repository;
pub mod postgres_signup_repository;
pub mod signup_repository;
