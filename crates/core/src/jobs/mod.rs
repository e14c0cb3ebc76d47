pub mod domain;
pub mod job_registry;
