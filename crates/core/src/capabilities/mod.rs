pub mod capability_probe;
pub mod domain;
pub mod infrastructure;
