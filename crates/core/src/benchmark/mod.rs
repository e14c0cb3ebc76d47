pub mod domain;
pub mod infrastructure;
pub mod speed_benchmark;
pub mod speed_test_use_case;
