pub mod speed_ratio_repository;
pub mod speed_record;
pub mod speed_test_config_key;
pub mod speed_test_result;
pub mod time_estimate;
