pub mod json_speed_ratio_store;
