pub mod caption_use_case;
pub mod parallel_scheduler;
pub mod transcription_runner;
