pub mod job_key;
