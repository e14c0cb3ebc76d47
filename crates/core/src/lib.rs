pub mod benchmark;
pub mod capabilities;
pub mod jobs;
pub mod library;
pub mod media;
pub mod shared;
pub mod tool;
pub mod transcription;

#[cfg(test)]
pub(crate) mod test_support;
