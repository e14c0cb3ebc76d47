pub mod child_process;
pub mod whisper_cli;
