pub mod whisper_help_detector;
