pub mod audio_library;
