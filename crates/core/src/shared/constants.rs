use std::time::Duration;

/// Whisper model used for transcriptions and speed tests unless overridden.
pub const DEFAULT_MODEL: &str = "medium";

pub const WHISPER_PROGRAM: &str = "whisper";
pub const FFMPEG_PROGRAM: &str = "ffmpeg";
pub const FFPROBE_PROGRAM: &str = "ffprobe";

pub const CAPTION_EXTENSION: &str = "vtt";
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3"];

pub const DEFAULT_MAX_WORKERS: usize = 2;

pub const CAPABILITY_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DURATION_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const CLIP_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const SPEED_TEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Length of the clip cut from a source item for speed tests.
pub const SPEED_TEST_CLIP_SECONDS: u32 = 15;

/// Rough seconds of audio per megabyte, used when ffprobe cannot report a
/// duration.
pub const SECONDS_PER_MEGABYTE: f64 = 60.0;

pub const SPEED_RATIOS_FILENAME: &str = "speed_ratios.json";
