pub mod ffmpeg_clip_extractor;
pub mod ffprobe_duration_probe;
pub mod vtt_caption_inspector;
