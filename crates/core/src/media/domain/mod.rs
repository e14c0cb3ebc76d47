pub mod caption_inspector;
pub mod clip_extractor;
pub mod duration_probe;
