pub mod capability_detector;
pub mod feature_flags;
pub mod tool_capabilities;
