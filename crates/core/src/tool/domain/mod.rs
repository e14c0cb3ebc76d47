pub mod tool_invocation;
pub mod transcription_tool;
