//! Well-known context keys steps address besides the pipeline's piping
//! channel.

/// The `StorageObject` the triggering notification resolved to.
pub const STORAGE_OBJECT_KEY: &str = "__STORAGE_OBJECT__";
/// The model-readable file reference (`gs://` URI plus MIME type).
pub const MEDIA_FILE_KEY: &str = "__MEDIA_FILE__";
/// The parsed `MediaSummary`.
pub const SUMMARY_KEY: &str = "__summary_output__";
/// The raw per-scene JSON strings aggregated by the extractor.
pub const SCENES_KEY: &str = "__scene_output__";
/// The assembled `Media`.
pub const MEDIA_KEY: &str = "__media_output__";
/// Container duration in whole seconds, when probed.
pub const MEDIA_LENGTH_KEY: &str = "__media_length__";
