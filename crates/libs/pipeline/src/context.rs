use color_eyre::eyre::Report;
use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{warn, Span};

/// Key the pipeline fills with the previous step's output before each step.
pub const IN_KEY: &str = "__IN__";
/// Key a step writes its primary output to for the pipeline to pick up.
pub const OUT_KEY: &str = "__OUT__";

type BagValue = Box<dyn Any + Send + Sync>;

/// Shared state for one pipeline run: a typed key/value bag, the errors each
/// step reported, temp files to delete at end-of-run, and the ambient trace
/// span plus cancellation signal.
///
/// A context is never shared across runs. Steps mutate it strictly in
/// sequence, so no interior locking is needed.
pub struct PipelineContext {
    bag: HashMap<String, BagValue>,
    errors: Vec<(String, Report)>,
    temp_files: Vec<PathBuf>,
    span: Span,
    cancel: CancellationToken,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bag: HashMap::new(),
            errors: Vec::new(),
            temp_files: Vec::new(),
            span: Span::none(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_trace_context(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stores a value under `key`, fluent style.
    pub fn put<T: Any + Send + Sync>(&mut self, key: &str, value: T) -> &mut Self {
        self.bag.insert(key.to_string(), Box::new(value));
        self
    }

    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.bag.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes and returns the value under `key` when it has type `T`.
    pub fn take<T: Any + Send + Sync>(&mut self, key: &str) -> Option<T> {
        let raw = self.bag.remove(key)?;
        match raw.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(raw) => {
                // wrong type requested; put the value back untouched
                self.bag.insert(key.to_string(), raw);
                None
            }
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.bag.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) {
        self.bag.remove(key);
    }

    /// Moves a value between keys without knowing its type; used by the
    /// pipeline to pipe `__OUT__` into `__IN__`.
    pub(crate) fn take_raw(&mut self, key: &str) -> Option<BagValue> {
        self.bag.remove(key)
    }

    pub(crate) fn put_raw(&mut self, key: &str, value: BagValue) {
        self.bag.insert(key.to_string(), value);
    }

    /// Records an error produced by the named step.
    pub fn add_error(&mut self, step_name: &str, error: impl Into<Report>) {
        self.errors.push((step_name.to_string(), error.into()));
    }

    #[must_use]
    pub fn errors(&self) -> &[(String, Report)] {
        &self.errors
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Registers a file for best-effort deletion when the run closes.
    pub fn track_temp(&mut self, path: impl AsRef<Path>) {
        self.temp_files.push(path.as_ref().to_path_buf());
    }

    #[must_use]
    pub fn temp_files(&self) -> &[PathBuf] {
        &self.temp_files
    }

    #[must_use]
    pub fn trace_context(&self) -> &Span {
        &self.span
    }

    pub fn set_trace_context(&mut self, span: Span) {
        self.span = span;
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Deletes tracked temp files, logging failures per file. Idempotent.
    pub fn close(&mut self) {
        for file in self.temp_files.drain(..) {
            if let Err(error) = std::fs::remove_file(&file) {
                warn!("failed to remove temp file {}: {error}", file.display());
            }
        }
    }
}

impl Drop for PipelineContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::eyre;

    #[test]
    fn bag_is_typed() {
        let mut ctx = PipelineContext::new();
        ctx.put("count", 7_i64).put("name", "serenity".to_string());

        assert_eq!(ctx.get::<i64>("count"), Some(&7));
        assert_eq!(ctx.get::<String>("name").unwrap(), "serenity");
        // wrong type reads as absent
        assert_eq!(ctx.get::<String>("count"), None);
        assert!(ctx.contains("count"));

        ctx.remove("count");
        assert!(!ctx.contains("count"));
    }

    #[test]
    fn take_with_wrong_type_leaves_value_in_place() {
        let mut ctx = PipelineContext::new();
        ctx.put("key", 1_u32);
        assert_eq!(ctx.take::<String>("key"), None);
        assert_eq!(ctx.take::<u32>("key"), Some(1));
        assert!(!ctx.contains("key"));
    }

    #[test]
    fn errors_keep_insertion_order() {
        let mut ctx = PipelineContext::new();
        assert!(!ctx.has_errors());
        ctx.add_error("first-step", eyre!("boom"));
        ctx.add_error("second-step", eyre!("bang"));

        let names: Vec<&str> = ctx.errors().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["first-step", "second-step"]);
        assert!(ctx.has_errors());
    }

    #[test]
    fn close_removes_temp_files_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scratch.mp4");
        std::fs::write(&file, b"data").unwrap();

        let mut ctx = PipelineContext::new();
        ctx.track_temp(&file);
        assert_eq!(ctx.temp_files().len(), 1);

        ctx.close();
        assert!(!file.exists());
        // second close is a no-op, including for already-deleted files
        ctx.close();
    }
}
