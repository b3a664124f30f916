use crate::{PipelineContext, IN_KEY, OUT_KEY};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity and instrumentation shared by every step: a name (namespacing its
/// spans and counters), the context keys it reads and writes, and
/// success/error counters.
#[derive(Debug)]
pub struct StepMeta {
    name: String,
    input_key: String,
    output_key: String,
    success: AtomicU64,
    error: AtomicU64,
}

impl StepMeta {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            input_key: IN_KEY.to_string(),
            output_key: OUT_KEY.to_string(),
            success: AtomicU64::new(0),
            error: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_input_key(mut self, key: &str) -> Self {
        self.input_key = key.to_string();
        self
    }

    #[must_use]
    pub fn with_output_key(mut self, key: &str) -> Self {
        self.output_key = key.to_string();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn input_key(&self) -> &str {
        &self.input_key
    }

    #[must_use]
    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.error.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn success_count(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.error.load(Ordering::Relaxed)
    }
}

/// An atomic, retry-safe unit of work over the shared context.
///
/// Steps never unwind on failure: they report through
/// [`PipelineContext::add_error`], keyed by their name, and return.
#[async_trait]
pub trait Step: Send + Sync {
    fn meta(&self) -> &StepMeta;

    /// Whether the step can run against the current context. The default
    /// requires the step's input key to be populated.
    fn is_runnable(&self, ctx: &PipelineContext) -> bool {
        ctx.contains(self.meta().input_key())
    }

    async fn execute(&self, ctx: &mut PipelineContext);
}
