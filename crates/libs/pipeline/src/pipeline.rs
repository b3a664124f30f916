use crate::{PipelineContext, Step, StepMeta, IN_KEY, OUT_KEY};
use async_trait::async_trait;
use tracing::{field, info_span, Instrument};

/// An ordered composition of steps that is itself a step, so pipelines nest.
///
/// Execution protocol, per run:
/// 1. open a run span as a child of the context's ambient span;
/// 2. execute each step inside its own child span of the run span, swapping
///    the context's span in and out so sibling steps stay sibling spans;
/// 3. skip (but still open and close a span for) every remaining step once an
///    error is recorded, unless `continue_on_failure` is set;
/// 4. after each executed step, pipe `__OUT__` into `__IN__` and clear both.
pub struct Pipeline {
    meta: StepMeta,
    continue_on_failure: bool,
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            meta: StepMeta::new(name),
            continue_on_failure: false,
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    #[must_use]
    pub fn add_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn run(&self, ctx: &mut PipelineContext) {
        let parent = ctx.trace_context().clone();
        let run_span = info_span!(
            parent: &parent,
            "pipeline_execute",
            pipeline = %self.meta.name(),
            status = field::Empty,
        );
        ctx.set_trace_context(run_span.clone());

        for step in &self.steps {
            let step_span = info_span!(
                parent: &run_span,
                "step_execute",
                step = %step.meta().name(),
                status = field::Empty,
                detail = field::Empty,
            );

            if ctx.has_errors() && !self.continue_on_failure {
                step_span.record("status", "skipped");
                step_span.record("detail", "previous error on pipeline; skipping execution");
                continue;
            }

            if step.is_runnable(ctx) {
                ctx.set_trace_context(step_span.clone());
                step.execute(ctx).instrument(step_span.clone()).await;
                // restore the run span so the next step's span is a sibling,
                // not a grandchild
                ctx.set_trace_context(run_span.clone());
            } else {
                step_span.record("detail", "step not runnable");
            }
            step_span.record("status", if ctx.has_errors() { "error" } else { "ok" });

            // pipe: last step's output becomes the next step's input
            let piped = ctx.take_raw(OUT_KEY);
            ctx.remove(IN_KEY);
            if let Some(value) = piped {
                ctx.put_raw(IN_KEY, value);
            }
        }

        run_span.record("status", if ctx.has_errors() { "error" } else { "ok" });
        ctx.set_trace_context(parent);
    }
}

#[async_trait]
impl Step for Pipeline {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    /// A pipeline is always ready; its steps gate themselves.
    fn is_runnable(&self, _ctx: &PipelineContext) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut PipelineContext) {
        self.run(ctx).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::eyre;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Emits a fixed value on the pipeline's output channel.
    struct Emit {
        meta: StepMeta,
        value: i64,
    }

    #[async_trait]
    impl Step for Emit {
        fn meta(&self) -> &StepMeta {
            &self.meta
        }

        fn is_runnable(&self, _ctx: &PipelineContext) -> bool {
            true
        }

        async fn execute(&self, ctx: &mut PipelineContext) {
            ctx.put(self.meta.output_key(), self.value);
        }
    }

    /// Records what it observed under `__IN__` and whether `__OUT__` was
    /// already populated when it started.
    struct Probe {
        meta: StepMeta,
        seen_inputs: Arc<Mutex<Vec<Option<i64>>>>,
        out_present: Arc<Mutex<Vec<bool>>>,
        executions: Arc<AtomicUsize>,
    }

    impl Probe {
        fn new(name: &str) -> Self {
            Self {
                meta: StepMeta::new(name),
                seen_inputs: Arc::default(),
                out_present: Arc::default(),
                executions: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl Step for Probe {
        fn meta(&self) -> &StepMeta {
            &self.meta
        }

        fn is_runnable(&self, _ctx: &PipelineContext) -> bool {
            true
        }

        async fn execute(&self, ctx: &mut PipelineContext) {
            self.executions.fetch_add(1, Ordering::SeqCst);
            self.seen_inputs
                .lock()
                .unwrap()
                .push(ctx.get::<i64>(IN_KEY).copied());
            self.out_present.lock().unwrap().push(ctx.contains(OUT_KEY));
        }
    }

    /// Always records an error against its own name.
    struct Fail {
        meta: StepMeta,
    }

    #[async_trait]
    impl Step for Fail {
        fn meta(&self) -> &StepMeta {
            &self.meta
        }

        fn is_runnable(&self, _ctx: &PipelineContext) -> bool {
            true
        }

        async fn execute(&self, ctx: &mut PipelineContext) {
            ctx.add_error(self.meta.name(), eyre!("synthetic failure"));
        }
    }

    #[tokio::test]
    async fn pipes_output_into_next_input() {
        let probe = Probe::new("probe");
        let seen = probe.seen_inputs.clone();
        let out_present = probe.out_present.clone();

        let pipeline = Pipeline::new("piping")
            .add_step(Emit {
                meta: StepMeta::new("emit"),
                value: 42,
            })
            .add_step(probe);

        let mut ctx = PipelineContext::new();
        pipeline.run(&mut ctx).await;

        assert!(!ctx.has_errors());
        assert_eq!(seen.lock().unwrap().as_slice(), [Some(42)]);
        // __OUT__ is always absent at the start of a step
        assert_eq!(out_present.lock().unwrap().as_slice(), [false]);
        // after the last step, its (absent) output cleared __IN__ too
        assert!(!ctx.contains(IN_KEY));
        assert!(!ctx.contains(OUT_KEY));
    }

    #[tokio::test]
    async fn input_clears_when_a_step_emits_nothing() {
        let probe = Probe::new("probe");
        let seen = probe.seen_inputs.clone();

        let pipeline = Pipeline::new("clearing")
            .add_step(Emit {
                meta: StepMeta::new("emit"),
                value: 1,
            })
            .add_step(Probe::new("quiet")) // consumes input, emits nothing
            .add_step(probe);

        let mut ctx = PipelineContext::new();
        pipeline.run(&mut ctx).await;

        assert_eq!(seen.lock().unwrap().as_slice(), [None]);
    }

    #[tokio::test]
    async fn stops_at_first_error_by_default() {
        let probe = Probe::new("probe");
        let executions = probe.executions.clone();

        let pipeline = Pipeline::new("halting")
            .add_step(Fail {
                meta: StepMeta::new("fail"),
            })
            .add_step(probe);

        let mut ctx = PipelineContext::new();
        pipeline.run(&mut ctx).await;

        assert!(ctx.has_errors());
        assert_eq!(executions.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.errors()[0].0, "fail");
    }

    #[tokio::test]
    async fn continue_on_failure_runs_every_step() {
        let probe = Probe::new("probe");
        let executions = probe.executions.clone();

        let pipeline = Pipeline::new("tolerant")
            .continue_on_failure(true)
            .add_step(Fail {
                meta: StepMeta::new("fail"),
            })
            .add_step(probe);

        let mut ctx = PipelineContext::new();
        pipeline.run(&mut ctx).await;

        assert!(ctx.has_errors());
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn not_runnable_steps_are_passed_over() {
        // default readiness requires __IN__, which nothing populates
        let pipeline = Pipeline::new("gated").add_step(Emit {
            meta: StepMeta::new("emit"),
            value: 9,
        });
        struct Gated {
            meta: StepMeta,
            executions: Arc<AtomicUsize>,
        }
        #[async_trait]
        impl Step for Gated {
            fn meta(&self) -> &StepMeta {
                &self.meta
            }
            async fn execute(&self, ctx: &mut PipelineContext) {
                self.executions.fetch_add(1, Ordering::SeqCst);
                ctx.remove(IN_KEY);
            }
        }
        let executions = Arc::new(AtomicUsize::new(0));
        let pipeline = pipeline
            .add_step(Gated {
                meta: StepMeta::new("first-gated"),
                executions: executions.clone(),
            })
            .add_step(Gated {
                meta: StepMeta::new("second-gated"),
                executions: executions.clone(),
            });

        let mut ctx = PipelineContext::new();
        pipeline.run(&mut ctx).await;

        // first gated step saw the emitted input; the second found nothing
        // and was passed over without erroring the run
        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert!(!ctx.has_errors());
    }

    #[tokio::test]
    async fn pipelines_nest() {
        let probe = Probe::new("inner-probe");
        let seen = probe.seen_inputs.clone();

        let inner = Pipeline::new("inner")
            .add_step(Emit {
                meta: StepMeta::new("inner-emit"),
                value: 7,
            })
            .add_step(probe);
        let outer = Pipeline::new("outer").add_step(inner);

        let mut ctx = PipelineContext::new();
        outer.run(&mut ctx).await;

        // piping applies inside the nested pipeline exactly as at top level
        assert_eq!(seen.lock().unwrap().as_slice(), [Some(7)]);
        assert!(!ctx.has_errors());
    }

    #[tokio::test]
    async fn nested_pipeline_errors_halt_the_outer_run() {
        let probe = Probe::new("outer-probe");
        let executions = probe.executions.clone();

        let inner = Pipeline::new("inner").add_step(Fail {
            meta: StepMeta::new("inner-fail"),
        });
        let outer = Pipeline::new("outer").add_step(inner).add_step(probe);

        let mut ctx = PipelineContext::new();
        outer.run(&mut ctx).await;

        assert!(ctx.has_errors());
        assert_eq!(ctx.errors()[0].0, "inner-fail");
        assert_eq!(executions.load(Ordering::SeqCst), 0);
    }
}
