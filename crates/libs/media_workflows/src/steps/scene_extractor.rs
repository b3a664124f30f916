use crate::{render_prompt, MEDIA_FILE_KEY, SCENES_KEY};
use async_trait::async_trait;
use color_eyre::eyre::eyre;
use gen_ai::{generate_multimodal, Content, Counter, FileData, GenAiError, ModelInvoker, Part};
use media_model::{example_scene, MediaSummary};
use pipeline::{PipelineContext, Step, StepMeta};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{field, info_span, Instrument, Span};

/// Extracts per-scene scripts in parallel: one job per time span, a bounded
/// pool of workers sharing the rate-limited invoker. Worker completion order
/// is unspecified; assembly re-sorts by the model-returned `sequence`, so the
/// aggregated list is a set, not a sequence.
pub struct SceneExtractor {
    meta: StepMeta,
    invoker: Arc<ModelInvoker>,
    template: String,
    worker_count: usize,
    input_tokens: Counter,
    output_tokens: Counter,
    retries: Counter,
}

struct SceneJob {
    prompt: String,
    span: Span,
}

impl SceneExtractor {
    #[must_use]
    pub fn new(name: &str, invoker: Arc<ModelInvoker>, template: &str, worker_count: usize) -> Self {
        Self {
            meta: StepMeta::new(name).with_output_key(SCENES_KEY),
            invoker,
            template: template.to_string(),
            worker_count: worker_count.max(1),
            input_tokens: Counter::new(),
            output_tokens: Counter::new(),
            retries: Counter::new(),
        }
    }

    fn summary_text(summary: &MediaSummary) -> String {
        let mut cast_lines = String::new();
        for member in &summary.cast {
            let _ = writeln!(
                cast_lines,
                "{} - {}",
                member.character_name, member.actor_name
            );
        }
        format!(
            "Title:{}\nSummary:\n\n{}\nCast:\n\n{}",
            summary.title, summary.summary, cast_lines
        )
    }

    async fn scene_worker(
        jobs: async_channel::Receiver<SceneJob>,
        results: async_channel::Sender<Result<String, GenAiError>>,
        invoker: Arc<ModelInvoker>,
        file: FileData,
        cancel: CancellationToken,
        input_tokens: Counter,
        output_tokens: Counter,
        retries: Counter,
    ) {
        while let Ok(job) = jobs.recv().await {
            let contents = vec![Content::user(vec![
                Part::text(&job.prompt),
                Part::file(&file.file_uri, &file.mime_type),
            ])];
            let result = generate_multimodal(
                &cancel,
                &input_tokens,
                &output_tokens,
                &retries,
                0,
                &invoker,
                &contents,
            )
            .instrument(job.span.clone())
            .await;

            match result {
                Ok(value) => {
                    job.span.record("status", "ok");
                    // empty and `{}` replies mean "no scene here"
                    let trimmed = value.trim();
                    if !trimmed.is_empty() && trimmed != "{}" {
                        let _ = results.send(Ok(value)).await;
                    }
                }
                Err(error) => {
                    job.span.record("status", "error");
                    let _ = results.send(Err(error)).await;
                }
            }
        }
    }
}

#[async_trait]
impl Step for SceneExtractor {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn is_runnable(&self, ctx: &PipelineContext) -> bool {
        ctx.contains(self.meta.input_key()) && ctx.contains(MEDIA_FILE_KEY)
    }

    async fn execute(&self, ctx: &mut PipelineContext) {
        let Some(summary) = ctx.get::<MediaSummary>(self.meta.input_key()).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing media summary"));
            return;
        };
        let Some(file) = ctx.get::<FileData>(MEDIA_FILE_KEY).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing media file reference"));
            return;
        };

        let span_count = summary.scene_time_stamps.len();
        if span_count == 0 {
            self.meta.record_success();
            ctx.put(SCENES_KEY, Vec::<String>::new());
            ctx.put(pipeline::OUT_KEY, Vec::<String>::new());
            return;
        }

        let summary_text = Self::summary_text(&summary);
        let example_json = serde_json::to_string(&example_scene()).unwrap_or_default();

        // buffered for the full fan-out so dispatch never blocks
        let (jobs_tx, jobs_rx) = async_channel::bounded::<SceneJob>(span_count);
        let (results_tx, results_rx) =
            async_channel::bounded::<Result<String, GenAiError>>(span_count);

        let mut workers = JoinSet::new();
        for _ in 0..self.worker_count.min(span_count) {
            workers.spawn(Self::scene_worker(
                jobs_rx.clone(),
                results_tx.clone(),
                self.invoker.clone(),
                file.clone(),
                ctx.cancellation().clone(),
                self.input_tokens.clone(),
                self.output_tokens.clone(),
                self.retries.clone(),
            ));
        }
        drop(results_tx);

        for (index, time_span) in summary.scene_time_stamps.iter().enumerate() {
            // advisory numbering; the model's own `sequence` field wins
            let sequence = (index + 1).to_string();
            let prompt = render_prompt(
                &self.template,
                &[
                    ("SEQUENCE", sequence.as_str()),
                    ("SUMMARY_DOCUMENT", summary_text.as_str()),
                    ("TIME_START", time_span.start.as_str()),
                    ("TIME_END", time_span.end.as_str()),
                    ("EXAMPLE_JSON", example_json.as_str()),
                ],
            );
            let span = info_span!(
                parent: ctx.trace_context(),
                "genai_scene",
                step = %self.meta.name(),
                sequence = index,
                start = %time_span.start,
                end = %time_span.end,
                status = field::Empty,
            );
            let _ = jobs_tx.send(SceneJob { prompt, span }).await;
        }
        jobs_tx.close();

        // wait for the pool to drain, then collect off the main task
        while workers.join_next().await.is_some() {}

        let mut scenes: Vec<String> = Vec::with_capacity(span_count);
        while let Ok(result) = results_rx.try_recv() {
            match result {
                Ok(value) => scenes.push(value),
                Err(error) => {
                    self.meta.record_error();
                    ctx.add_error(self.meta.name(), eyre!("scene extract failed: {error}"));
                }
            }
        }

        if !ctx.has_errors() {
            self.meta.record_success();
        }
        ctx.put(SCENES_KEY, scenes.clone());
        ctx.put(pipeline::OUT_KEY, scenes);
    }
}
