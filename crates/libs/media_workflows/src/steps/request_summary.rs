use crate::{render_prompt, MEDIA_FILE_KEY};
use async_trait::async_trait;
use color_eyre::eyre::eyre;
use gen_ai::{generate_multimodal, Content, Counter, FileData, ModelInvoker, Part};
use media_model::example_summary;
use pipeline::{PipelineContext, Step, StepMeta};
use std::sync::Arc;

/// Asks the model for the first-pass summary JSON: title, head metadata,
/// cast, and the scene time stamps that seed extraction.
pub struct RequestSummary {
    meta: StepMeta,
    invoker: Arc<ModelInvoker>,
    template: String,
    categories: Vec<(String, String)>,
    input_tokens: Counter,
    output_tokens: Counter,
    retries: Counter,
}

impl RequestSummary {
    /// `categories` pairs each configured key with its definition; they are
    /// enumerated in the prompt so the model stays inside the closed set.
    #[must_use]
    pub fn new(
        name: &str,
        invoker: Arc<ModelInvoker>,
        template: &str,
        categories: Vec<(String, String)>,
    ) -> Self {
        Self {
            meta: StepMeta::new(name),
            invoker,
            template: template.to_string(),
            categories,
            input_tokens: Counter::new(),
            output_tokens: Counter::new(),
            retries: Counter::new(),
        }
    }

    fn build_prompt(&self) -> String {
        let categories = self
            .categories
            .iter()
            .map(|(key, definition)| format!("{key} - {definition}; "))
            .collect::<String>();
        let example_json = serde_json::to_string(&example_summary()).unwrap_or_default();
        render_prompt(
            &self.template,
            &[
                ("CATEGORIES", categories.as_str()),
                ("EXAMPLE_JSON", example_json.as_str()),
            ],
        )
    }
}

#[async_trait]
impl Step for RequestSummary {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn is_runnable(&self, ctx: &PipelineContext) -> bool {
        ctx.contains(MEDIA_FILE_KEY)
    }

    async fn execute(&self, ctx: &mut PipelineContext) {
        let Some(file) = ctx.get::<FileData>(MEDIA_FILE_KEY).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing media file reference"));
            return;
        };

        let prompt = self.build_prompt();
        let contents = vec![Content::user(vec![
            Part::text(&prompt),
            Part::file(&file.file_uri, &file.mime_type),
        ])];

        let cancel = ctx.cancellation().clone();
        match generate_multimodal(
            &cancel,
            &self.input_tokens,
            &self.output_tokens,
            &self.retries,
            0,
            &self.invoker,
            &contents,
        )
        .await
        {
            Ok(raw_json) => {
                self.meta.record_success();
                ctx.put(self.meta.output_key(), raw_json);
            }
            Err(error) => {
                self.meta.record_error();
                ctx.add_error(self.meta.name(), eyre!("summary request failed: {error}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gen_ai::{GenAiError, GenerateRequest, GenerateResponse, GenerativeModel};
    use pipeline::OUT_KEY;

    struct EchoModel;

    #[async_trait]
    impl GenerativeModel for EchoModel {
        async fn generate_content(
            &self,
            _model: &str,
            request: &GenerateRequest,
        ) -> Result<GenerateResponse, GenAiError> {
            // reply with the prompt text so the test can inspect rendering
            let prompt = request.contents[0].text();
            Ok(serde_json::from_value(serde_json::json!({
                "candidates": [
                    {"content": {"role": "model", "parts": [{"text": prompt}]}}
                ]
            }))
            .unwrap())
        }
    }

    #[tokio::test]
    async fn renders_categories_and_example_into_the_prompt() {
        let invoker = Arc::new(ModelInvoker::new(Arc::new(EchoModel), "stub", 100));
        let step = RequestSummary::new(
            "generate-media-summary",
            invoker,
            "Pick from: {{.CATEGORIES}} Shaped like: {{.EXAMPLE_JSON}}",
            vec![("trailer".into(), "A short promotional cut.".into())],
        );

        let mut ctx = PipelineContext::new();
        ctx.put(
            MEDIA_FILE_KEY,
            FileData {
                file_uri: "gs://bucket/clip.mp4".into(),
                mime_type: "video/mp4".into(),
            },
        );

        assert!(step.is_runnable(&ctx));
        step.execute(&mut ctx).await;

        assert!(!ctx.has_errors());
        let raw = ctx.get::<String>(OUT_KEY).unwrap();
        assert!(raw.contains("trailer - A short promotional cut.; "));
        assert!(raw.contains("\"title\":\"Serenity\""));
    }

    #[tokio::test]
    async fn not_runnable_without_a_file_reference() {
        let invoker = Arc::new(ModelInvoker::new(Arc::new(EchoModel), "stub", 100));
        let step = RequestSummary::new("generate-media-summary", invoker, "{{.CATEGORIES}}", vec![]);
        let ctx = PipelineContext::new();
        assert!(!step.is_runnable(&ctx));
    }
}
