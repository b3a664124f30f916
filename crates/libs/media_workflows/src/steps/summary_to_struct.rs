use crate::{STORAGE_OBJECT_KEY, SUMMARY_KEY};
use async_trait::async_trait;
use color_eyre::eyre::eyre;
use media_model::{validate_summary, MediaSummary, StorageObject};
use pipeline::{PipelineContext, Step, StepMeta};
use tracing::warn;

/// Parses the raw summary JSON into a `MediaSummary`, validates it against
/// the configured closed sets, and enriches it with the object's direct URL
/// (the model only ever saw a file URI).
pub struct SummaryJsonToStruct {
    meta: StepMeta,
    known_categories: Vec<String>,
    known_ratings: Vec<String>,
}

impl SummaryJsonToStruct {
    #[must_use]
    pub fn new(name: &str, known_categories: Vec<String>, known_ratings: Vec<String>) -> Self {
        Self {
            meta: StepMeta::new(name).with_output_key(SUMMARY_KEY),
            known_categories,
            known_ratings,
        }
    }
}

#[async_trait]
impl Step for SummaryJsonToStruct {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    async fn execute(&self, ctx: &mut PipelineContext) {
        let Some(raw) = ctx.get::<String>(self.meta.input_key()).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing summary JSON"));
            return;
        };
        let Some(object) = ctx.get::<StorageObject>(STORAGE_OBJECT_KEY).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing storage object"));
            return;
        };

        let mut summary: MediaSummary = match serde_json::from_str(&raw) {
            Ok(summary) => summary,
            Err(error) => {
                self.meta.record_error();
                ctx.add_error(
                    self.meta.name(),
                    eyre!("failed to decode media summary JSON: {error}"),
                );
                return;
            }
        };

        match validate_summary(&summary, &self.known_categories, &self.known_ratings) {
            Ok(warnings) => {
                for warning in warnings {
                    warn!(step = self.meta.name(), "{warning}");
                }
            }
            Err(error) => {
                self.meta.record_error();
                ctx.add_error(self.meta.name(), eyre!("summary rejected: {error}"));
                return;
            }
        }

        summary.media_url = Some(object.media_url());
        self.meta.record_success();
        ctx.put(SUMMARY_KEY, summary.clone());
        ctx.put(pipeline::OUT_KEY, summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{IN_KEY, OUT_KEY};

    fn storage_object() -> StorageObject {
        StorageObject {
            bucket: "media_low_res_resources".into(),
            name: "test-trailer-001.mp4".into(),
            mime_type: "video/mp4".into(),
        }
    }

    fn step() -> SummaryJsonToStruct {
        SummaryJsonToStruct::new(
            "convert-media-summary",
            vec!["trailer".into()],
            vec!["PG-13".into()],
        )
    }

    #[tokio::test]
    async fn parses_validates_and_enriches_the_url() {
        let mut ctx = PipelineContext::new();
        ctx.put(
            IN_KEY,
            r#"{
                "title": "Serenity",
                "category": "trailer",
                "rating": "PG-13",
                "length_seconds": 120,
                "scene_time_stamps": [{"start": "00:00:00", "end": "00:00:30"}]
            }"#
            .to_string(),
        );
        ctx.put(STORAGE_OBJECT_KEY, storage_object());

        step().execute(&mut ctx).await;

        assert!(!ctx.has_errors());
        let summary = ctx.get::<MediaSummary>(SUMMARY_KEY).unwrap();
        assert_eq!(
            summary.media_url.as_deref().unwrap(),
            "https://storage.mtls.cloud.google.com/media_low_res_resources/test-trailer-001.mp4"
        );
        assert!(ctx.contains(OUT_KEY));
    }

    #[tokio::test]
    async fn rejects_categories_outside_the_closed_set() {
        let mut ctx = PipelineContext::new();
        ctx.put(
            IN_KEY,
            r#"{"title": "Serenity", "category": "podcast"}"#.to_string(),
        );
        ctx.put(STORAGE_OBJECT_KEY, storage_object());

        step().execute(&mut ctx).await;

        assert!(ctx.has_errors());
        assert!(!ctx.contains(SUMMARY_KEY));
    }

    #[tokio::test]
    async fn unparsable_json_is_fatal_to_the_run() {
        let mut ctx = PipelineContext::new();
        ctx.put(IN_KEY, "not json at all".to_string());
        ctx.put(STORAGE_OBJECT_KEY, storage_object());

        step().execute(&mut ctx).await;

        assert!(ctx.has_errors());
        assert_eq!(ctx.errors()[0].0, "convert-media-summary");
    }
}
