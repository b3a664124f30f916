use crate::STORAGE_OBJECT_KEY;
use async_trait::async_trait;
use color_eyre::eyre::eyre;
use media_model::{StorageNotification, StorageObject};
use pipeline::{PipelineContext, Step, StepMeta};

/// Decodes the bus payload into a notification and projects it to the
/// `StorageObject` the rest of the pipeline works from.
pub struct ParseNotification {
    meta: StepMeta,
}

impl ParseNotification {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            meta: StepMeta::new(name),
        }
    }
}

#[async_trait]
impl Step for ParseNotification {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    async fn execute(&self, ctx: &mut PipelineContext) {
        let Some(payload) = ctx.get::<String>(self.meta.input_key()).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing notification payload"));
            return;
        };

        let notification: StorageNotification = match serde_json::from_str(&payload) {
            Ok(notification) => notification,
            Err(error) => {
                self.meta.record_error();
                ctx.add_error(
                    self.meta.name(),
                    eyre!("failed to decode storage notification: {error}"),
                );
                return;
            }
        };

        self.meta.record_success();
        let object = StorageObject::from(&notification);
        ctx.put(STORAGE_OBJECT_KEY, object.clone());
        ctx.put(self.meta.output_key(), object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{IN_KEY, OUT_KEY};

    #[tokio::test]
    async fn projects_notification_to_storage_object() {
        let step = ParseNotification::new("parse-notification");
        let mut ctx = PipelineContext::new();
        ctx.put(
            IN_KEY,
            r#"{"bucket":"media_high_res_resources","name":"test-trailer-001.mp4","contentType":"video/mp4"}"#
                .to_string(),
        );

        assert!(step.is_runnable(&ctx));
        step.execute(&mut ctx).await;

        assert!(!ctx.has_errors());
        let object = ctx.get::<StorageObject>(STORAGE_OBJECT_KEY).unwrap();
        assert_eq!(object.bucket, "media_high_res_resources");
        assert_eq!(object.mime_type, "video/mp4");
        assert_eq!(
            ctx.get::<StorageObject>(OUT_KEY).unwrap(),
            ctx.get::<StorageObject>(STORAGE_OBJECT_KEY).unwrap()
        );
        assert_eq!(step.meta().success_count(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_a_validation_error() {
        let step = ParseNotification::new("parse-notification");
        let mut ctx = PipelineContext::new();
        ctx.put(IN_KEY, "{not json".to_string());

        step.execute(&mut ctx).await;

        assert!(ctx.has_errors());
        assert_eq!(ctx.errors()[0].0, "parse-notification");
        assert_eq!(step.meta().error_count(), 1);
        assert!(!ctx.contains(STORAGE_OBJECT_KEY));
    }
}
