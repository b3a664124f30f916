use crate::STORAGE_OBJECT_KEY;
use async_trait::async_trait;
use cloud_clients::StorageClient;
use color_eyre::eyre::eyre;
use media_model::StorageObject;
use pipeline::{PipelineContext, Step, StepMeta};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Uploads the transcoded proxy into the output bucket under the original
/// object name, so both renditions key by filename.
pub struct UploadToStorage {
    meta: StepMeta,
    storage: Arc<StorageClient>,
    bucket: String,
}

impl UploadToStorage {
    #[must_use]
    pub fn new(name: &str, storage: Arc<StorageClient>, bucket: &str) -> Self {
        Self {
            meta: StepMeta::new(name),
            storage,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl Step for UploadToStorage {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn is_runnable(&self, ctx: &PipelineContext) -> bool {
        ctx.contains(self.meta.input_key()) && ctx.contains(STORAGE_OBJECT_KEY)
    }

    async fn execute(&self, ctx: &mut PipelineContext) {
        let Some(path) = ctx.get::<PathBuf>(self.meta.input_key()).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing transcoded file path"));
            return;
        };
        let Some(original) = ctx.get::<StorageObject>(STORAGE_OBJECT_KEY).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing storage object"));
            return;
        };

        match self
            .storage
            .upload_file(&self.bucket, &original.name, &original.mime_type, &path)
            .await
        {
            Ok(()) => {
                info!(bucket = %self.bucket, object = %original.name, "proxy uploaded");
                self.meta.record_success();
                ctx.put(self.meta.output_key(), original.name);
            }
            Err(error) => {
                self.meta.record_error();
                ctx.add_error(
                    self.meta.name(),
                    eyre!("failed to upload '{}': {error}", original.name),
                );
            }
        }
    }
}
