use crate::MEDIA_FILE_KEY;
use async_trait::async_trait;
use gen_ai::FileData;
use pipeline::{PipelineContext, Step, StepMeta};
use tracing::debug;

/// Releases the model-side file reference at the end of the analyze run.
/// File-URI models hold no server-side handle, so this is a no-op today; the
/// step stays in the chain so a handle-based model slots in without reshaping
/// the pipeline.
pub struct ReleaseModelFile {
    meta: StepMeta,
}

impl ReleaseModelFile {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            meta: StepMeta::new(name),
        }
    }
}

#[async_trait]
impl Step for ReleaseModelFile {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn is_runnable(&self, ctx: &PipelineContext) -> bool {
        ctx.contains(MEDIA_FILE_KEY)
    }

    async fn execute(&self, ctx: &mut PipelineContext) {
        if let Some(file) = ctx.get::<FileData>(MEDIA_FILE_KEY) {
            debug!(uri = %file.file_uri, "releasing model file reference");
        }
        ctx.remove(MEDIA_FILE_KEY);
        self.meta.record_success();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drops_the_file_reference() {
        let step = ReleaseModelFile::new("cleanup-model-file");
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

        assert!(!ctx.contains(MEDIA_FILE_KEY));
        assert!(!ctx.has_errors());
        assert_eq!(step.meta().success_count(), 1);
    }
}
