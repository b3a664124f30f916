use crate::{MEDIA_FILE_KEY, STORAGE_OBJECT_KEY};
use async_trait::async_trait;
use color_eyre::eyre::eyre;
use gen_ai::FileData;
use media_model::StorageObject;
use pipeline::{PipelineContext, Step, StepMeta};

/// Turns the storage object into the file reference the model reads directly
/// by URI. File-URI models need no upload or server-side handle.
pub struct ResolveMediaFile {
    meta: StepMeta,
}

impl ResolveMediaFile {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            meta: StepMeta::new(name),
        }
    }
}

#[async_trait]
impl Step for ResolveMediaFile {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn is_runnable(&self, ctx: &PipelineContext) -> bool {
        ctx.contains(STORAGE_OBJECT_KEY)
    }

    async fn execute(&self, ctx: &mut PipelineContext) {
        let Some(object) = ctx.get::<StorageObject>(STORAGE_OBJECT_KEY).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing storage object"));
            return;
        };

        self.meta.record_success();
        let file = FileData {
            file_uri: object.gs_uri(),
            mime_type: object.mime_type,
        };
        ctx.put(MEDIA_FILE_KEY, file.clone());
        ctx.put(self.meta.output_key(), file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_gs_uri_file_reference() {
        let step = ResolveMediaFile::new("resolve-media-file");
        let mut ctx = PipelineContext::new();
        ctx.put(
            STORAGE_OBJECT_KEY,
            StorageObject {
                bucket: "media_low_res_resources".into(),
                name: "test-trailer-001.mp4".into(),
                mime_type: "video/mp4".into(),
            },
        );

        assert!(step.is_runnable(&ctx));
        step.execute(&mut ctx).await;

        let file = ctx.get::<FileData>(MEDIA_FILE_KEY).unwrap();
        assert_eq!(file.file_uri, "gs://media_low_res_resources/test-trailer-001.mp4");
        assert_eq!(file.mime_type, "video/mp4");
    }

    #[tokio::test]
    async fn requires_a_storage_object() {
        let step = ResolveMediaFile::new("resolve-media-file");
        let ctx = PipelineContext::new();
        assert!(!step.is_runnable(&ctx));
    }
}
