use crate::MEDIA_KEY;
use async_trait::async_trait;
use color_eyre::eyre::eyre;
use media_model::Media;
use media_services::MediaCatalog;
use pipeline::{PipelineContext, Step, StepMeta};
use std::sync::Arc;
use tracing::info;

/// Streams the assembled media row into the columnar store. A failure here is
/// fatal to the run so the bus redelivers the notification.
pub struct PersistMedia {
    meta: StepMeta,
    catalog: Arc<dyn MediaCatalog>,
}

impl PersistMedia {
    #[must_use]
    pub fn new(name: &str, catalog: Arc<dyn MediaCatalog>) -> Self {
        Self {
            meta: StepMeta::new(name),
            catalog,
        }
    }
}

#[async_trait]
impl Step for PersistMedia {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn is_runnable(&self, ctx: &PipelineContext) -> bool {
        ctx.contains(MEDIA_KEY)
    }

    async fn execute(&self, ctx: &mut PipelineContext) {
        let Some(media) = ctx.get::<Media>(MEDIA_KEY).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing assembled media"));
            return;
        };

        match self.catalog.insert_media(&media).await {
            Ok(()) => {
                info!(id = %media.id, title = %media.title, "media row persisted");
                self.meta.record_success();
                ctx.put(self.meta.output_key(), media);
            }
            Err(error) => {
                self.meta.record_error();
                ctx.add_error(
                    self.meta.name(),
                    eyre!("insert failed for '{}': {error}", media.title),
                );
            }
        }
    }
}
