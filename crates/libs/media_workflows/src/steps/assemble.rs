use crate::{MEDIA_KEY, MEDIA_LENGTH_KEY, SCENES_KEY, STORAGE_OBJECT_KEY, SUMMARY_KEY};
use async_trait::async_trait;
use color_eyre::eyre::eyre;
use media_model::{validate_media, Media, MediaSummary, Scene, StorageObject};
use pipeline::{PipelineContext, Step, StepMeta};
use tracing::warn;

/// Combines the summary and the extracted scene JSON into the final `Media`:
/// identity from the object name, scenes sorted by the model-returned
/// sequence and renumbered into a gap-free 1-based run.
pub struct AssembleMedia {
    meta: StepMeta,
}

impl AssembleMedia {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            meta: StepMeta::new(name).with_output_key(MEDIA_KEY),
        }
    }
}

fn parse_scenes(step_name: &str, raw_scenes: &[String]) -> Vec<Scene> {
    let mut scenes: Vec<Scene> = raw_scenes
        .iter()
        .filter_map(|raw| match serde_json::from_str::<Scene>(raw) {
            Ok(scene) => Some(scene),
            Err(error) => {
                // scene-local damage: drop it, keep the rest of the media
                warn!(step = step_name, "dropping unparsable scene: {error}");
                None
            }
        })
        .collect();
    scenes.sort_by_key(|scene| scene.sequence);
    for (index, scene) in scenes.iter_mut().enumerate() {
        scene.sequence = i32::try_from(index).unwrap_or(i32::MAX) + 1;
    }
    scenes
}

#[async_trait]
impl Step for AssembleMedia {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn is_runnable(&self, ctx: &PipelineContext) -> bool {
        ctx.contains(SUMMARY_KEY) && ctx.contains(SCENES_KEY)
    }

    async fn execute(&self, ctx: &mut PipelineContext) {
        let Some(summary) = ctx.get::<MediaSummary>(SUMMARY_KEY).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing media summary"));
            return;
        };
        let Some(raw_scenes) = ctx.get::<Vec<String>>(SCENES_KEY).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing extracted scenes"));
            return;
        };
        let Some(object) = ctx.get::<StorageObject>(STORAGE_OBJECT_KEY).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing storage object"));
            return;
        };

        let mut media = Media::new(&object.name);
        media.title = summary.title;
        media.category = summary.category;
        media.summary = summary.summary;
        media.director = summary.director;
        media.release_year = summary.release_year;
        media.genre = summary.genre;
        media.rating = summary.rating;
        media.cast = summary.cast;
        media.media_url = summary
            .media_url
            .unwrap_or_else(|| object.media_url());
        // the probed container duration beats the model's estimate
        media.length_seconds = ctx
            .get::<i64>(MEDIA_LENGTH_KEY)
            .copied()
            .unwrap_or(summary.length_seconds);
        media.scenes = parse_scenes(self.meta.name(), &raw_scenes);

        if let Err(error) = validate_media(&media) {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("assembled media rejected: {error}"));
            return;
        }

        self.meta.record_success();
        ctx.put(MEDIA_KEY, media.clone());
        ctx.put(pipeline::OUT_KEY, media);
    }
}
