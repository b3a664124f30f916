use crate::{
    AssembleMedia, ExternalTranscode, MediaLengthProbe, ParseNotification, PersistMedia,
    ReleaseModelFile, RequestSummary, ResolveMediaFile, SceneExtractor, SummaryJsonToStruct,
    UploadToStorage,
};
use app_state::AppSettings;
use cloud_clients::StorageClient;
use gen_ai::ModelInvoker;
use media_services::MediaCatalog;
use pipeline::Pipeline;
use std::sync::Arc;

pub const DEFAULT_TRANSCODER: &str = "ffmpeg";
pub const DEFAULT_PROBE: &str = "ffprobe";
pub const DEFAULT_PROXY_WIDTH: u32 = 240;

/// The resize workflow: notification → transcode to a lo-res proxy → upload
/// into the output bucket. Triggered by hi-res bucket notifications.
#[must_use]
pub fn resize_workflow(
    settings: &AppSettings,
    storage: Arc<StorageClient>,
    transcoder_path: &str,
    target_width: u32,
) -> Pipeline {
    Pipeline::new("media-resize")
        .add_step(ParseNotification::new("parse-notification"))
        .add_step(ExternalTranscode::new(
            "video-resize",
            transcoder_path,
            target_width,
            storage.clone(),
            settings.storage.fuse_mount_point.clone(),
        ))
        .add_step(UploadToStorage::new(
            "upload-lo-res",
            storage,
            &settings.storage.lo_res_bucket,
        ))
}

/// The analyze workflow: notification → summary → parallel scene extraction →
/// assembly → persist. Triggered by lo-res bucket notifications.
#[must_use]
pub fn analyze_workflow(
    settings: &AppSettings,
    invoker: Arc<ModelInvoker>,
    catalog: Arc<dyn MediaCatalog>,
    probe_path: &str,
) -> Pipeline {
    let mut categories: Vec<(String, String)> = settings
        .categories
        .iter()
        .map(|(key, category)| (key.clone(), category.definition.clone()))
        .collect();
    categories.sort();

    Pipeline::new("media-analyze")
        .add_step(ParseNotification::new("parse-notification"))
        .add_step(MediaLengthProbe::new(
            "probe-media-length",
            probe_path,
            settings.storage.fuse_mount_point.clone(),
        ))
        .add_step(ResolveMediaFile::new("resolve-media-file"))
        .add_step(RequestSummary::new(
            "generate-media-summary",
            invoker.clone(),
            &settings.prompts.summary,
            categories,
        ))
        .add_step(SummaryJsonToStruct::new(
            "convert-media-summary",
            settings.category_keys(),
            settings.ratings.clone(),
        ))
        .add_step(SceneExtractor::new(
            "extract-media-scenes",
            invoker,
            &settings.prompts.scene,
            settings.application.thread_pool_size,
        ))
        .add_step(AssembleMedia::new("assemble-media-scenes"))
        .add_step(PersistMedia::new("persist-media", catalog))
        .add_step(ReleaseModelFile::new("cleanup-model-file"))
}
