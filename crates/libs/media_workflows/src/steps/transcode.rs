use crate::STORAGE_OBJECT_KEY;
use async_trait::async_trait;
use cloud_clients::StorageClient;
use color_eyre::eyre::eyre;
use media_model::StorageObject;
use pipeline::{PipelineContext, Step, StepMeta};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::info;

/// Invokes the external transcoder to derive the lo-res proxy. The input is
/// read from the bucket mount when one is configured, otherwise downloaded to
/// a temp file first; the output lands in a temp file the context cleans up
/// after the upload step has consumed it.
pub struct ExternalTranscode {
    meta: StepMeta,
    command_path: String,
    target_width: u32,
    storage: Arc<StorageClient>,
    fuse_mount_point: Option<String>,
}

impl ExternalTranscode {
    #[must_use]
    pub fn new(
        name: &str,
        command_path: &str,
        target_width: u32,
        storage: Arc<StorageClient>,
        fuse_mount_point: Option<String>,
    ) -> Self {
        Self {
            meta: StepMeta::new(name),
            command_path: command_path.to_string(),
            target_width,
            storage,
            fuse_mount_point,
        }
    }

    async fn resolve_input(
        &self,
        ctx: &mut PipelineContext,
        object: &StorageObject,
    ) -> color_eyre::Result<PathBuf> {
        if let Some(mount) = &self.fuse_mount_point {
            return Ok(Path::new(mount).join(&object.bucket).join(&object.name));
        }
        let path = self
            .storage
            .download_to_temp(&object.bucket, &object.name)
            .await?;
        ctx.track_temp(&path);
        Ok(path)
    }
}

/// Format-preserving scale: fixed width, height derived from the aspect ratio
/// and forced even (required by yuv420 encoders).
fn scale_filter(target_width: u32) -> String {
    format!("scale=w={target_width}:h=trunc(ow/a/2)*2")
}

fn transcode_args(input: &Path, target_width: u32, output: &Path) -> Vec<OsString> {
    vec![
        "-analyzeduration".into(),
        "0".into(),
        "-probesize".into(),
        "5000000".into(),
        "-y".into(),
        "-hide_banner".into(),
        "-i".into(),
        input.as_os_str().to_owned(),
        "-filter:v".into(),
        scale_filter(target_width).into(),
        "-f".into(),
        "mp4".into(),
        output.as_os_str().to_owned(),
    ]
}

#[async_trait]
impl Step for ExternalTranscode {
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

        let input = match self.resolve_input(ctx, &object).await {
            Ok(input) => input,
            Err(error) => {
                self.meta.record_error();
                ctx.add_error(self.meta.name(), error.wrap_err("failed to resolve input"));
                return;
            }
        };

        let output = match tempfile::Builder::new()
            .prefix("transcode-output-")
            .suffix(".mp4")
            .tempfile()
            .and_then(|file| file.keep().map_err(|e| std::io::Error::other(e.to_string())))
        {
            Ok((file, path)) => {
                drop(file);
                path
            }
            Err(error) => {
                self.meta.record_error();
                ctx.add_error(
                    self.meta.name(),
                    eyre!("could not create a temp output file: {error}"),
                );
                return;
            }
        };

        let result = Command::new(&self.command_path)
            .args(transcode_args(&input, self.target_width, &output))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(status) if status.status.success() => {
                info!(
                    object = %object.name,
                    output = %output.display(),
                    "transcode completed"
                );
                self.meta.record_success();
                ctx.track_temp(&output);
                ctx.put(self.meta.output_key(), output);
            }
            Ok(status) => {
                let stderr = String::from_utf8_lossy(&status.stderr);
                let _ = std::fs::remove_file(&output);
                self.meta.record_error();
                ctx.add_error(
                    self.meta.name(),
                    eyre!("transcoder failed: {}", stderr.trim()),
                );
            }
            Err(error) => {
                let _ = std::fs::remove_file(&output);
                self.meta.record_error();
                ctx.add_error(self.meta.name(), eyre!("failed to run transcoder: {error}"));
            }
        }
    }
}
