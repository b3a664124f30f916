use crate::{MEDIA_LENGTH_KEY, STORAGE_OBJECT_KEY};
use async_trait::async_trait;
use color_eyre::eyre::eyre;
use media_model::StorageObject;
use pipeline::{PipelineContext, Step, StepMeta};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Probes the container duration in whole seconds (rounded up) via the bucket
/// mount. Only runnable when a mount is configured; assembly falls back to
/// the model's estimate otherwise.
pub struct MediaLengthProbe {
    meta: StepMeta,
    command_path: String,
    fuse_mount_point: Option<String>,
}

impl MediaLengthProbe {
    #[must_use]
    pub fn new(name: &str, command_path: &str, fuse_mount_point: Option<String>) -> Self {
        Self {
            meta: StepMeta::new(name).with_output_key(MEDIA_LENGTH_KEY),
            command_path: command_path.to_string(),
            fuse_mount_point,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_duration_seconds(raw: &[u8]) -> color_eyre::Result<i64> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    let duration: f64 = trimmed
        .parse()
        .map_err(|_| eyre!("got invalid video duration: {trimmed}"))?;
    Ok(duration as i64 + 1)
}

#[async_trait]
impl Step for MediaLengthProbe {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn is_runnable(&self, ctx: &PipelineContext) -> bool {
        self.fuse_mount_point.is_some() && ctx.contains(STORAGE_OBJECT_KEY)
    }

    async fn execute(&self, ctx: &mut PipelineContext) {
        let Some(object) = ctx.get::<StorageObject>(STORAGE_OBJECT_KEY).cloned() else {
            self.meta.record_error();
            ctx.add_error(self.meta.name(), eyre!("missing storage object"));
            return;
        };
        let Some(mount) = &self.fuse_mount_point else {
            return;
        };
        let input = Path::new(mount).join(&object.bucket).join(&object.name);

        let result = Command::new(&self.command_path)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(&input)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => match parse_duration_seconds(&output.stdout)
            {
                Ok(length) => {
                    self.meta.record_success();
                    ctx.put(MEDIA_LENGTH_KEY, length);
                }
                Err(error) => {
                    self.meta.record_error();
                    ctx.add_error(self.meta.name(), error);
                }
            },
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                self.meta.record_error();
                ctx.add_error(self.meta.name(), eyre!("probe failed: {}", stderr.trim()));
            }
            Err(error) => {
                self.meta.record_error();
                ctx.add_error(self.meta.name(), eyre!("failed to run probe: {error}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_round_up_to_whole_seconds() {
        assert_eq!(parse_duration_seconds(b"119.96\n").unwrap(), 120);
        assert_eq!(parse_duration_seconds(b"60.0").unwrap(), 61);
        assert!(parse_duration_seconds(b"N/A").is_err());
    }

    #[test]
    fn not_runnable_without_a_mount() {
        let step = MediaLengthProbe::new("probe-media-length", "ffprobe", None);
        let mut ctx = PipelineContext::new();
        ctx.put(
            STORAGE_OBJECT_KEY,
            StorageObject {
                bucket: "b".into(),
                name: "n.mp4".into(),
                mime_type: "video/mp4".into(),
            },
        );
        assert!(!step.is_runnable(&ctx));
    }
}
