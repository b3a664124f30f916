use gen_ai::TextEmbedder;
use media_model::SceneEmbedding;
use media_services::MediaCatalog;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, field, info, info_span, warn, Instrument};

const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// What one tick accomplished.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub embedded_media: usize,
    pub failed_media: usize,
}

/// Background task that finds media rows without embeddings, embeds every
/// scene's script, and streams the rows in. Each media is one batch, so a
/// failure aborts only that media's rows and a later tick retries it.
pub struct EmbedWorker {
    catalog: Arc<dyn MediaCatalog>,
    embedder: Arc<dyn TextEmbedder>,
    model_name: String,
    interval: Duration,
}

impl EmbedWorker {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn MediaCatalog>,
        embedder: Arc<dyn TextEmbedder>,
        model_name: &str,
    ) -> Self {
        Self {
            catalog,
            embedder,
            model_name: model_name.to_string(),
            interval: TICK_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Starts the periodic loop. Only one tick runs at a time; cancellation
    /// stops the loop at the next suspension point.
    #[must_use]
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // consume the immediate first tick so the first pass runs one
            // interval after startup, like any other
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let span = info_span!("embedding_tick", status = field::Empty);
                match self.run_tick(&cancel).instrument(span.clone()).await {
                    Ok(report) => {
                        span.record("status", "ok");
                        if report.embedded_media > 0 || report.failed_media > 0 {
                            info!(
                                embedded = report.embedded_media,
                                failed = report.failed_media,
                                "embedding tick completed"
                            );
                        }
                    }
                    Err(tick_error) => {
                        span.record("status", "error");
                        error!("embedding tick failed: {tick_error}");
                    }
                }
            }
        })
    }

    /// One pass over all currently-eligible media.
    pub async fn run_tick(
        &self,
        cancel: &CancellationToken,
    ) -> Result<TickReport, media_services::CatalogError> {
        let eligible = self.catalog.find_unembedded().await?;
        let mut report = TickReport::default();

        'media: for media in eligible {
            if cancel.is_cancelled() {
                break;
            }
            let mut batch: Vec<SceneEmbedding> = Vec::with_capacity(media.scenes.len());
            for scene in &media.scenes {
                match self.embedder.embed(&self.model_name, &scene.script).await {
                    Ok(values) => {
                        let mut row =
                            SceneEmbedding::new(&media.id, scene.sequence, &self.model_name);
                        row.embeddings = values;
                        batch.push(row);
                    }
                    Err(embed_error) => {
                        // abort this media's batch, keep going with the rest
                        warn!(
                            media = %media.id,
                            sequence = scene.sequence,
                            "scene embedding failed: {embed_error}"
                        );
                        report.failed_media += 1;
                        continue 'media;
                    }
                }
            }
            if let Err(insert_error) = self.catalog.insert_embeddings(&batch).await {
                warn!(media = %media.id, "embedding insert failed: {insert_error}");
                report.failed_media += 1;
                continue;
            }
            report.embedded_media += 1;
        }
        Ok(report)
    }
}
