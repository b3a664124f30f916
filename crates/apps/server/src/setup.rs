use crate::api_state::ApiContext;
use app_state::AppSettings;
use cloud_clients::{BigQueryClient, PubSubClient, StorageClient, TokenSource, UrlSigner};
use color_eyre::eyre::{eyre, Result};
use gen_ai::{
    default_safety_settings, GeminiClient, GenerationConfig, ModelInvoker, TextEmbedder,
};
use media_services::{BigQueryCatalog, MediaCatalog, MediaService, SearchService};
use media_workflows::{
    analyze_workflow, resize_workflow, EmbedWorker, PubSubSubscription, StorageEventListener,
    DEFAULT_PROXY_WIDTH,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Logical names wired in configuration.
const HI_RES_SUBSCRIPTION: &str = "hi_res";
const LO_RES_SUBSCRIPTION: &str = "lo_res";
const AGENT_MODEL: &str = "creative_flash";
const EMBEDDING_MODEL: &str = "multi_lingual";

/// Everything the running server owns: services for the API plus the
/// background task handles for shutdown.
pub struct ServiceState {
    search: Arc<SearchService>,
    media: Arc<MediaService>,
    storage: Arc<StorageClient>,
    hi_res_bucket: String,
    background: Vec<JoinHandle<()>>,
}

impl ServiceState {
    pub async fn initialize(
        settings: &AppSettings,
        transcoder_path: &str,
        probe_path: &str,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let project = &settings.application.project_id;
        let token = Arc::new(TokenSource::new());
        let storage = Arc::new(StorageClient::new(token.clone()));
        let pubsub = PubSubClient::new(token.clone(), project);
        let bigquery = BigQueryClient::new(token.clone(), project);

        let catalog: Arc<dyn MediaCatalog> = Arc::new(BigQueryCatalog::new(
            bigquery,
            &settings.columnar.dataset,
            &settings.columnar.media_table,
            &settings.columnar.embedding_table,
        ));

        let gemini = Arc::new(GeminiClient::new(
            token.clone(),
            project,
            &settings.application.location,
        ));

        let agent = settings
            .agent_models
            .get(AGENT_MODEL)
            .ok_or_else(|| eyre!("no '{AGENT_MODEL}' agent model configured"))?;
        let invoker = Arc::new(
            ModelInvoker::new(gemini.clone(), &agent.model, agent.rate_limit)
                .with_generation_config(GenerationConfig {
                    temperature: Some(agent.temperature),
                    top_p: Some(agent.top_p),
                    top_k: Some(agent.top_k),
                    max_output_tokens: Some(agent.max_tokens),
                    response_mime_type: Some(agent.output_format.clone()),
                })
                .with_system_instruction(&agent.system_instructions)
                .with_safety_settings(default_safety_settings()),
        );

        let embedding = settings
            .embedding_models
            .get(EMBEDDING_MODEL)
            .ok_or_else(|| eyre!("no '{EMBEDDING_MODEL}' embedding model configured"))?;
        let embedder: Arc<dyn TextEmbedder> = gemini;

        let mut background = Vec::new();

        // resize on hi-res uploads, analyze on lo-res proxies
        let resize = Arc::new(resize_workflow(
            settings,
            storage.clone(),
            transcoder_path,
            DEFAULT_PROXY_WIDTH,
        ));
        let analyze = Arc::new(analyze_workflow(
            settings,
            invoker,
            catalog.clone(),
            probe_path,
        ));
        for (logical, handler) in [(HI_RES_SUBSCRIPTION, resize), (LO_RES_SUBSCRIPTION, analyze)] {
            let subscription = settings
                .subscriptions
                .get(logical)
                .ok_or_else(|| eyre!("no '{logical}' subscription configured"))?;
            let listener = StorageEventListener::new(
                Arc::new(PubSubSubscription::new(pubsub.clone(), &subscription.name)),
                Some(handler),
            );
            background.push(listener.listen(cancel.child_token())?);
        }

        let embed_worker = Arc::new(EmbedWorker::new(
            catalog.clone(),
            embedder.clone(),
            &embedding.model,
        ));
        background.push(embed_worker.start(cancel.child_token()));

        let search = Arc::new(SearchService::new(
            embedder,
            &embedding.model,
            catalog.clone(),
        ));
        let signer = UrlSigner::new(token, &settings.application.signer_service_account_email);
        let media = Arc::new(MediaService::new(catalog, signer));

        Ok(Self {
            search,
            media,
            storage,
            hi_res_bucket: settings.storage.hi_res_bucket.clone(),
            background,
        })
    }

    #[must_use]
    pub fn api_context(&self) -> ApiContext {
        ApiContext {
            search: self.search.clone(),
            media: self.media.clone(),
            storage: self.storage.clone(),
            hi_res_bucket: self.hi_res_bucket.clone(),
        }
    }

    /// Waits for the background tasks after cancellation.
    pub async fn join(self) {
        for handle in self.background {
            let _ = handle.await;
        }
    }
}
