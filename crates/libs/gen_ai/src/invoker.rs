use crate::{
    Content, Counter, GenAiError, GenerateRequest, GenerateResponse, GenerationConfig,
    GenerativeModel, SafetySetting, TokenBucket,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Sleep before re-entering acquisition after the limiter denies a request.
const LIMITER_DENIED_BACKOFF: Duration = Duration::from_secs(5);
/// Sleep between attempts after the model itself fails.
const FAILURE_BACKOFF: Duration = Duration::from_secs(60);
/// Retries after the first failed attempt, in the invoker and in
/// [`generate_multimodal`] alike.
pub const MAX_RETRIES: u32 = 3;

/// Rate-limited, retry-aware front end to a generative model.
///
/// Two distinct guards: the token bucket absorbs quota pressure (denied
/// acquisition waits 5 s and tries again, without charging a retry), while the
/// 60-second backoff absorbs transient failures (at most [`MAX_RETRIES`]
/// retries before giving up). The helper [`generate_multimodal`] layers its
/// own counted retry on top; both layers are intentional.
pub struct ModelInvoker {
    backend: Arc<dyn GenerativeModel>,
    model_name: String,
    limiter: TokenBucket,
    generation_config: GenerationConfig,
    system_instruction: Option<String>,
    safety_settings: Vec<SafetySetting>,
}

impl ModelInvoker {
    #[must_use]
    pub fn new(backend: Arc<dyn GenerativeModel>, model_name: &str, rate_limit: u32) -> Self {
        Self {
            backend,
            model_name: model_name.to_string(),
            limiter: TokenBucket::new(rate_limit),
            generation_config: GenerationConfig::default(),
            system_instruction: None,
            safety_settings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = config;
        self
    }

    #[must_use]
    pub fn with_system_instruction(mut self, instruction: &str) -> Self {
        self.system_instruction = Some(instruction.to_string());
        self
    }

    #[must_use]
    pub fn with_safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = settings;
        self
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn build_request(&self, contents: Vec<Content>) -> GenerateRequest {
        GenerateRequest {
            contents,
            system_instruction: self
                .system_instruction
                .as_deref()
                .map(|text| Content {
                    role: "system".to_string(),
                    parts: vec![crate::Part::text(text)],
                }),
            generation_config: Some(self.generation_config.clone()),
            safety_settings: self.safety_settings.clone(),
        }
    }

    /// Calls the model under the limiter with the long-backoff retry loop.
    pub async fn generate(
        &self,
        cancel: &CancellationToken,
        contents: Vec<Content>,
    ) -> Result<GenerateResponse, GenAiError> {
        let request = self.build_request(contents);
        let mut retries: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(GenAiError::Cancelled);
            }
            if !self.limiter.try_acquire() {
                // quota pressure: wait out the bucket and re-enter
                // acquisition, no retry charged
                if !sleep_cancellable(cancel, LIMITER_DENIED_BACKOFF).await {
                    return Err(GenAiError::Cancelled);
                }
                continue;
            }
            match self
                .backend
                .generate_content(&self.model_name, &request)
                .await
            {
                Ok(response) => return Ok(response),
                Err(error) => {
                    if retries >= MAX_RETRIES {
                        return Err(GenAiError::MaxRetries(Box::new(error)));
                    }
                    retries += 1;
                    warn!(
                        model = %self.model_name,
                        retries,
                        "generation failed, backing off: {error}"
                    );
                    if !sleep_cancellable(cancel, FAILURE_BACKOFF).await {
                        return Err(GenAiError::Cancelled);
                    }
                }
            }
        }
    }
}

/// Returns false when cancelled before the sleep completes.
async fn sleep_cancellable(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

/// Executes a multimodal request with counted retries and token accounting,
/// and returns the response text with any ```json fences stripped.
pub async fn generate_multimodal(
    cancel: &CancellationToken,
    input_tokens: &Counter,
    output_tokens: &Counter,
    retry_counter: &Counter,
    try_count: u32,
    invoker: &ModelInvoker,
    contents: &[Content],
) -> Result<String, GenAiError> {
    let mut try_count = try_count;
    loop {
        match invoker.generate(cancel, contents.to_vec()).await {
            Err(error) => {
                if try_count < MAX_RETRIES && !matches!(error, GenAiError::Cancelled) {
                    retry_counter.add(1);
                    try_count += 1;
                    continue;
                }
                return Err(error);
            }
            Ok(response) => {
                if let Some(usage) = &response.usage_metadata {
                    input_tokens.add(usage.prompt_token_count);
                    output_tokens.add(usage.candidates_token_count);
                }
                return Ok(strip_json_fence(&response.text()));
            }
        }
    }
}

fn strip_json_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_prefix = trimmed.strip_prefix("```json").unwrap_or(trimmed);
    let without_suffix = without_prefix
        .strip_suffix("```")
        .unwrap_or(without_prefix);
    without_suffix.trim().to_string()
}
