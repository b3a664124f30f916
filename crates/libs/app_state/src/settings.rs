use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub application: ApplicationSettings,
    pub storage: StorageSettings,
    pub columnar: ColumnarSettings,
    pub prompts: PromptSettings,
    pub subscriptions: HashMap<String, SubscriptionSettings>,
    pub embedding_models: HashMap<String, EmbeddingModelSettings>,
    pub agent_models: HashMap<String, AgentModelSettings>,
    pub categories: HashMap<String, CategorySettings>,
    #[serde(default = "default_ratings")]
    pub ratings: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    pub name: String,
    pub project_id: String,
    pub location: String,
    /// Worker count for the parallel scene extractor.
    pub thread_pool_size: usize,
    pub signer_service_account_email: String,
}

/// Bucket layout: user uploads land in `hi_res_bucket`, transcoded proxies in
/// `lo_res_bucket`. When `fuse_mount_point` is set, objects are also reachable
/// as `<mount>/<bucket>/<name>` and the transcoder reads them straight from
/// the mount instead of downloading.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub hi_res_bucket: String,
    pub lo_res_bucket: String,
    pub fuse_mount_point: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ColumnarSettings {
    pub dataset: String,
    pub media_table: String,
    pub embedding_table: String,
}

/// Prompt templates with `{{.FIELD}}` placeholders.
#[derive(Debug, Deserialize, Clone)]
pub struct PromptSettings {
    pub summary: String,
    pub scene: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubscriptionSettings {
    pub name: String,
    #[serde(default)]
    pub dead_letter: Option<String>,
    #[serde(default = "default_subscription_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingModelSettings {
    pub model: String,
    pub max_requests_per_minute: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentModelSettings {
    pub model: String,
    pub system_instructions: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: f32,
    pub max_tokens: i32,
    pub output_format: String,
    /// Requests per second admitted to the model; also the burst size.
    pub rate_limit: u32,
}

/// A media category with optional per-category prompt overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct CategorySettings {
    pub name: String,
    pub definition: String,
    #[serde(default)]
    pub system_instructions: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub scene: Option<String>,
}

impl AppSettings {
    #[must_use]
    pub fn category_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.categories.keys().cloned().collect();
        keys.sort();
        keys
    }

    #[must_use]
    pub fn is_known_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    #[must_use]
    pub fn is_known_rating(&self, rating: &str) -> bool {
        self.ratings.iter().any(|r| r == rating)
    }
}

fn default_subscription_timeout() -> u64 {
    60
}

fn default_ratings() -> Vec<String> {
    ["G", "PG", "PG-13", "R", "NC-17"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}
