use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The JSON payload an object-store notification delivers on the bus.
///
/// Only `bucket`, `name` and `contentType` matter to the pipelines; everything
/// else (generation, md5Hash, size, timeCreated, ...) is preserved in `extra`
/// without being interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageNotification {
    pub bucket: String,
    pub name: String,
    #[serde(rename = "contentType", default)]
    pub content_type: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Minimal projection of a notification: where the object lives and what it is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageObject {
    pub bucket: String,
    pub name: String,
    pub mime_type: String,
}

impl From<&StorageNotification> for StorageObject {
    fn from(notification: &StorageNotification) -> Self {
        Self {
            bucket: notification.bucket.clone(),
            name: notification.name.clone(),
            mime_type: notification.content_type.clone(),
        }
    }
}

impl StorageObject {
    /// The `gs://bucket/name` URI used when handing the object to the model.
    #[must_use]
    pub fn gs_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.name)
    }

    /// The direct-access media URL persisted on the `Media` row.
    #[must_use]
    pub fn media_url(&self) -> String {
        format!(
            "https://storage.mtls.cloud.google.com/{}/{}",
            self.bucket, self.name
        )
    }
}
