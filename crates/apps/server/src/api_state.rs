use cloud_clients::StorageClient;
use media_services::{MediaService, SearchService};
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiContext {
    pub search: Arc<SearchService>,
    pub media: Arc<MediaService>,
    pub storage: Arc<StorageClient>,
    pub hi_res_bucket: String,
}
