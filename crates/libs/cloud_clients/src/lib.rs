//! Thin typed REST clients for the managed services the pipelines consume:
//! object storage, the notification bus, the columnar store, and URL signing.

mod auth;
mod bigquery;
mod error;
mod pubsub;
mod signer;
mod storage;

pub use auth::*;
pub use bigquery::*;
pub use error::*;
pub use pubsub::*;
pub use signer::*;
pub use storage::*;
