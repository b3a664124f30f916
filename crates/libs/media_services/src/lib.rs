//! Read/query services over the columnar store: the catalog seam, its
//! BigQuery implementation, scene vector search, and media reads with signed
//! streaming URLs.

mod bigquery;
mod catalog;
mod media;
mod queries;
mod search;

pub use bigquery::*;
pub use catalog::*;
pub use media::*;
pub use queries::*;
pub use search::*;
