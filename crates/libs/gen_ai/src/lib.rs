//! Clients and guard rails for the generative models: typed wire shapes, a
//! REST client, a token-bucket limiter, and the retry-aware invoker every
//! generative call goes through.

mod client;
mod error;
mod invoker;
mod limiter;
mod metrics;
mod traits;
mod wire;

pub use client::*;
pub use error::*;
pub use invoker::*;
pub use limiter::*;
pub use metrics::*;
pub use traits::*;
pub use wire::*;
