//! The three workflows over the pipeline runtime: resize (transcode to a
//! lo-res proxy), analyze (summarize, extract scenes in parallel, persist),
//! and embed (background vector fill), plus the bus listener that feeds them.

mod embed_worker;
mod keys;
mod listener;
mod prompt;
mod steps;
mod workflows;

pub use embed_worker::*;
pub use keys::*;
pub use listener::*;
pub use prompt::*;
pub use steps::*;
pub use workflows::*;
