#![allow(clippy::missing_errors_doc)]

mod examples;
mod notification;
mod persistent;
mod timecode;
mod transient;
mod validate;

pub use examples::*;
pub use notification::*;
pub use persistent::*;
pub use timecode::*;
pub use transient::*;
pub use validate::*;
