//! Publish request queueing and delivery, one engine per session plus the
//! orphan engine.

mod diagnostics;
#[allow(clippy::module_inception)]
mod publish_engine;

pub use diagnostics::*;
pub use publish_engine::*;
