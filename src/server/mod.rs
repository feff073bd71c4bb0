//! The subscription server: the synchronous core, the actor that owns it and
//! the handle callers use to reach it.

mod core;
mod event;
mod handle;
#[allow(clippy::module_inception)]
mod server;

pub use self::core::*;
pub use event::*;
pub use handle::*;
pub use server::*;
