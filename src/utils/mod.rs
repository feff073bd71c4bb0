mod id;
pub(crate) mod time;

pub use id::*;
