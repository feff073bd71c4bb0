mod sampler_registry;

pub use sampler_registry::*;
