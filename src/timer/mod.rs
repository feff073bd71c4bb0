mod publish_timer;
mod sampling_timer;

pub use publish_timer::*;
pub use sampling_timer::*;
