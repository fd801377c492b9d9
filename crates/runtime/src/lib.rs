pub mod debounce;
pub mod interval;
pub mod metrics;

pub use debounce::*;
pub use interval::*;
pub use metrics::*;
