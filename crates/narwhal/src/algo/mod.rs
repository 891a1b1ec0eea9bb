pub mod force;
pub mod rng;

pub use force::{ForceOptions, ForceStats};
