pub mod classifier;
pub mod delta;

pub use delta::detect;
