pub mod candidate;
pub mod gav;

pub use candidate::*;
pub use gav::*;
