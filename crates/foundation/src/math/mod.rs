pub mod scalar;
pub mod vec;

pub use scalar::*;
pub use vec::*;
