pub mod glow;
pub mod ground;
pub mod lighting;

pub use glow::*;
pub use ground::*;
pub use lighting::*;
