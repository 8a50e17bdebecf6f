pub mod model;
pub mod model_loader;

pub use model::*;
pub use model_loader::*;
