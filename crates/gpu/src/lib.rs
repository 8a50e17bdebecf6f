pub mod camera;
pub mod lighting;
pub mod renderer;
pub mod shadow;

pub use camera::*;
pub use lighting::*;
pub use renderer::*;
pub use shadow::*;
