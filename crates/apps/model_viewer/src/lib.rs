pub mod asset;
pub mod config;
pub mod device;
pub mod input;
pub mod motion;
pub mod session;
pub mod surface;

#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
mod wgpu;

pub use config::{ConfigError, ViewerConfig};
pub use session::{DisplaySurface, DrawContext, ViewerSession};
#[cfg(target_arch = "wasm32")]
pub use web::ModelViewer;
