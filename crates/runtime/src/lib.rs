pub mod cancel;
pub mod frame;
pub mod frame_loop;

pub use cancel::*;
pub use frame::*;
pub use frame_loop::*;
