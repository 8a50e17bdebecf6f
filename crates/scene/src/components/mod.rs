pub mod drawable3d;
pub mod light;
pub mod material;
pub mod mesh;
pub mod shadow;
pub mod transform;
pub mod visibility;

pub use drawable3d::*;
pub use light::*;
pub use material::*;
pub use mesh::*;
pub use shadow::*;
pub use transform::*;
pub use visibility::*;
