use crate::components::{Material, MeshId};

/// Mesh plus the material it is drawn with.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Drawable3D {
    pub mesh: MeshId,
    pub material: Material,
}

impl Drawable3D {
    pub fn new(mesh: MeshId, material: Material) -> Self {
        Self { mesh, material }
    }
}
