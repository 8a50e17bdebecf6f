use foundation::bounds::Aabb3;
use scene::World;
use scene::components::{Material, Mesh, ShadowFlags};
use scene::entity::NodeId;

/// One drawable piece of a decoded model, already in model space.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPart {
    pub name: String,
    pub mesh: Mesh,
    pub material: Material,
}

/// A decoded model: a flat list of parts with node transforms baked in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelData {
    pub parts: Vec<ModelPart>,
}

impl ModelData {
    pub fn bounds(&self) -> Aabb3 {
        self.parts
            .iter()
            .fold(Aabb3::empty(), |acc, p| acc.union(&p.mesh.bounds()))
    }

    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|p| p.mesh.triangle_count()).sum()
    }
}

/// Spawn `model` under a fresh root node and return the root.
///
/// Parts start without shadow flags; callers decide how the model takes part
/// in shadowing.
pub fn spawn_model(world: &mut World, model: &ModelData) -> NodeId {
    let root = world.spawn("model-root");
    for part in &model.parts {
        let id = world.spawn_mesh(Some(root), part.name.clone(), part.mesh.clone(), part.material);
        world.set_shadows(id, ShadowFlags::none());
    }
    root
}
