use foundation::math::Vec3;

use crate::World;
use crate::components::{Material, Mesh, ShadowFlags, Transform};
use crate::entity::NodeId;

/// Translucent disc that anchors the subject's shadow.
pub fn spawn_ground_shadow(world: &mut World, radius: f32, opacity: f32) -> NodeId {
    let id = world.spawn_mesh(
        None,
        "ground-shadow",
        Mesh::disc_xz(radius, 48),
        Material::shadow_catcher(opacity),
    );
    world.set_shadows(id, ShadowFlags::receive_only());
    id
}

/// Move the ground plane to height `y`, keeping it centered under the origin.
pub fn place_ground_shadow(world: &mut World, ground: NodeId, y: f64) {
    world.set_transform(ground, Transform::translate(Vec3::new(0.0, y, 0.0)));
}
