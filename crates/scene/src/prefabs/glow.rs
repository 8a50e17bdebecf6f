use crate::World;
use crate::components::{Light, Material, Mesh, ShadowFlags, Transform};
use crate::entity::NodeId;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlowStyle {
    pub color: [f32; 3],
    pub intensity: f32,
    pub range: f32,
    pub marker_radius: f32,
}

/// Attach a point light with a small emissive marker under `parent`, placed
/// by `local` in the parent's space.
pub fn attach_glow_marker(
    world: &mut World,
    parent: NodeId,
    local: Transform,
    style: GlowStyle,
) -> NodeId {
    let marker = world.spawn_mesh(
        Some(parent),
        "glow-marker",
        Mesh::octahedron(style.marker_radius),
        Material::emissive(style.color),
    );
    world.set_transform(marker, local);
    world.set_shadows(marker, ShadowFlags::none());
    world.set_light(
        marker,
        Light::Point {
            color: style.color,
            intensity: style.intensity,
            range: style.range,
        },
    );
    marker
}
