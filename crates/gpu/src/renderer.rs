use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use scene::components::{Material, MeshId, ShadowFlags, Transform};
use scene::world::World;

use crate::camera::OrthographicCamera;
use crate::lighting::SceneLighting;
use crate::shadow::ShadowView;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RenderCommand {
    DrawMesh {
        mesh: MeshId,
        transform: Transform,
        material: Material,
        shadows: ShadowFlags,
    },
}

impl RenderCommand {
    fn is_translucent(&self) -> bool {
        match self {
            RenderCommand::DrawMesh { material, .. } => material.is_translucent(),
        }
    }
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Default)]
pub struct RenderFrame {
    pub view_proj: [[f32; 4]; 4],
    pub lighting: SceneLighting,
    /// Sun view for the shadow pass; `None` when nothing casts a shadow.
    pub shadow: Option<ShadowView>,
    /// Opaque commands first, then translucent ones.
    pub commands: Vec<RenderCommand>,
}

pub struct Renderer;

impl Renderer {
    pub fn collect_3d(world: &World, camera: &OrthographicCamera) -> RenderFrame {
        let mut opaque = Vec::new();
        let mut translucent = Vec::new();
        for instance in world.drawables_3d() {
            let command = RenderCommand::DrawMesh {
                mesh: instance.drawable.mesh,
                transform: instance.world,
                material: instance.drawable.material,
                shadows: instance.shadows,
            };
            if command.is_translucent() {
                translucent.push(command);
            } else {
                opaque.push(command);
            }
        }
        opaque.extend(translucent);

        let lighting = SceneLighting::from_world(world);
        RenderFrame {
            view_proj: camera.view_proj(),
            shadow: shadow_view(world, &lighting, &opaque),
            lighting,
            commands: opaque,
        }
    }
}

/// Fit the sun's shadow frustum around casters and receivers. Requires a
/// shadow-casting sun and at least one caster.
fn shadow_view(
    world: &World,
    lighting: &SceneLighting,
    commands: &[RenderCommand],
) -> Option<ShadowView> {
    if !lighting.sun_casts_shadow {
        return None;
    }
    let mut casters = Aabb3::empty();
    let mut region = Aabb3::empty();
    for command in commands {
        let RenderCommand::DrawMesh {
            mesh,
            transform,
            shadows,
            ..
        } = command;
        if !shadows.cast && !shadows.receive {
            continue;
        }
        let Some(mesh) = world.mesh(*mesh) else {
            continue;
        };
        let bounds = transform.apply_bounds(&mesh.bounds());
        if shadows.cast {
            casters = casters.union(&bounds);
        }
        region = region.union(&bounds);
    }
    if casters.is_empty() {
        return None;
    }
    ShadowView::fit(Vec3::from(lighting.sun_dir), &region)
}

#[cfg(test)]
mod tests {
    use super::{RenderCommand, Renderer};
    use crate::camera::OrthographicCamera;
    use foundation::math::Vec3;
    use scene::components::{Material, Mesh, ShadowFlags, Transform};
    use scene::prefabs::{place_ground_shadow, spawn_ground_shadow, spawn_lighting_rig};
    use scene::world::World;

    #[test]
    fn collect_3d_commands() {
        let mut world = World::new();
        world.spawn_mesh(None, "marker", Mesh::octahedron(1.0), Material::default());

        let mut camera = OrthographicCamera::symmetric(2.0, 2.0, 0.1, 100.0);
        camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        let frame = Renderer::collect_3d(&world, &camera);
        assert!(matches!(
            frame.commands.as_slice(),
            [RenderCommand::DrawMesh { .. }]
        ));
        assert_eq!(frame.view_proj, camera.view_proj());
    }

    #[test]
    fn translucent_commands_come_last() {
        let mut world = World::new();
        spawn_ground_shadow(&mut world, 3.0, 0.3);
        world.spawn_mesh(None, "marker", Mesh::octahedron(1.0), Material::default());

        let camera = OrthographicCamera::symmetric(2.0, 2.0, 0.1, 100.0);
        let frame = Renderer::collect_3d(&world, &camera);
        assert_eq!(frame.commands.len(), 2);
        assert!(!frame.commands[0].is_translucent());
        assert!(frame.commands[1].is_translucent());
    }

    fn camera() -> OrthographicCamera {
        let mut camera = OrthographicCamera::symmetric(4.0, 4.0, 0.1, 100.0);
        camera.look_at(Vec3::new(10.0, 8.0, 10.0), Vec3::ZERO);
        camera
    }

    #[test]
    fn casters_under_a_shadow_sun_get_a_light_view() {
        let mut world = World::new();
        spawn_lighting_rig(&mut world);
        let ground = spawn_ground_shadow(&mut world, 3.0, 0.3);
        place_ground_shadow(&mut world, ground, -1.0);
        let model = world.spawn_mesh(None, "model", Mesh::octahedron(1.0), Material::default());
        world.set_shadows(model, ShadowFlags::cast_and_receive());
        world.set_transform(model, Transform::translate(Vec3::new(0.0, 0.5, 0.0)));

        let frame = Renderer::collect_3d(&world, &camera());
        let shadow = frame.shadow.expect("shadow view");

        // Caster and the whole ground disc land inside the shadow map.
        for p in [
            Vec3::new(0.0, 1.5, 0.0),
            Vec3::new(1.0, 0.5, 0.0),
            Vec3::new(3.0, -1.0, 0.0),
            Vec3::new(-3.0, -1.0, 0.0),
            Vec3::new(0.0, -1.0, 3.0),
            Vec3::new(0.0, -1.0, -3.0),
        ] {
            let ndc = shadow.project(p);
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{p:?} -> {ndc:?}");
            assert!((0.0..=1.0).contains(&ndc.z), "{p:?} -> {ndc:?}");
        }
        // The model's top is closer to the sun than the ground below it.
        let top = shadow.project(Vec3::new(0.0, 1.5, 0.0));
        let floor = shadow.project(Vec3::new(0.0, -1.0, 0.0));
        assert!(top.z < floor.z);
    }

    #[test]
    fn no_light_view_without_casters() {
        let mut world = World::new();
        spawn_lighting_rig(&mut world);
        spawn_ground_shadow(&mut world, 3.0, 0.3);
        world.spawn_mesh(None, "marker", Mesh::octahedron(0.1), Material::emissive([1.0; 3]));

        let frame = Renderer::collect_3d(&world, &camera());
        assert!(frame.shadow.is_none());
    }

    #[test]
    fn no_light_view_without_shadow_sun() {
        let mut world = World::new();
        let model = world.spawn_mesh(None, "model", Mesh::octahedron(1.0), Material::default());
        world.set_shadows(model, ShadowFlags::cast_and_receive());

        let frame = Renderer::collect_3d(&world, &camera());
        assert!(frame.shadow.is_none());
    }
}
