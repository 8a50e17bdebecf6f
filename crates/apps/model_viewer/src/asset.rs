use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use formats::{ModelData, spawn_model};
use scene::World;
use scene::components::{ShadowFlags, Transform};
use scene::entity::NodeId;
use scene::prefabs::{GlowStyle, attach_glow_marker, place_ground_shadow};

use crate::config::AssetConfig;

/// A model installed into the scene.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ModelAsset {
    pub root: NodeId,
    /// Bounds before normalization, in the file's own units.
    pub source_bounds: Aabb3,
    pub scale: f64,
    pub glow: NodeId,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum LoadState {
    #[default]
    Pending,
    Ready(ModelAsset),
    Failed,
}

impl LoadState {
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Pending)
    }

    pub fn asset(&self) -> Option<&ModelAsset> {
        match self {
            LoadState::Ready(asset) => Some(asset),
            _ => None,
        }
    }
}

/// Uniform scale that makes the largest dimension `target_diagonal *
/// device_factor`. A zero-size model keeps `device_factor`.
pub fn normalization_scale(bounds: &Aabb3, target_diagonal: f64, device_factor: f64) -> f64 {
    let max_dimension = bounds.max_dimension();
    if max_dimension > 0.0 && max_dimension.is_finite() {
        target_diagonal / max_dimension * device_factor
    } else {
        device_factor
    }
}

/// Spawn `model`, center and scale it, enable shadows on its parts, hang the
/// glow marker under it and drop `ground` to its lowest point.
pub fn install_model(
    world: &mut World,
    model: &ModelData,
    ground: NodeId,
    config: &AssetConfig,
    device_factor: f64,
) -> ModelAsset {
    let source_bounds = model.bounds();
    let center = if source_bounds.is_empty() {
        Vec3::ZERO
    } else {
        source_bounds.center()
    };
    let scale = normalization_scale(&source_bounds, config.target_diagonal, device_factor);

    let root = spawn_model(world, model);
    world.set_transform(
        root,
        Transform {
            position: -(center * scale),
            scale,
        },
    );
    for id in world.descendants(root) {
        if world.node(id).is_some_and(|n| n.drawable.is_some()) {
            world.set_shadows(id, ShadowFlags::cast_and_receive());
        }
    }

    let floor = world.world_bounds(root).min.y;
    if floor.is_finite() {
        place_ground_shadow(world, ground, floor);
    }

    // Counter the root's scale so the offset and marker size stay in
    // normalized units.
    let offset = Vec3::from(config.glow_offset);
    let glow = attach_glow_marker(
        world,
        root,
        Transform {
            position: center + offset * (1.0 / scale),
            scale: 1.0 / scale,
        },
        GlowStyle {
            color: config.glow_color,
            intensity: config.glow_intensity,
            range: config.glow_range,
            marker_radius: config.glow_marker_radius,
        },
    );

    log::info!(
        "model installed: {} parts, {} triangles, scale {scale:.4}",
        model.parts.len(),
        model.triangle_count()
    );

    ModelAsset {
        root,
        source_bounds,
        scale,
        glow,
    }
}

#[cfg(target_arch = "wasm32")]
pub async fn fetch_model(url: &str) -> Result<ModelData, formats::ModelLoadError> {
    use formats::ModelLoadError;
    use gloo_net::http::Request;

    let fetch_error = |e: gloo_net::Error| ModelLoadError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    };
    let resp = Request::get(url).send().await.map_err(fetch_error)?;
    if !resp.ok() {
        return Err(ModelLoadError::HttpStatus {
            url: url.to_string(),
            status: resp.status(),
        });
    }
    let bytes = resp.binary().await.map_err(fetch_error)?;
    log::debug!("fetched {} bytes from {url}", bytes.len());
    formats::decode_glb(&bytes)
}

#[cfg(test)]
mod tests {
    use super::{install_model, normalization_scale};
    use crate::config::AssetConfig;
    use foundation::bounds::Aabb3;
    use foundation::math::Vec3;
    use formats::{ModelData, ModelPart};
    use scene::World;
    use scene::components::{Light, Material, Mesh};
    use scene::prefabs::spawn_ground_shadow;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn box_model(min: [f32; 3], max: [f32; 3]) -> ModelData {
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        let positions = vec![[x0, y0, z0], [x1, y0, z0], [x1, y1, z1], [x0, y1, z1]];
        ModelData {
            parts: vec![
                ModelPart {
                    name: "a".to_string(),
                    mesh: Mesh::new(positions.clone(), Vec::new(), vec![0, 1, 2]),
                    material: Material::default(),
                },
                ModelPart {
                    name: "b".to_string(),
                    mesh: Mesh::new(positions, Vec::new(), vec![0, 2, 3]),
                    material: Material::default(),
                },
            ],
        }
    }

    #[test]
    fn scale_targets_largest_dimension() {
        let b = Aabb3::new(Vec3::ZERO, Vec3::new(2.0, 8.0, 1.0));
        assert_eq!(normalization_scale(&b, 4.0, 1.0), 0.5);
        assert_eq!(normalization_scale(&b, 4.0, 0.8), 0.4);

        let point = Aabb3::new(Vec3::splat(3.0), Vec3::splat(3.0));
        assert_eq!(normalization_scale(&point, 4.0, 0.8), 0.8);
    }

    #[test]
    fn offset_model_is_centered_and_normalized() {
        for device_factor in [1.0, 0.8] {
            let mut world = World::new();
            let ground = spawn_ground_shadow(&mut world, 3.0, 0.25);
            let model = box_model([4.0, 4.0, 4.0], [6.0, 6.0, 6.0]);
            let config = AssetConfig::default();

            let asset = install_model(&mut world, &model, ground, &config, device_factor);

            let placed = world.world_bounds(asset.root);
            let center = placed.center();
            assert!(close(center.x, 0.0) && close(center.y, 0.0) && close(center.z, 0.0));
            assert!(close(placed.max_dimension(), 4.0 * device_factor));
            assert_eq!(asset.source_bounds.center(), Vec3::splat(5.0));

            let ground_y = world.world_transform(ground).position.y;
            assert!(close(ground_y, -2.0 * device_factor));
        }
    }

    #[test]
    fn every_part_casts_and_receives() {
        let mut world = World::new();
        let ground = spawn_ground_shadow(&mut world, 3.0, 0.25);
        let asset = install_model(
            &mut world,
            &box_model([0.0; 3], [1.0; 3]),
            ground,
            &AssetConfig::default(),
            1.0,
        );
        let parts: Vec<_> = world
            .drawables_3d()
            .into_iter()
            .filter(|d| d.node != ground && d.node != asset.glow)
            .collect();
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|d| d.shadows.cast && d.shadows.receive));
    }

    #[test]
    fn empty_model_stays_at_origin() {
        let mut world = World::new();
        let ground = spawn_ground_shadow(&mut world, 3.0, 0.25);
        let asset = install_model(
            &mut world,
            &ModelData::default(),
            ground,
            &AssetConfig::default(),
            0.8,
        );

        let root = world.world_transform(asset.root);
        assert_eq!(root.position, Vec3::ZERO);
        assert_eq!(root.scale, 0.8);
        assert_eq!(world.world_transform(ground).position, Vec3::ZERO);
        let glow = world.world_transform(asset.glow);
        assert!(glow.position.x.is_finite() && glow.position.y.is_finite());
    }

    #[test]
    fn glow_sits_at_normalized_offset() {
        let mut world = World::new();
        let ground = spawn_ground_shadow(&mut world, 3.0, 0.25);
        let config = AssetConfig::default();
        let asset = install_model(
            &mut world,
            &box_model([10.0, 0.0, 0.0], [30.0, 20.0, 20.0]),
            ground,
            &config,
            1.0,
        );

        let glow = world.world_transform(asset.glow);
        assert!(close(glow.scale, 1.0));
        assert!(close(glow.position.x, 0.0));
        assert!(close(glow.position.y, 0.35));
        assert!(close(glow.position.z, 0.0));

        let node = world.node(asset.glow).expect("glow node");
        assert!(!node.shadows.cast);
        assert!(matches!(node.light, Some(Light::Point { .. })));
    }
}
