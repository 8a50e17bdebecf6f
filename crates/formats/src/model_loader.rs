use glam::{Mat3, Mat4};
use scene::components::{Material, Mesh};

use crate::model::{ModelData, ModelPart};

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to fetch model from {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("model request to {url} failed with HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("failed to decode glTF: {0}")]
    Decode(#[from] gltf::Error),
    #[error("model contains no triangle meshes")]
    NoDrawables,
    #[error("node {node} is reached twice in the node hierarchy")]
    CyclicHierarchy { node: usize },
}

/// Decode a binary glTF (`.glb`) with embedded buffers into model-space parts.
///
/// Node transforms are baked into vertex data. Non-triangle primitives are
/// skipped; textures are ignored.
pub fn decode_glb(bytes: &[u8]) -> Result<ModelData, ModelLoadError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let buffers = gltf::import_buffers(&document, None, blob)?;

    let mut parts = Vec::new();
    let mut visited = vec![false; document.nodes().len()];
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, Mat4::IDENTITY, &buffers, &mut visited, &mut parts)?;
            }
        }
        None => {
            // No scene declared: treat every parentless node as a root.
            let children: Vec<usize> = document
                .nodes()
                .flat_map(|n| n.children().map(|c| c.index()).collect::<Vec<_>>())
                .collect();
            for node in document.nodes().filter(|n| !children.contains(&n.index())) {
                collect_node(&node, Mat4::IDENTITY, &buffers, &mut visited, &mut parts)?;
            }
        }
    }

    if parts.is_empty() {
        return Err(ModelLoadError::NoDrawables);
    }

    let model = ModelData { parts };
    log::debug!(
        "decoded model: {} parts, {} triangles",
        model.parts.len(),
        model.triangle_count()
    );
    Ok(model)
}

/// Walk `node` and its descendants. Each node may be entered once; a second
/// visit means a cycle (or a shared child), which glTF forbids.
fn collect_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    visited: &mut [bool],
    out: &mut Vec<ModelPart>,
) -> Result<(), ModelLoadError> {
    let index = node.index();
    if std::mem::replace(&mut visited[index], true) {
        return Err(ModelLoadError::CyclicHierarchy { node: index });
    }

    let local = Mat4::from_cols_array_2d(&node.transform().matrix());
    let world = parent * local;

    if let Some(mesh) = node.mesh() {
        let base_name = node
            .name()
            .or_else(|| mesh.name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("node-{}", node.index()));
        for (i, primitive) in mesh.primitives().enumerate() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!("skipping non-triangle primitive {i} of {base_name}");
                continue;
            }
            if let Some(mesh) = read_primitive(&primitive, world, buffers) {
                out.push(ModelPart {
                    name: format!("{base_name}#{i}"),
                    mesh,
                    material: read_material(&primitive.material()),
                });
            }
        }
    }

    for child in node.children() {
        collect_node(&child, world, buffers, visited, out)?;
    }
    Ok(())
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
) -> Option<Mesh> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()?
        .map(|p| world.transform_point3(glam::Vec3::from(p)).to_array())
        .collect();
    if positions.is_empty() {
        return None;
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(iter) => iter.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    if indices.len() < 3 {
        return None;
    }

    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| {
        iter.map(|n| {
            (normal_matrix * glam::Vec3::from(n))
                .normalize_or_zero()
                .to_array()
        })
        .collect()
    });

    let mut mesh = Mesh::new(positions, Vec::new(), indices);
    match normals {
        Some(n) if n.len() == mesh.positions.len() => mesh.normals = n,
        _ => mesh.compute_normals(),
    }
    Some(mesh)
}

fn read_material(material: &gltf::Material<'_>) -> Material {
    let mut out = Material::standard(material.pbr_metallic_roughness().base_color_factor());
    out.emissive = material.emissive_factor();
    out
}
