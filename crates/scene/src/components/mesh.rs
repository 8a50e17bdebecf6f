use foundation::bounds::Aabb3;
use foundation::math::Vec3;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

/// Indexed triangle list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(positions: Vec<[f32; 3]>, normals: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals,
            indices,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(self.positions.iter().map(|p| Vec3::from(*p)))
    }

    /// Recompute per-vertex normals by accumulating face normals.
    ///
    /// Triangles referencing out-of-range vertices are skipped.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= acc.len() || b >= acc.len() || c >= acc.len() {
                continue;
            }
            let pa = Vec3::from(self.positions[a]);
            let pb = Vec3::from(self.positions[b]);
            let pc = Vec3::from(self.positions[c]);
            let n = (pb - pa).cross(pc - pa);
            acc[a] = acc[a] + n;
            acc[b] = acc[b] + n;
            acc[c] = acc[c] + n;
        }
        self.normals = acc
            .into_iter()
            .map(|n| n.normalize_or_zero().to_f32())
            .collect();
    }

    /// Flat disc in the XZ plane facing +Y.
    pub fn disc_xz(radius: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let mut positions = Vec::with_capacity(segments as usize + 1);
        positions.push([0.0, 0.0, 0.0]);
        for i in 0..segments {
            let phi = i as f32 / segments as f32 * std::f32::consts::TAU;
            positions.push([radius * phi.cos(), 0.0, radius * phi.sin()]);
        }
        let mut indices = Vec::with_capacity(segments as usize * 3);
        for i in 0..segments {
            let next = (i + 1) % segments;
            // Counter-clockwise seen from +Y.
            indices.extend_from_slice(&[0, next + 1, i + 1]);
        }
        let normals = vec![[0.0, 1.0, 0.0]; positions.len()];
        Self::new(positions, normals, indices)
    }

    /// Low-poly marker shape.
    pub fn octahedron(radius: f32) -> Self {
        let r = radius;
        let positions = vec![
            [r, 0.0, 0.0],
            [-r, 0.0, 0.0],
            [0.0, r, 0.0],
            [0.0, -r, 0.0],
            [0.0, 0.0, r],
            [0.0, 0.0, -r],
        ];
        let indices = vec![
            0, 2, 4, 4, 2, 1, 1, 2, 5, 5, 2, 0, //
            4, 3, 0, 1, 3, 4, 5, 3, 1, 0, 3, 5,
        ];
        let mut mesh = Self::new(positions, Vec::new(), indices);
        mesh.compute_normals();
        mesh
    }
}
