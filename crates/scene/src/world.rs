use crate::components::{Drawable3D, Light, Material, Mesh, MeshId, ShadowFlags, Transform, Visibility};
use crate::entity::NodeId;
use foundation::bounds::Aabb3;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub transform: Transform,
    pub visibility: Visibility,
    pub drawable: Option<Drawable3D>,
    pub shadows: ShadowFlags,
    pub light: Option<Light>,
}

impl Node {
    fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            parent,
            transform: Transform::identity(),
            visibility: Visibility::visible(),
            drawable: None,
            shadows: ShadowFlags::none(),
            light: None,
        }
    }
}

/// One resolved drawable, ready for the renderer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawableInstance {
    pub node: NodeId,
    pub world: Transform,
    pub drawable: Drawable3D,
    pub shadows: ShadowFlags,
}

/// Scene graph: a flat node table with parent links plus shared mesh storage.
#[derive(Debug, Default)]
pub struct World {
    nodes: Vec<Option<Node>>,
    meshes: Vec<Mesh>,
    /// Bumped whenever mesh storage changes, so GPU uploads can be skipped.
    revision: u64,
    /// Offset of `nodes[0]` in id space; grows on `clear` so stale ids miss.
    base: u32,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, name: impl Into<String>) -> NodeId {
        self.insert(Node::new(name, None))
    }

    /// Spawn a node under `parent`. A stale parent yields a root node.
    pub fn spawn_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let parent = self.node(parent).map(|_| parent);
        self.insert(Node::new(name, parent))
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.base + self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    fn slot(&self, id: NodeId) -> Option<usize> {
        id.index()
            .checked_sub(self.base)
            .map(|i| i as usize)
            .filter(|i| *i < self.nodes.len())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slot(id).and_then(|i| self.nodes[i].as_ref())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let i = self.slot(id)?;
        self.nodes[i].as_mut()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) {
        if let Some(node) = self.node_mut(id) {
            node.transform = transform;
        }
    }

    pub fn set_visibility(&mut self, id: NodeId, visibility: Visibility) {
        if let Some(node) = self.node_mut(id) {
            node.visibility = visibility;
        }
    }

    pub fn set_drawable_3d(&mut self, id: NodeId, drawable: Drawable3D) {
        if let Some(node) = self.node_mut(id) {
            node.drawable = Some(drawable);
        }
    }

    pub fn set_shadows(&mut self, id: NodeId, shadows: ShadowFlags) {
        if let Some(node) = self.node_mut(id) {
            node.shadows = shadows;
        }
    }

    pub fn set_light(&mut self, id: NodeId, light: Light) {
        if let Some(node) = self.node_mut(id) {
            node.light = Some(light);
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(mesh);
        self.revision += 1;
        id
    }

    /// Spawn a child node that draws `mesh` with `material`.
    pub fn spawn_mesh(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        mesh: Mesh,
        material: Material,
    ) -> NodeId {
        let mesh = self.add_mesh(mesh);
        let id = match parent {
            Some(parent) => self.spawn_child(parent, name),
            None => self.spawn(name),
        };
        self.set_drawable_3d(id, Drawable3D::new(mesh, material));
        id
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0 as usize)
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// `root` and every node below it, parents before children.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        if self.node(root).is_none() {
            return Vec::new();
        }
        let mut out = vec![root];
        let mut cursor = 0;
        while cursor < out.len() {
            let parent = out[cursor];
            for (i, node) in self.nodes.iter().enumerate() {
                if node.as_ref().is_some_and(|n| n.parent == Some(parent)) {
                    out.push(NodeId(self.base + i as u32));
                }
            }
            cursor += 1;
        }
        out
    }

    /// Transform of `id` relative to `ancestor` (exclusive), or relative to
    /// world space when `ancestor` is `None` or not on the parent chain.
    pub fn relative_transform(&self, id: NodeId, ancestor: Option<NodeId>) -> Transform {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if Some(current) == ancestor {
                break;
            }
            let Some(node) = self.node(current) else {
                break;
            };
            chain.push(node.transform);
            cursor = node.parent;
        }
        chain
            .iter()
            .rev()
            .fold(Transform::identity(), |acc, t| acc.then(t))
    }

    pub fn world_transform(&self, id: NodeId) -> Transform {
        self.relative_transform(id, None)
    }

    fn is_visible_in_hierarchy(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.node(current) else {
                return false;
            };
            if !node.visibility.visible {
                return false;
            }
            cursor = node.parent;
        }
        true
    }

    /// Bounds of the meshes under `root`, in `root`'s own local space.
    pub fn local_bounds(&self, root: NodeId) -> Aabb3 {
        self.subtree_bounds(root, Some(root))
    }

    /// World-space bounds of the meshes under `root` (including `root`).
    pub fn world_bounds(&self, root: NodeId) -> Aabb3 {
        self.subtree_bounds(root, None)
    }

    fn subtree_bounds(&self, root: NodeId, space: Option<NodeId>) -> Aabb3 {
        let mut bounds = Aabb3::empty();
        for id in self.descendants(root) {
            let Some(drawable) = self.node(id).and_then(|n| n.drawable) else {
                continue;
            };
            let Some(mesh) = self.mesh(drawable.mesh) else {
                continue;
            };
            let t = self.relative_transform(id, space);
            bounds = bounds.union(&t.apply_bounds(&mesh.bounds()));
        }
        bounds
    }

    /// Visible drawables with resolved world transforms.
    pub fn drawables_3d(&self) -> Vec<DrawableInstance> {
        let mut out = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            let Some(node) = node else { continue };
            let Some(drawable) = node.drawable else {
                continue;
            };
            let id = NodeId(self.base + i as u32);
            if !self.is_visible_in_hierarchy(id) {
                continue;
            }
            out.push(DrawableInstance {
                node: id,
                world: self.world_transform(id),
                drawable,
                shadows: node.shadows,
            });
        }
        out
    }

    /// Visible lights with their world transforms.
    pub fn lights(&self) -> Vec<(NodeId, Transform, Light)> {
        let mut out = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            let Some(light) = node.as_ref().and_then(|n| n.light) else {
                continue;
            };
            let id = NodeId(self.base + i as u32);
            if !self.is_visible_in_hierarchy(id) {
                continue;
            }
            out.push((id, self.world_transform(id), light));
        }
        out
    }

    /// Detach every node and drop all meshes. Ids issued before the call no
    /// longer resolve.
    pub fn clear(&mut self) {
        if self.nodes.is_empty() && self.meshes.is_empty() {
            return;
        }
        self.base += self.nodes.len() as u32;
        self.nodes.clear();
        self.meshes.clear();
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::World;
    use crate::components::{Material, Mesh, ShadowFlags, Transform, Visibility};
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;

    fn cube_mesh(center: [f32; 3], half: f32) -> Mesh {
        let [x, y, z] = center;
        let mut positions = Vec::new();
        for dx in [-half, half] {
            for dy in [-half, half] {
                for dz in [-half, half] {
                    positions.push([x + dx, y + dy, z + dz]);
                }
            }
        }
        Mesh::new(positions, Vec::new(), vec![0, 1, 2])
    }

    #[test]
    fn spawn_and_collect_drawables() {
        let mut world = World::new();
        let entity = world.spawn_mesh(None, "cube", cube_mesh([0.0; 3], 1.0), Material::default());

        let drawables = world.drawables_3d();
        assert_eq!(drawables.len(), 1);
        assert_eq!(drawables[0].node, entity);
    }

    #[test]
    fn hidden_ancestors_hide_children() {
        let mut world = World::new();
        let root = world.spawn("root");
        world.spawn_mesh(Some(root), "cube", cube_mesh([0.0; 3], 1.0), Material::default());
        world.set_visibility(root, Visibility::hidden());

        assert!(world.drawables_3d().is_empty());
    }

    #[test]
    fn world_transform_composes_parent_chain() {
        let mut world = World::new();
        let root = world.spawn("root");
        world.set_transform(
            root,
            Transform {
                position: Vec3::new(0.0, 1.0, 0.0),
                scale: 2.0,
            },
        );
        let child = world.spawn_child(root, "child");
        world.set_transform(child, Transform::translate(Vec3::new(1.0, 0.0, 0.0)));

        let t = world.world_transform(child);
        assert_eq!(t.position, Vec3::new(2.0, 1.0, 0.0));
        assert_eq!(t.scale, 2.0);
        assert_eq!(world.relative_transform(child, Some(root)).scale, 1.0);
    }

    #[test]
    fn local_bounds_ignore_root_transform() {
        let mut world = World::new();
        let root = world.spawn("root");
        world.spawn_mesh(Some(root), "cube", cube_mesh([5.0, 5.0, 5.0], 1.0), Material::default());
        world.set_transform(
            root,
            Transform {
                position: Vec3::new(-5.0, -5.0, -5.0),
                scale: 1.0,
            },
        );

        let local = world.local_bounds(root);
        assert_eq!(local.center(), Vec3::new(5.0, 5.0, 5.0));
        let global = world.world_bounds(root);
        assert_eq!(global.center(), Vec3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn descendants_are_breadth_first() {
        let mut world = World::new();
        let root = world.spawn("root");
        let a = world.spawn_child(root, "a");
        let b = world.spawn_child(a, "b");
        let _other = world.spawn("other");
        assert_eq!(world.descendants(root), vec![root, a, b]);
    }

    #[test]
    fn clear_detaches_everything_and_invalidates_ids() {
        let mut world = World::new();
        let root = world.spawn("root");
        world.spawn_mesh(Some(root), "cube", cube_mesh([0.0; 3], 1.0), Material::default());
        world.set_shadows(root, ShadowFlags::cast_and_receive());
        let before = world.revision();

        world.clear();
        assert_eq!(world.node_count(), 0);
        assert!(world.meshes().is_empty());
        assert!(world.node(root).is_none());
        assert!(world.revision() > before);

        let fresh = world.spawn("fresh");
        assert_ne!(fresh, root);
        assert!(world.node(root).is_none());

        // Idempotent on an already-empty world.
        world.clear();
        world.clear();
        assert_eq!(world.node_count(), 0);
    }
}
