/// Index of a node in a [`crate::World`].
///
/// Ids are never reused within one world; after [`crate::World::clear`] every
/// previously issued id resolves to nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(&self) -> u32 {
        self.0
    }
}
