use crate::components::{Drawable3D, GeoAnchor, Light, Transform};
use crate::entity::EntityId;
use foundation::arena::Arena;
use foundation::bounds::Aabb3;
use foundation::math::Mat4;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    /// Group anchored to a geographic coordinate; wraps exactly one object.
    GeoGroup,
    Mesh(Drawable3D),
    Light(Light),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<EntityId>,
    pub children: Vec<EntityId>,
    pub transform: Transform,
    /// Manually driven local matrix. Takes precedence over `transform`.
    pub matrix: Option<Mat4>,
    pub visible: bool,
    pub anchor: GeoAnchor,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            transform: Transform::identity(),
            matrix: None,
            visible: true,
            anchor: GeoAnchor::default(),
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.matrix.unwrap_or_else(|| self.transform.matrix())
    }
}

/// Scene graph rooted at a single group.
///
/// Nodes are created detached and become part of the rendered scene once they
/// are parented (directly or transitively) under [`World::root`].
#[derive(Debug, Clone)]
pub struct World {
    nodes: Arena<Node>,
    root: EntityId,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        let mut nodes = Arena::new();
        let root = EntityId(nodes.insert(Node::new(NodeKind::Group)));
        Self { nodes, root }
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn spawn(&mut self, kind: NodeKind) -> EntityId {
        EntityId(self.nodes.insert(Node::new(kind)))
    }

    pub fn spawn_group(&mut self) -> EntityId {
        self.spawn(NodeKind::Group)
    }

    pub fn spawn_geo_group(&mut self) -> EntityId {
        self.spawn(NodeKind::GeoGroup)
    }

    pub fn spawn_mesh(&mut self, drawable: Drawable3D) -> EntityId {
        self.spawn(NodeKind::Mesh(drawable))
    }

    pub fn spawn_light(&mut self, light: Light) -> EntityId {
        self.spawn(NodeKind::Light(light))
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.nodes.contains(entity.0)
    }

    pub fn node(&self, entity: EntityId) -> Option<&Node> {
        self.nodes.get(entity.0)
    }

    fn node_mut(&mut self, entity: EntityId) -> Option<&mut Node> {
        self.nodes.get_mut(entity.0)
    }

    pub fn kind(&self, entity: EntityId) -> Option<NodeKind> {
        self.node(entity).map(|n| n.kind)
    }

    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.node(entity).and_then(|n| n.parent)
    }

    pub fn children(&self, entity: EntityId) -> &[EntityId] {
        self.node(entity).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_geo_group(&self, entity: EntityId) -> bool {
        matches!(self.kind(entity), Some(NodeKind::GeoGroup))
    }

    pub fn is_mesh(&self, entity: EntityId) -> bool {
        matches!(self.kind(entity), Some(NodeKind::Mesh(_)))
    }

    /// Returns `true` if `ancestor` is `entity` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: EntityId, entity: EntityId) -> bool {
        let mut cursor = Some(entity);
        while let Some(e) = cursor {
            if e == ancestor {
                return true;
            }
            cursor = self.parent(e);
        }
        false
    }

    /// Returns `true` if the node is reachable from the root.
    pub fn is_attached(&self, entity: EntityId) -> bool {
        self.contains(entity) && self.is_ancestor(self.root, entity)
    }

    /// Moves `child` under `parent`, detaching it from its previous parent.
    ///
    /// Returns `false` (and changes nothing) for unknown ids, for the root as a
    /// child, and for moves that would create a cycle.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        if !self.contains(parent) || !self.contains(child) || child == self.root {
            return false;
        }
        if self.is_ancestor(child, parent) {
            return false;
        }

        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        true
    }

    /// Unlinks `child` from its parent. The node and its subtree stay alive.
    pub fn detach(&mut self, child: EntityId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
    }

    /// Removes a node and its whole subtree. Returns the removed ids in
    /// depth-first order. The root cannot be despawned.
    pub fn despawn(&mut self, entity: EntityId) -> Vec<EntityId> {
        if entity == self.root || !self.contains(entity) {
            return Vec::new();
        }
        self.detach(entity);

        let mut removed = Vec::new();
        let mut stack = vec![entity];
        while let Some(e) = stack.pop() {
            if let Some(node) = self.nodes.remove(e.0) {
                stack.extend(node.children.iter().rev().copied());
                removed.push(e);
            }
        }
        removed
    }

    /// `entity` and all of its descendants, depth-first.
    pub fn subtree(&self, entity: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack = vec![entity];
        while let Some(e) = stack.pop() {
            if let Some(node) = self.node(e) {
                out.push(e);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Despawns every child of `entity`, keeping `entity` itself.
    pub fn despawn_children(&mut self, entity: EntityId) -> Vec<EntityId> {
        let children = self.children(entity).to_vec();
        let mut removed = Vec::new();
        for child in children {
            removed.extend(self.despawn(child));
        }
        removed
    }

    pub fn transform(&self, entity: EntityId) -> Option<Transform> {
        self.node(entity).map(|n| n.transform)
    }

    pub fn set_transform(&mut self, entity: EntityId, transform: Transform) {
        if let Some(node) = self.node_mut(entity) {
            node.transform = transform;
        }
    }

    /// Drives the node's local matrix directly (`None` returns control to its
    /// `Transform`).
    pub fn set_local_matrix(&mut self, entity: EntityId, matrix: Option<Mat4>) {
        if let Some(node) = self.node_mut(entity) {
            node.matrix = matrix;
        }
    }

    pub fn set_visible(&mut self, entity: EntityId, visible: bool) {
        if let Some(node) = self.node_mut(entity) {
            node.visible = visible;
        }
    }

    /// Visible when the node and every ancestor are visible.
    pub fn is_visible(&self, entity: EntityId) -> bool {
        let mut cursor = Some(entity);
        while let Some(e) = cursor {
            match self.node(e) {
                Some(node) if node.visible => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn anchor(&self, entity: EntityId) -> Option<GeoAnchor> {
        self.node(entity).map(|n| n.anchor)
    }

    pub fn anchor_mut(&mut self, entity: EntityId) -> Option<&mut GeoAnchor> {
        self.node_mut(entity).map(|n| &mut n.anchor)
    }

    /// Composed local matrices from the top-most ancestor down to `entity`.
    pub fn world_matrix(&self, entity: EntityId) -> Option<Mat4> {
        let mut m = self.node(entity)?.local_matrix();
        let mut cursor = self.parent(entity);
        while let Some(e) = cursor {
            let node = self.node(e)?;
            m = node.local_matrix() * m;
            cursor = node.parent;
        }
        Some(m)
    }

    /// World-space bounds of a mesh node.
    pub fn world_bounds(&self, entity: EntityId) -> Option<Aabb3> {
        let NodeKind::Mesh(drawable) = self.kind(entity)? else {
            return None;
        };
        let m = self.world_matrix(entity)?;
        Some(drawable.local_bounds().transformed(&m))
    }

    /// Visible meshes reachable from the root, in depth-first order.
    pub fn meshes(&self) -> Vec<(EntityId, Mat4, Drawable3D)> {
        let mut out = Vec::new();
        self.walk_visible(self.root, Mat4::IDENTITY, &mut |entity, m, kind| {
            if let NodeKind::Mesh(drawable) = kind {
                out.push((entity, m, drawable));
            }
        });
        out
    }

    /// Visible lights reachable from the root, in depth-first order.
    pub fn lights(&self) -> Vec<(EntityId, Mat4, Light)> {
        let mut out = Vec::new();
        self.walk_visible(self.root, Mat4::IDENTITY, &mut |entity, m, kind| {
            if let NodeKind::Light(light) = kind {
                out.push((entity, m, light));
            }
        });
        out
    }

    fn walk_visible<F>(&self, entity: EntityId, parent: Mat4, visit: &mut F)
    where
        F: FnMut(EntityId, Mat4, NodeKind),
    {
        let Some(node) = self.node(entity) else {
            return;
        };
        if !node.visible {
            return;
        }
        let m = parent * node.local_matrix();
        visit(entity, m, node.kind);
        for child in &node.children {
            self.walk_visible(*child, m, visit);
        }
    }
}
