use std::borrow::Cow;

use sakura_ids::NodeID;

use crate::class_db::ClassDB;
use crate::error::SceneError;
use crate::node::SceneNode;
use crate::node_arena::NodeArena;
use crate::signals::{EventCallback, SignalBus};

/// Live scene tree: one root plus any number of detached (not yet inserted)
/// nodes, all stored in the same arena.
///
/// Every mutation here is immediate. There is no deferred free queue, so
/// after any call returns the tree is fully consistent.
pub struct SceneTree {
    nodes: NodeArena,
    root: NodeID,
    pub signals: SignalBus,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    /// New tree with a single `Window` root named `root`.
    pub fn new() -> Self {
        let mut nodes = NodeArena::new();
        let root = nodes.insert(SceneNode::new("Window", "root"));
        Self {
            nodes,
            root,
            signals: SignalBus::default(),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeID {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeID) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeID) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    #[inline]
    pub fn is_live(&self, id: NodeID) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: NodeID) -> &[NodeID] {
        self.nodes.get(id).map_or(&[], |n| n.children_slice())
    }

    pub fn parent(&self, id: NodeID) -> Option<NodeID> {
        self.nodes.get(id).map(|n| n.parent).filter(|p| !p.is_nil())
    }

    /// True when `id` is reachable from the root through parent links.
    pub fn is_inside_tree(&self, id: NodeID) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Create a detached node. It joins the tree once added as a child.
    pub fn create_node(
        &mut self,
        class: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
    ) -> NodeID {
        self.nodes.insert(SceneNode::new(class, name))
    }

    pub fn add_child(&mut self, parent: NodeID, child: NodeID) -> Result<(), SceneError> {
        let position = self.children(parent).len();
        self.insert_child(parent, child, position)
    }

    fn insert_child(
        &mut self,
        parent: NodeID,
        child: NodeID,
        position: usize,
    ) -> Result<(), SceneError> {
        if !self.is_live(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        let child_node = self.nodes.get(child).ok_or(SceneError::NodeNotFound(child))?;
        if child_node.has_parent() || child == self.root {
            return Err(SceneError::AlreadyParented(child));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::CyclicParent { parent, child });
        }

        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = parent;
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            let position = position.min(node.children.len());
            node.children.insert(position, child);
        }
        Ok(())
    }

    fn is_ancestor_or_self(&self, ancestor: NodeID, mut id: NodeID) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent(id) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Detach `child` from its parent, keeping its subtree intact.
    pub fn remove_child(&mut self, parent: NodeID, child: NodeID) -> Result<(), SceneError> {
        let index = self
            .nodes
            .get(parent)
            .ok_or(SceneError::NodeNotFound(parent))?
            .index_of_child(child)
            .ok_or(SceneError::Detached(child))?;
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.remove(index);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = NodeID::nil();
        }
        Ok(())
    }

    pub fn index_in_parent(&self, id: NodeID) -> Option<usize> {
        let parent = self.parent(id)?;
        self.nodes.get(parent)?.index_of_child(id)
    }

    /// Swap `old` for the detached node `new` in a single step: `new` takes
    /// `old`'s parent and sibling index (or the root slot), and `old` leaves
    /// the tree with its own subtree untouched. With `keep_ownership`, `new`
    /// also inherits `old`'s owner and groups.
    pub fn replace_node(
        &mut self,
        old: NodeID,
        new: NodeID,
        keep_ownership: bool,
    ) -> Result<(), SceneError> {
        let old_node = self.nodes.get(old).ok_or(SceneError::NodeNotFound(old))?;
        let (owner, groups) = (old_node.owner, old_node.groups.clone());
        let new_node = self.nodes.get(new).ok_or(SceneError::NodeNotFound(new))?;
        if new_node.has_parent() || new == self.root {
            return Err(SceneError::AlreadyParented(new));
        }

        if old == self.root {
            self.root = new;
        } else if let Some(parent) = self.parent(old) {
            let index = self.index_in_parent(old).ok_or(SceneError::Detached(old))?;
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children[index] = new;
            }
            if let Some(node) = self.nodes.get_mut(new) {
                node.parent = parent;
            }
            if let Some(node) = self.nodes.get_mut(old) {
                node.parent = NodeID::nil();
            }
        } else {
            return Err(SceneError::Detached(old));
        }

        if keep_ownership {
            if let Some(node) = self.nodes.get_mut(new) {
                // An old node owning itself (scene root) hands that role over.
                node.owner = if owner == old { new } else { owner };
                for group in groups {
                    node.add_to_group(group);
                }
            }
        }
        Ok(())
    }

    /// Free `id` and its whole subtree immediately. Returns how many nodes
    /// were freed. The tree root can't be destroyed.
    pub fn destroy(&mut self, id: NodeID) -> Result<usize, SceneError> {
        if id == self.root {
            return Err(SceneError::TreeRoot(id));
        }
        if !self.is_live(id) {
            return Err(SceneError::NodeNotFound(id));
        }
        if let Some(parent) = self.parent(id) {
            self.remove_child(parent, id)?;
        }

        let mut stack = vec![id];
        let mut freed = 0;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children.iter().copied());
                self.signals.disconnect_node(current);
                freed += 1;
            }
        }
        Ok(freed)
    }

    /// Deep copy of `id` and its subtree as a new detached node.
    /// Owners inside the copied subtree are remapped to the copies.
    pub fn duplicate(&mut self, id: NodeID) -> Result<NodeID, SceneError> {
        let source = self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))?;
        let mut copy = source.clone();
        copy.children.clear();
        copy.parent = NodeID::nil();
        let copy_id = self.nodes.insert(copy);

        let mut remap = vec![(id, copy_id)];
        let mut pending = vec![(id, copy_id)];
        while let Some((src, dst)) = pending.pop() {
            let children = self.children(src).to_vec();
            for child in children {
                let Some(child_node) = self.nodes.get(child) else {
                    continue;
                };
                let mut child_copy = child_node.clone();
                child_copy.children.clear();
                child_copy.parent = NodeID::nil();
                let child_copy_id = self.nodes.insert(child_copy);
                self.add_child(dst, child_copy_id)?;
                remap.push((child, child_copy_id));
                pending.push((child, child_copy_id));
            }
        }

        for &(_, dst) in &remap {
            let owner = self.nodes.get(dst).map(|n| n.owner).unwrap_or_default();
            if let Some(&(_, mapped)) = remap.iter().find(|(src, _)| *src == owner) {
                if let Some(node) = self.nodes.get_mut(dst) {
                    node.owner = mapped;
                }
            }
        }
        Ok(copy_id)
    }

    /// Runtime class check: `id`'s class is `class` or inherits from it.
    pub fn is_class(&self, id: NodeID, class: &str, classes: &ClassDB) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|node| node.class == class || classes.is_parent_class(&node.class, class))
    }

    /// Absolute path such as `/root/Main/Player`.
    pub fn node_path(&self, id: NodeID) -> Option<String> {
        let mut parts = Vec::new();
        let mut current = id;
        loop {
            let node = self.nodes.get(current)?;
            parts.push(node.name.as_ref());
            if !node.has_parent() {
                break;
            }
            current = node.parent;
        }
        parts.reverse();
        Some(format!("/{}", parts.join("/")))
    }

    /// Resolve an absolute (`/root/Main`) or root-relative (`Main/Player`) path.
    pub fn get_node(&self, path: &str) -> Option<NodeID> {
        let mut current = self.root;
        let relative = match path.strip_prefix('/') {
            Some(absolute) => {
                let mut segments = absolute.splitn(2, '/');
                if segments.next()? != self.nodes.get(self.root)?.name {
                    return None;
                }
                segments.next().unwrap_or("")
            }
            None => path,
        };

        for segment in relative.split('/').filter(|s| !s.is_empty() && *s != ".") {
            current = if segment == ".." {
                self.parent(current)?
            } else {
                *self
                    .children(current)
                    .iter()
                    .find(|&&c| self.nodes.get(c).is_some_and(|n| n.name == segment))?
            };
        }
        Some(current)
    }

    /// Pre-order search for the first node named `name` under `from` (inclusive).
    pub fn find_node_by_name(&self, from: NodeID, name: &str) -> Option<NodeID> {
        let node = self.nodes.get(from)?;
        if node.name == name {
            return Some(from);
        }
        node.children
            .iter()
            .find_map(|&child| self.find_node_by_name(child, name))
    }

    pub fn connect_once(
        &mut self,
        node: NodeID,
        signal: &str,
        callback: EventCallback,
    ) -> Result<(), SceneError> {
        if !self.is_live(node) {
            return Err(SceneError::NodeNotFound(node));
        }
        self.signals.connect_once(node, signal, callback);
        Ok(())
    }

    pub fn emit_signal(&mut self, node: NodeID, signal: &str) -> usize {
        self.signals.emit(node, signal)
    }

    /// Disconnect every callback that points into extension code.
    pub fn purge_foreign_callbacks(&mut self) -> usize {
        self.signals.purge_foreign()
    }

    /// Indented dump of the subtree under `id`, one node per line.
    pub fn dump(&self, id: NodeID) -> String {
        let mut out = String::new();
        self.dump_recursive(id, 0, &mut out);
        out
    }

    fn dump_recursive(&self, id: NodeID, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{} ({})\n", node.name, node.class));
        for &child in &node.children {
            self.dump_recursive(child, depth + 1, out);
        }
    }
}
