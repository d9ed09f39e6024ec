use log::{debug, error, warn};
use sakura_context::prelude::TreeAPI;
use sakura_ids::NodeID;
use sakura_scene::{PackedScene, SceneError};

use crate::error::PackError;

/// Owned, opaque snapshot of a node and its subtree.
#[derive(Clone, PartialEq, Eq)]
pub struct PackedNode {
    bytes: Vec<u8>,
}

impl PackedNode {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn decode(&self) -> Result<PackedScene, SceneError> {
        PackedScene::from_bytes(&self.bytes)
    }
}

impl std::fmt::Debug for PackedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PackedNode({} bytes)", self.bytes.len())
    }
}

pub struct NodeSerializer;

impl NodeSerializer {
    /// Capture `node` and its whole subtree.
    ///
    /// Works on a detached copy which is destroyed before returning; `node`
    /// itself is left untouched and may be destroyed right after.
    pub fn pack<H: TreeAPI + ?Sized>(host: &mut H, node: NodeID) -> Result<PackedNode, PackError> {
        if !host.is_live(node) {
            return Err(PackError::NotLive(node));
        }

        let copy = host
            .duplicate(node)
            .map_err(|source| PackError::Duplicate { node, source })?;
        let captured = host.capture(copy);
        if let Err(err) = host.destroy_node(copy) {
            warn!("[sakura] failed to free packing copy {copy}: {err}");
        }

        let scene = captured.map_err(|source| PackError::Capture { node, source })?;
        if scene.is_empty() {
            return Err(PackError::Empty(node));
        }
        let bytes = scene.to_bytes().map_err(PackError::Encode)?;
        debug!(
            "[sakura] packed {node} ({} nodes, {} bytes)",
            scene.nodes.len(),
            bytes.len()
        );
        Ok(PackedNode { bytes })
    }

    /// Rebuild a detached instance of `packed`.
    ///
    /// `None` when a class it needs is not registered (expected while the
    /// new definition isn't loaded yet) or when the bytes are corrupt.
    pub fn unpack<H: TreeAPI + ?Sized>(host: &mut H, packed: &PackedNode) -> Option<NodeID> {
        let scene = match packed.decode() {
            Ok(scene) => scene,
            Err(err) => {
                error!("[sakura] corrupt packed node: {err}");
                return None;
            }
        };

        match host.instantiate(&scene) {
            Ok(id) => Some(id),
            Err(SceneError::UnknownClass(class)) => {
                debug!("[sakura] cannot rebuild yet, class `{class}` is not registered");
                None
            }
            Err(err) => {
                error!("[sakura] failed to rebuild packed node: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHost;

    #[test]
    fn pack_leaves_original_and_frees_copy() {
        let mut host = MockHost::runtime("sakura");
        let main = host.add_scene("Main", "Node2D");
        let a = host.add("Sprite2D", "A", main);
        host.add("Node", "A1", a);
        let before = host.tree().node_count();

        let packed = NodeSerializer::pack(&mut host, a).unwrap();
        assert!(!packed.is_empty());
        assert_eq!(host.tree().node_count(), before);
        assert_eq!(host.layout(main), ["A (Sprite2D)"]);

        let scene = packed.decode().unwrap();
        assert_eq!(scene.root_name(), Some("A"));
        assert_eq!(scene.nodes.len(), 2);
    }

    #[test]
    fn unpack_rebuilds_detached_subtree() {
        let mut host = MockHost::runtime("sakura");
        let main = host.add_scene("Main", "Node2D");
        let a = host.add("Sprite2D", "A", main);
        host.add("Node", "A1", a);
        host.tree_mut().get_mut(a).unwrap().set("frame", 3);

        let packed = NodeSerializer::pack(&mut host, a).unwrap();
        host.tree_mut().destroy(a).unwrap();

        let rebuilt = NodeSerializer::unpack(&mut host, &packed).unwrap();
        assert!(!host.tree().is_inside_tree(rebuilt));
        assert_eq!(host.layout(rebuilt), ["A1 (Node)"]);
        let node = host.tree().get(rebuilt).unwrap();
        assert_eq!(node.get("frame").and_then(|v| v.as_i64()), Some(3));
    }

    #[test]
    fn unpack_fails_softly() {
        let mut host = MockHost::runtime("sakura");
        host.classes.register_extension("Enemy", "Node2D").unwrap();
        let main = host.add_scene("Main", "Node2D");
        let enemy = host.add("Enemy", "E", main);

        let packed = NodeSerializer::pack(&mut host, enemy).unwrap();
        host.classes.unregister("Enemy").unwrap();
        assert_eq!(NodeSerializer::unpack(&mut host, &packed), None);

        let corrupt = PackedNode::from_bytes(vec![7, 7, 7]);
        assert_eq!(NodeSerializer::unpack(&mut host, &corrupt), None);
    }

    #[test]
    fn pack_rejects_dead_nodes() {
        let mut host = MockHost::runtime("sakura");
        let main = host.add_scene("Main", "Node2D");
        let a = host.add("Node", "A", main);
        host.tree_mut().destroy(a).unwrap();
        assert!(matches!(
            NodeSerializer::pack(&mut host, a),
            Err(PackError::NotLive(_))
        ));
    }
}
