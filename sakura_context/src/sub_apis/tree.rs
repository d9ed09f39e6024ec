use sakura_ids::NodeID;
use sakura_scene::{PackedScene, SceneError};

/// Scene graph access needed to capture and rebuild nodes.
///
/// Every mutating call completes before it returns: a replaced node is out
/// of the tree and a destroyed node is gone, with nothing left queued.
pub trait TreeAPI {
    /// Root of the active tree, `None` while no tree exists.
    fn tree_root(&self) -> Option<NodeID>;

    /// Roots of every scene open in the authoring host, in tab order.
    fn open_scene_roots(&self) -> Vec<NodeID>;

    fn is_live(&self, id: NodeID) -> bool;

    /// Children of `id` in sibling order. Empty for unknown ids.
    fn children(&self, id: NodeID) -> Vec<NodeID>;

    fn node_name(&self, id: NodeID) -> Option<String>;

    fn scene_file_path(&self, id: NodeID) -> Option<String>;

    /// True when the runtime class of `id` is `class` or derives from it.
    fn node_is_class(&self, id: NodeID, class: &str) -> bool;

    /// Detached deep copy of `id` and its subtree.
    fn duplicate(&mut self, id: NodeID) -> Result<NodeID, SceneError>;

    fn capture(&self, id: NodeID) -> Result<PackedScene, SceneError>;

    /// Detached, inert instance of `packed`. Fails when a class it uses is
    /// no longer registered.
    fn instantiate(&mut self, packed: &PackedScene) -> Result<NodeID, SceneError>;

    /// `new` takes `old`'s place (parent and sibling index, or the root
    /// slot); `old` leaves the tree with its subtree.
    fn replace_node(&mut self, old: NodeID, new: NodeID, keep_ownership: bool)
    -> Result<(), SceneError>;

    fn destroy_node(&mut self, id: NodeID) -> Result<(), SceneError>;

    /// New detached plain `Node` with no behavior attached.
    fn create_empty_node(&mut self, name: &str) -> Result<NodeID, SceneError>;
}
