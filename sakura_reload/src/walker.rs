use sakura_context::prelude::TreeAPI;
use sakura_ids::NodeID;

/// Finds live instances of a class under a subtree root.
pub struct TreeWalker;

impl TreeWalker {
    /// Every node under `root` (inclusive) whose runtime class is `class` or
    /// derives from it, in pre-order: a node comes before its children and
    /// siblings keep their tree order.
    pub fn collect<H: TreeAPI + ?Sized>(host: &H, root: NodeID, class: &str) -> Vec<NodeID> {
        let mut found = Vec::new();
        if class.is_empty() || !host.is_live(root) {
            return found;
        }

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if host.node_is_class(id, class) {
                found.push(id);
            }
            stack.extend(host.children(id).into_iter().rev());
        }
        found
    }
}
