use std::collections::BTreeMap;

use sakura_ids::NodeID;
use sakura_variant::Variant;
use serde::{Deserialize, Serialize};

use crate::class_db::ClassDB;
use crate::error::SceneError;
use crate::tree::SceneTree;

/// One node of a packed scene. `parent` indexes into [`PackedScene::nodes`];
/// only the root (index 0) has none.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PackedNodeEntry {
    pub name: String,
    pub class: String,
    pub parent: Option<u32>,
    /// Index of the owning node inside this packed scene, if it was packed too.
    pub owner: Option<u32>,
    pub groups: Vec<String>,
    pub properties: BTreeMap<String, Variant>,
    pub scene_file_path: Option<String>,
}

/// Self-contained capture of a node and its whole subtree.
///
/// Nodes are stored flat in pre-order so a parent always precedes its
/// children, which keeps sibling order intact on instantiation.
/// Encoded with bincode, which is not self-describing: field attributes that
/// skip serialization must not be added here.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct PackedScene {
    pub nodes: Vec<PackedNodeEntry>,
}

impl PackedScene {
    /// Capture `id` and everything under it.
    pub fn pack(tree: &SceneTree, id: NodeID) -> Result<Self, SceneError> {
        if !tree.is_live(id) {
            return Err(SceneError::NodeNotFound(id));
        }

        let mut nodes = Vec::new();
        let mut index_of: Vec<(NodeID, u32)> = Vec::new();
        // (node, packed parent index); reversed child push keeps pre-order.
        let mut stack = vec![(id, None)];
        while let Some((current, parent)) = stack.pop() {
            let Some(node) = tree.get(current) else {
                continue;
            };
            let index = nodes.len() as u32;
            index_of.push((current, index));
            nodes.push(PackedNodeEntry {
                name: node.name.to_string(),
                class: node.class.to_string(),
                parent,
                owner: None,
                groups: node.groups.clone(),
                properties: node.properties.clone(),
                scene_file_path: node.scene_file_path.clone(),
            });
            for &child in node.children.iter().rev() {
                stack.push((child, Some(index)));
            }
        }

        for (node_id, index) in &index_of {
            let owner = tree.get(*node_id).map(|n| n.owner).unwrap_or_default();
            nodes[*index as usize].owner = index_of
                .iter()
                .find(|(candidate, _)| *candidate == owner)
                .map(|(_, i)| *i);
        }

        Ok(Self { nodes })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_class(&self) -> Option<&str> {
        self.nodes.first().map(|n| n.class.as_str())
    }

    pub fn root_name(&self) -> Option<&str> {
        self.nodes.first().map(|n| n.name.as_str())
    }

    /// Every class the packed nodes need, in first-seen order.
    pub fn classes(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for entry in &self.nodes {
            if !out.contains(&entry.class.as_str()) {
                out.push(&entry.class);
            }
        }
        out
    }

    /// Build a detached copy of the packed subtree in `tree`.
    ///
    /// Nothing is created unless every class is still registered, so a
    /// failed instantiation leaves no stray nodes behind.
    pub fn instantiate(&self, tree: &mut SceneTree, classes: &ClassDB) -> Result<NodeID, SceneError> {
        if self.nodes.is_empty() {
            return Err(SceneError::EmptyPackedScene);
        }
        if let Some(missing) = self.classes().into_iter().find(|c| !classes.class_exists(c)) {
            return Err(SceneError::UnknownClass(missing.to_string()));
        }
        for (index, entry) in self.nodes.iter().enumerate() {
            match entry.parent {
                Some(parent) if parent as usize >= index => {
                    return Err(SceneError::BrokenPackedParent { index, parent });
                }
                None if index > 0 => {
                    return Err(SceneError::BrokenPackedParent { index, parent: 0 });
                }
                _ => {}
            }
        }

        let mut created: Vec<NodeID> = Vec::with_capacity(self.nodes.len());
        for entry in &self.nodes {
            let id = tree.create_node(entry.class.clone(), entry.name.clone());
            if let Some(node) = tree.get_mut(id) {
                node.groups = entry.groups.clone();
                node.properties = entry.properties.clone();
                node.scene_file_path = entry.scene_file_path.clone();
            }
            if let Some(parent) = entry.parent {
                tree.add_child(created[parent as usize], id)?;
            }
            created.push(id);
        }

        for (entry, &id) in self.nodes.iter().zip(&created) {
            if let (Some(owner), Some(node)) = (entry.owner, tree.get_mut(id)) {
                node.owner = created.get(owner as usize).copied().unwrap_or_default();
            }
        }

        Ok(created[0])
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SceneError> {
        bincode::serialize(self).map_err(SceneError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SceneError> {
        bincode::deserialize(bytes).map_err(SceneError::Decode)
    }
}
