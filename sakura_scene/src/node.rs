// node.rs
use std::borrow::Cow;
use std::collections::BTreeMap;

use sakura_ids::NodeID;
use sakura_variant::Variant;

/// A live node in the scene tree.
///
/// Relationships are stored as IDs into the owning [`NodeArena`](crate::NodeArena);
/// `children` keeps sibling order, which is observable (and preserved by
/// [`SceneTree::replace_node`](crate::SceneTree::replace_node)).
#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub id: NodeID,
    pub name: Cow<'static, str>,
    pub class: Cow<'static, str>,

    pub parent: NodeID,
    pub children: Vec<NodeID>,

    /// Scene root this node was saved with (editor ownership).
    pub owner: NodeID,
    pub groups: Vec<String>,

    pub properties: BTreeMap<String, Variant>,

    /// Set on nodes that are the root of a scene loaded from disk.
    pub scene_file_path: Option<String>,
}

impl SceneNode {
    pub fn new(class: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: NodeID::nil(),
            name: name.into(),
            class: class.into(),
            parent: NodeID::nil(),
            children: Vec::new(),
            owner: NodeID::nil(),
            groups: Vec::new(),
            properties: BTreeMap::new(),
            scene_file_path: None,
        }
    }

    #[inline]
    pub fn has_parent(&self) -> bool {
        !self.parent.is_nil()
    }

    #[inline]
    pub fn children_slice(&self) -> &[NodeID] {
        &self.children
    }

    pub fn get(&self, property: &str) -> Option<&Variant> {
        self.properties.get(property)
    }

    pub fn set(&mut self, property: impl Into<String>, value: impl Into<Variant>) {
        self.properties.insert(property.into(), value.into());
    }

    pub fn add_to_group(&mut self, group: impl Into<String>) {
        let group = group.into();
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub(crate) fn index_of_child(&self, child: NodeID) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }
}
