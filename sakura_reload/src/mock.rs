use std::borrow::Cow;

use sakura_context::prelude::*;
use sakura_ids::NodeID;
use sakura_scene::{ClassDB, PackedScene, SceneError, SceneTree};

/// In-memory host over a real [`SceneTree`], used by the reload tests.
pub(crate) struct MockHost {
    pub tree: Option<SceneTree>,
    pub classes: ClassDB,
    pub editor: bool,
    pub open_scene_support: bool,
    pub open_scenes: Vec<NodeID>,
    pub selection: Vec<NodeID>,
    pub build: String,
    pub errors: Vec<String>,
}

impl MockHost {
    pub fn runtime(build: &str) -> Self {
        Self {
            tree: Some(SceneTree::new()),
            classes: ClassDB::default(),
            editor: false,
            open_scene_support: false,
            open_scenes: Vec::new(),
            selection: Vec::new(),
            build: build.to_string(),
            errors: Vec::new(),
        }
    }

    pub fn editor(build: &str) -> Self {
        Self {
            editor: true,
            open_scene_support: true,
            ..Self::runtime(build)
        }
    }

    pub fn tree(&self) -> &SceneTree {
        self.tree.as_ref().expect("mock host has a tree")
    }

    pub fn tree_mut(&mut self) -> &mut SceneTree {
        self.tree.as_mut().expect("mock host has a tree")
    }

    /// New scene root under the tree root, listed as an open scene.
    pub fn add_scene(&mut self, name: &'static str, class: &'static str) -> NodeID {
        let tree = self.tree_mut();
        let id = tree.create_node(class, name);
        let root = tree.root();
        tree.add_child(root, id).unwrap();
        tree.get_mut(id).unwrap().scene_file_path = Some(format!("res://{name}.scn"));
        self.open_scenes.push(id);
        id
    }

    pub fn add(&mut self, class: &'static str, name: &'static str, parent: NodeID) -> NodeID {
        let tree = self.tree_mut();
        let id = tree.create_node(class, name);
        tree.add_child(parent, id).unwrap();
        let owner = tree.get(parent).map(|p| if p.owner.is_nil() { parent } else { p.owner });
        tree.get_mut(id).unwrap().owner = owner.unwrap_or_default();
        id
    }

    /// `name (Class)` for each child of `id`.
    pub fn layout(&self, id: NodeID) -> Vec<String> {
        let tree = self.tree();
        tree.children(id)
            .iter()
            .filter_map(|&c| tree.get(c))
            .map(|n| format!("{} ({})", n.name, n.class))
            .collect()
    }

    /// Number of nodes whose class is exactly `class`.
    pub fn count_class(&self, class: &str) -> usize {
        let tree = self.tree();
        let mut stack = vec![tree.root()];
        let mut count = 0;
        while let Some(id) = stack.pop() {
            if tree.get(id).is_some_and(|n| n.class == class) {
                count += 1;
            }
            stack.extend_from_slice(tree.children(id));
        }
        count
    }

    fn with_tree<T>(&self, f: impl FnOnce(&SceneTree) -> T) -> Option<T> {
        self.tree.as_ref().map(f)
    }

    fn tree_or_err(&mut self) -> Result<&mut SceneTree, SceneError> {
        self.tree.as_mut().ok_or(SceneError::NoActiveTree)
    }
}

impl TreeAPI for MockHost {
    fn tree_root(&self) -> Option<NodeID> {
        self.with_tree(|t| t.root())
    }

    fn open_scene_roots(&self) -> Vec<NodeID> {
        self.open_scenes.clone()
    }

    fn is_live(&self, id: NodeID) -> bool {
        self.with_tree(|t| t.is_live(id)).unwrap_or(false)
    }

    fn children(&self, id: NodeID) -> Vec<NodeID> {
        self.with_tree(|t| t.children(id).to_vec()).unwrap_or_default()
    }

    fn node_name(&self, id: NodeID) -> Option<String> {
        self.with_tree(|t| t.get(id).map(|n| n.name.to_string())).flatten()
    }

    fn scene_file_path(&self, id: NodeID) -> Option<String> {
        self.with_tree(|t| t.get(id).and_then(|n| n.scene_file_path.clone()))
            .flatten()
    }

    fn node_is_class(&self, id: NodeID, class: &str) -> bool {
        self.with_tree(|t| t.is_class(id, class, &self.classes))
            .unwrap_or(false)
    }

    fn duplicate(&mut self, id: NodeID) -> Result<NodeID, SceneError> {
        self.tree_or_err()?.duplicate(id)
    }

    fn capture(&self, id: NodeID) -> Result<PackedScene, SceneError> {
        let tree = self.tree.as_ref().ok_or(SceneError::NoActiveTree)?;
        PackedScene::pack(tree, id)
    }

    fn instantiate(&mut self, packed: &PackedScene) -> Result<NodeID, SceneError> {
        let tree = self.tree.as_mut().ok_or(SceneError::NoActiveTree)?;
        packed.instantiate(tree, &self.classes)
    }

    fn replace_node(
        &mut self,
        old: NodeID,
        new: NodeID,
        keep_ownership: bool,
    ) -> Result<(), SceneError> {
        self.tree_or_err()?.replace_node(old, new, keep_ownership)?;
        for scene in &mut self.open_scenes {
            if *scene == old {
                *scene = new;
            }
        }
        Ok(())
    }

    fn destroy_node(&mut self, id: NodeID) -> Result<(), SceneError> {
        self.tree_or_err()?.destroy(id)?;
        self.open_scenes.retain(|&s| s != id);
        Ok(())
    }

    fn create_empty_node(&mut self, name: &str) -> Result<NodeID, SceneError> {
        let name: Cow<'static, str> = Cow::Owned(name.to_string());
        Ok(self.tree_or_err()?.create_node("Node", name))
    }
}

impl EditorAPI for MockHost {
    fn is_editor(&self) -> bool {
        self.editor
    }

    fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn supports_open_scenes(&self) -> bool {
        self.open_scene_support
    }

    fn build_name(&self) -> &str {
        &self.build
    }
}

impl DiagnosticsAPI for MockHost {
    fn push_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

impl ClassAPI for MockHost {
    fn class_exists(&self, class: &str) -> bool {
        self.classes.class_exists(class)
    }
}
