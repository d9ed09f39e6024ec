use std::borrow::Cow;

use sakura_context::prelude::*;
use sakura_ids::NodeID;
use sakura_scene::{ClassDB, PackedScene, SceneError, SceneTree};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineMode {
    /// Authoring host with open scenes and a selection.
    Editor,
    /// Running game, debug build.
    Debug,
    /// Running game, release build.
    #[default]
    Runtime,
}

impl EngineMode {
    /// Value returned by the `GetEngineMode` export.
    pub fn code(self) -> i32 {
        match self {
            EngineMode::Editor => 0,
            EngineMode::Debug => 1,
            EngineMode::Runtime => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineInfo {
    pub mode: EngineMode,
    /// Name of the host build, matched against the capable builds list.
    pub build: String,
}

impl Default for EngineInfo {
    fn default() -> Self {
        Self {
            mode: EngineMode::Runtime,
            build: "sakura".to_string(),
        }
    }
}

/// The engine side of the bridge: scene tree, class registry and editor
/// state, as seen by the reload protocol and the exported functions.
pub struct Host {
    tree: Option<SceneTree>,
    classes: ClassDB,
    info: EngineInfo,
    open_scenes: Vec<NodeID>,
    open_scene_support: bool,
    selection: Vec<NodeID>,
    errors: Vec<String>,
}

impl Host {
    pub fn new(info: EngineInfo) -> Self {
        Self {
            tree: Some(SceneTree::new()),
            classes: ClassDB::default(),
            open_scene_support: info.mode == EngineMode::Editor,
            info,
            open_scenes: Vec::new(),
            selection: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn editor(build: &str) -> Self {
        Self::new(EngineInfo {
            mode: EngineMode::Editor,
            build: build.to_string(),
        })
    }

    pub fn runtime(build: &str) -> Self {
        Self::new(EngineInfo {
            mode: EngineMode::Runtime,
            build: build.to_string(),
        })
    }

    pub fn info(&self) -> &EngineInfo {
        &self.info
    }

    pub fn tree(&self) -> Option<&SceneTree> {
        self.tree.as_ref()
    }

    pub fn tree_mut(&mut self) -> Option<&mut SceneTree> {
        self.tree.as_mut()
    }

    /// Swap the active tree. Editor state referring to the old one is reset.
    pub fn set_tree(&mut self, tree: Option<SceneTree>) {
        self.tree = tree;
        self.open_scenes.clear();
        self.selection.clear();
    }

    pub fn classes(&self) -> &ClassDB {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut ClassDB {
        &mut self.classes
    }

    pub fn set_open_scene_support(&mut self, supported: bool) {
        self.open_scene_support = supported;
    }

    /// Load a scene root into the editor: it is attached under the tree root
    /// and listed as open.
    pub fn open_scene(&mut self, scene_root: NodeID) -> Result<(), SceneError> {
        let tree = self.tree.as_mut().ok_or(SceneError::NoActiveTree)?;
        tree.add_child(tree.root(), scene_root)?;
        self.open_scenes.push(scene_root);
        Ok(())
    }

    /// Close an open scene and free it.
    pub fn close_scene(&mut self, scene_root: NodeID) -> Result<(), SceneError> {
        if !self.open_scenes.contains(&scene_root) {
            return Err(SceneError::NodeNotFound(scene_root));
        }
        self.destroy_node(scene_root)
    }

    pub fn open_scenes(&self) -> &[NodeID] {
        &self.open_scenes
    }

    pub fn select(&mut self, id: NodeID) {
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    pub fn selection(&self) -> &[NodeID] {
        &self.selection
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }

    fn tree_or_err(&mut self) -> Result<&mut SceneTree, SceneError> {
        self.tree.as_mut().ok_or(SceneError::NoActiveTree)
    }
}

impl TreeAPI for Host {
    fn tree_root(&self) -> Option<NodeID> {
        self.tree.as_ref().map(SceneTree::root)
    }

    fn open_scene_roots(&self) -> Vec<NodeID> {
        self.open_scenes.clone()
    }

    fn is_live(&self, id: NodeID) -> bool {
        self.tree.as_ref().is_some_and(|t| t.is_live(id))
    }

    fn children(&self, id: NodeID) -> Vec<NodeID> {
        self.tree
            .as_ref()
            .map(|t| t.children(id).to_vec())
            .unwrap_or_default()
    }

    fn node_name(&self, id: NodeID) -> Option<String> {
        self.tree.as_ref()?.get(id).map(|n| n.name.to_string())
    }

    fn scene_file_path(&self, id: NodeID) -> Option<String> {
        self.tree.as_ref()?.get(id)?.scene_file_path.clone()
    }

    fn node_is_class(&self, id: NodeID, class: &str) -> bool {
        self.tree
            .as_ref()
            .is_some_and(|t| t.is_class(id, class, &self.classes))
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
        let tree = self.tree.as_mut().ok_or(SceneError::NoActiveTree)?;
        tree.destroy(id)?;
        let tree = &*tree;
        self.open_scenes.retain(|&s| tree.is_live(s));
        self.selection.retain(|&s| tree.is_live(s));
        Ok(())
    }

    fn create_empty_node(&mut self, name: &str) -> Result<NodeID, SceneError> {
        let name: Cow<'static, str> = Cow::Owned(name.to_string());
        Ok(self.tree_or_err()?.create_node("Node", name))
    }
}

impl EditorAPI for Host {
    fn is_editor(&self) -> bool {
        self.info.mode == EngineMode::Editor
    }

    fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn supports_open_scenes(&self) -> bool {
        self.is_editor() && self.open_scene_support
    }

    fn build_name(&self) -> &str {
        &self.info.build
    }
}

impl DiagnosticsAPI for Host {
    fn push_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

impl ClassAPI for Host {
    fn class_exists(&self, class: &str) -> bool {
        self.classes.class_exists(class)
    }
}
