use indexmap::IndexMap;

use crate::error::SceneError;

/// Where a class definition comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassApi {
    /// Built into the host; never unloaded.
    Core,
    /// Registered by an extension module; unloaded and re-registered on reload.
    Extension,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub parent: Option<String>,
    pub api: ClassApi,
}

/// Registry of known classes and their inheritance chain.
pub struct ClassDB {
    classes: IndexMap<String, ClassInfo>,
}

impl Default for ClassDB {
    fn default() -> Self {
        Self::with_core_classes()
    }
}

impl ClassDB {
    /// Empty registry (no core classes). Mostly useful in tests.
    pub fn empty() -> Self {
        Self {
            classes: IndexMap::new(),
        }
    }

    /// Registry pre-filled with the host's core node hierarchy.
    pub fn with_core_classes() -> Self {
        let mut db = Self::empty();
        for (name, parent) in [
            ("Object", None),
            ("Node", Some("Object")),
            ("Window", Some("Node")),
            ("Node2D", Some("Node")),
            ("Sprite2D", Some("Node2D")),
            ("Node3D", Some("Node")),
            ("Control", Some("Node")),
        ] {
            db.classes.insert(
                name.to_string(),
                ClassInfo {
                    name: name.to_string(),
                    parent: parent.map(str::to_string),
                    api: ClassApi::Core,
                },
            );
        }
        db
    }

    pub fn register_core(&mut self, name: &str, parent: &str) -> Result<(), SceneError> {
        self.register(name, parent, ClassApi::Core)
    }

    pub fn register_extension(&mut self, name: &str, parent: &str) -> Result<(), SceneError> {
        self.register(name, parent, ClassApi::Extension)
    }

    fn register(&mut self, name: &str, parent: &str, api: ClassApi) -> Result<(), SceneError> {
        if self.classes.contains_key(name) {
            return Err(SceneError::ClassAlreadyRegistered(name.to_string()));
        }
        if !self.classes.contains_key(parent) {
            return Err(SceneError::UnknownClass(parent.to_string()));
        }
        self.classes.insert(
            name.to_string(),
            ClassInfo {
                name: name.to_string(),
                parent: Some(parent.to_string()),
                api,
            },
        );
        log::debug!("registered {:?} class `{}` (extends `{}`)", api, name, parent);
        Ok(())
    }

    /// Remove an extension class. Subclasses stay registered but their chain
    /// now stops at the missing link, so they no longer report is-a through it.
    pub fn unregister(&mut self, name: &str) -> Result<ClassInfo, SceneError> {
        match self.classes.get(name) {
            None => Err(SceneError::UnknownClass(name.to_string())),
            Some(info) if info.api == ClassApi::Core => {
                Err(SceneError::CoreClass(name.to_string()))
            }
            Some(_) => {
                let info = self
                    .classes
                    .shift_remove(name)
                    .ok_or_else(|| SceneError::UnknownClass(name.to_string()))?;
                log::debug!("unregistered class `{}`", name);
                Ok(info)
            }
        }
    }

    #[inline]
    pub fn class_exists(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn parent_class(&self, name: &str) -> Option<&str> {
        self.classes.get(name)?.parent.as_deref()
    }

    pub fn is_extension(&self, name: &str) -> bool {
        self.classes
            .get(name)
            .is_some_and(|info| info.api == ClassApi::Extension)
    }

    /// True when `class` is `ancestor` or inherits from it.
    pub fn is_parent_class(&self, class: &str, ancestor: &str) -> bool {
        let mut current = Some(class);
        // Chains are acyclic by construction (parents must exist before children).
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            current = self.parent_class(name);
        }
        false
    }

    pub fn extension_classes(&self) -> impl Iterator<Item = &str> {
        self.classes
            .values()
            .filter(|info| info.api == ClassApi::Extension)
            .map(|info| info.name.as_str())
    }
}
