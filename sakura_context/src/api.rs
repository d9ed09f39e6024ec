use crate::sub_apis::{ClassAPI, DiagnosticsAPI, EditorAPI, TreeAPI};

/// Everything the reload protocol needs from its host.
pub trait ReloadHost: TreeAPI + EditorAPI + DiagnosticsAPI + ClassAPI {}
impl<T> ReloadHost for T where T: TreeAPI + EditorAPI + DiagnosticsAPI + ClassAPI {}
