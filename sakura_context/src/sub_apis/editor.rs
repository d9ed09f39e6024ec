pub trait EditorAPI {
    fn is_editor(&self) -> bool;

    fn clear_selection(&mut self);

    /// The authoring host can enumerate every open scene root.
    fn supports_open_scenes(&self) -> bool;

    fn build_name(&self) -> &str;
}
