mod class;
mod diagnostics;
mod editor;
mod tree;

pub use class::ClassAPI;
pub use diagnostics::DiagnosticsAPI;
pub use editor::EditorAPI;
pub use tree::TreeAPI;
