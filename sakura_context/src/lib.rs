pub mod api;
pub mod sub_apis;

pub use api::ReloadHost;

pub mod prelude {
    pub use crate::api::ReloadHost;
    pub use crate::sub_apis::{ClassAPI, DiagnosticsAPI, EditorAPI, TreeAPI};
}
