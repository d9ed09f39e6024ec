use sakura_context::prelude::EditorAPI;

/// Decides whether the host can rebuild instances of extension classes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostCapabilityGate {
    capable_builds: Vec<String>,
}

impl HostCapabilityGate {
    pub fn new(capable_builds: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            capable_builds: capable_builds.into_iter().map(Into::into).collect(),
        }
    }

    /// Editor with open-scene enumeration, or a build listed as capable.
    pub fn supports_live_reconstruction<H: EditorAPI + ?Sized>(&self, host: &H) -> bool {
        (host.is_editor() && host.supports_open_scenes())
            || self.capable_builds.iter().any(|b| b == host.build_name())
    }

    /// Whether a reload cycle may be started at all. Editors need open-scene
    /// enumeration to find every instance; running games always qualify.
    pub fn supports_reload<H: EditorAPI + ?Sized>(host: &H) -> bool {
        !host.is_editor() || host.supports_open_scenes()
    }
}
