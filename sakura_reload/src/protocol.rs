use log::{debug, error, info, warn};
use sakura_context::ReloadHost;
use sakura_ids::NodeID;
use sakura_scene::SceneError;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::gate::HostCapabilityGate;
use crate::registry::{BackupRecord, BackupRegistry, RecordHandle};
use crate::serializer::NodeSerializer;
use crate::walker::TreeWalker;

/// What `finish` does with the rest of a class's records once one of them
/// can't be rebuilt yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingPolicy {
    /// Stop at the first unresolved record; later ones wait for the next call.
    #[default]
    Block,
    /// Keep trying the remaining records.
    Continue,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    pub enabled: bool,
    pub pending_policy: PendingPolicy,
    /// Host builds able to rebuild extension classes outside the editor.
    pub capable_builds: Vec<String>,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pending_policy: PendingPolicy::Block,
            capable_builds: vec!["sakura".to_string()],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    Prepared { pending: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrepareOutcome {
    Disabled,
    UnknownClass,
    NoTree,
    /// Rejected: records from an earlier prepare are still waiting.
    AlreadyPending { pending: usize },
    Captured { captured: usize, failed: usize },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FinishReport {
    pub restored: usize,
    /// Replaced by a permanent empty node on a host that can't rebuild them.
    pub discarded: usize,
    /// Dropped because their scene was gone.
    pub dropped: usize,
    /// Still waiting after this call.
    pub pending: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishOutcome {
    Disabled,
    UnknownClass,
    Finished(FinishReport),
}

/// Two-phase hot reload of extension class instances.
///
/// `prepare` swaps every live instance of a class for an inert placeholder
/// and keeps a packed backup; `finish` rebuilds them once the class is
/// registered again. Both complete all tree mutation before returning.
pub struct ReloadProtocol {
    config: ReloadConfig,
    gate: HostCapabilityGate,
    registry: BackupRegistry,
}

impl Default for ReloadProtocol {
    fn default() -> Self {
        Self::new(ReloadConfig::default())
    }
}

impl ReloadProtocol {
    pub fn new(mut config: ReloadConfig) -> Self {
        if cfg!(feature = "static-sdk") {
            config.enabled = false;
        }
        Self {
            gate: HostCapabilityGate::new(config.capable_builds.iter().cloned()),
            config,
            registry: BackupRegistry::new(),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &ReloadConfig {
        &self.config
    }

    pub fn gate(&self) -> &HostCapabilityGate {
        &self.gate
    }

    pub fn registry(&self) -> &BackupRegistry {
        &self.registry
    }

    pub fn state(&self, class: &str) -> ReloadState {
        match self.registry.pending(class) {
            0 => ReloadState::Idle,
            pending => ReloadState::Prepared { pending },
        }
    }

    /// Back up and unload every live instance of `class`.
    pub fn prepare<H: ReloadHost + ?Sized>(&mut self, host: &mut H, class: &str) -> PrepareOutcome {
        if !self.config.enabled {
            debug!("[sakura] reload disabled, ignoring prepare for `{class}`");
            return PrepareOutcome::Disabled;
        }
        if !host.class_exists(class) {
            debug!("[sakura] prepare: class `{class}` is not registered");
            return PrepareOutcome::UnknownClass;
        }
        let Some(tree_root) = host.tree_root() else {
            debug!("[sakura] prepare: no active tree");
            return PrepareOutcome::NoTree;
        };
        let pending = self.registry.pending(class);
        if pending > 0 {
            warn!("[sakura] `{class}` already has {pending} pending backups, finish it before preparing again");
            return PrepareOutcome::AlreadyPending { pending };
        }

        if host.is_editor() {
            host.clear_selection();
        }
        let roots = if host.is_editor() && host.supports_open_scenes() {
            host.open_scene_roots()
        } else {
            vec![tree_root]
        };

        let (mut captured, mut failed) = (0, 0);
        for root in roots {
            for node in TreeWalker::collect(&*host, root, class) {
                // Nested matches go out with their captured ancestor.
                if !host.is_live(node) {
                    debug!("[sakura] {node} was captured with an ancestor");
                    continue;
                }
                match self.capture(host, root, node, class) {
                    Ok(_) => captured += 1,
                    Err(err) => {
                        error!("[sakura] failed to back up {node} of `{class}`: {err}");
                        failed += 1;
                    }
                }
            }
        }

        info!("[sakura] prepared `{class}`: {captured} captured, {failed} failed");
        PrepareOutcome::Captured { captured, failed }
    }

    fn capture<H: ReloadHost + ?Sized>(
        &mut self,
        host: &mut H,
        root: NodeID,
        node: NodeID,
        class: &str,
    ) -> Result<RecordHandle, CaptureError> {
        let node_name = host.node_name(node).unwrap_or_default();
        let scene_path = host.scene_file_path(root).unwrap_or_default();
        let packed = NodeSerializer::pack(host, node)?;

        let placeholder = host.create_empty_node(&node_name)?;
        if let Err(err) = host.replace_node(node, placeholder, true) {
            if let Err(cleanup) = host.destroy_node(placeholder) {
                warn!("[sakura] failed to free unused placeholder {placeholder}: {cleanup}");
            }
            return Err(err.into());
        }
        if let Err(err) = host.destroy_node(node) {
            warn!("[sakura] replaced {node} could not be freed: {err}");
        }

        // A captured scene root hands the root slot to its placeholder.
        let scene_root = if node == root { placeholder } else { root };
        debug!("[sakura] backed up `{node_name}` behind placeholder {placeholder}");
        let handle = self.registry.add(BackupRecord {
            node_name,
            class_tag: class.to_string(),
            scene_root,
            scene_path,
            packed,
            placeholder,
        })?;
        Ok(handle)
    }

    /// Rebuild the instances backed up by `prepare(class)`.
    pub fn finish<H: ReloadHost + ?Sized>(&mut self, host: &mut H, class: &str) -> FinishOutcome {
        if !self.config.enabled {
            debug!("[sakura] reload disabled, ignoring finish for `{class}`");
            return FinishOutcome::Disabled;
        }
        if !host.class_exists(class) {
            debug!("[sakura] finish: class `{class}` is not registered");
            return FinishOutcome::UnknownClass;
        }

        let capable = self.gate.supports_live_reconstruction(&*host);
        let mut report = FinishReport::default();

        for handle in self.registry.find_by_class(class) {
            let Some(record) = self.registry.get(handle) else {
                continue;
            };

            if !host.is_live(record.scene_root) || !host.is_live(record.placeholder) {
                let message = format!(
                    "[Sakura] Backup of `{}` from {} was dropped: its scene is no longer loaded.",
                    record.node_name, record.scene_path
                );
                error!("{message}");
                host.push_error(&message);
                self.registry.remove(handle);
                report.dropped += 1;
                continue;
            }

            if !capable {
                self.discard(host, handle);
                report.discarded += 1;
                continue;
            }

            let restored = match NodeSerializer::unpack(host, &record.packed) {
                Some(node) => self.restore(host, handle, node),
                None => false,
            };
            if restored {
                report.restored += 1;
            } else if self.config.pending_policy == PendingPolicy::Block {
                debug!("[sakura] `{class}` blocked on an unresolved backup");
                break;
            }
        }

        report.pending = self.registry.pending(class);
        info!(
            "[sakura] finished `{class}`: {} restored, {} discarded, {} dropped, {} pending",
            report.restored, report.discarded, report.dropped, report.pending
        );
        FinishOutcome::Finished(report)
    }

    /// Swap the placeholder for the rebuilt node and resolve the record.
    fn restore<H: ReloadHost + ?Sized>(
        &mut self,
        host: &mut H,
        handle: RecordHandle,
        node: NodeID,
    ) -> bool {
        let Some(record) = self.registry.get(handle) else {
            return false;
        };
        let placeholder = record.placeholder;
        if let Err(err) = host.replace_node(placeholder, node, true) {
            error!("[sakura] failed to restore `{}`: {err}", record.node_name);
            if let Err(cleanup) = host.destroy_node(node) {
                warn!("[sakura] failed to free rebuilt node {node}: {cleanup}");
            }
            return false;
        }
        if let Err(err) = host.destroy_node(placeholder) {
            warn!("[sakura] placeholder {placeholder} could not be freed: {err}");
        }
        debug!("[sakura] restored `{}`", record.node_name);
        self.registry.remove(handle);
        true
    }

    /// The host can't rebuild the class: leave a permanent empty node and
    /// drop the backup. Instance data is lost.
    fn discard<H: ReloadHost + ?Sized>(&mut self, host: &mut H, handle: RecordHandle) {
        let Some(record) = self.registry.remove(handle) else {
            return;
        };
        let message = format!(
            "[Sakura] Runtime hot-reloading of extension classes is only supported by capable host builds; `{}` was replaced by an empty node.",
            record.node_name
        );
        error!("{message}");
        host.push_error(&message);

        if let Err(err) = Self::swap_for_empty(host, &record) {
            warn!("[sakura] keeping placeholder for `{}`: {err}", record.node_name);
        }
    }

    fn swap_for_empty<H: ReloadHost + ?Sized>(
        host: &mut H,
        record: &BackupRecord,
    ) -> Result<(), SceneError> {
        let empty = host.create_empty_node(&record.node_name)?;
        if let Err(err) = host.replace_node(record.placeholder, empty, true) {
            host.destroy_node(empty)?;
            return Err(err);
        }
        host.destroy_node(record.placeholder)
    }

    /// Drop every pending backup. Placeholders stay in the tree.
    pub fn clear(&mut self) {
        if !self.registry.is_empty() {
            warn!("[sakura] discarding {} pending backups", self.registry.len());
        }
        self.registry.clear();
    }
}
