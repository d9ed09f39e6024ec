use indexmap::IndexMap;
use sakura_ids::NodeID;

use crate::error::RegistryError;
use crate::serializer::PackedNode;

/// Stable key of a backup record. Never reused within a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordHandle(u64);

/// One captured instance waiting to be restored.
#[derive(Debug)]
pub struct BackupRecord {
    pub node_name: String,
    pub class_tag: String,
    /// Subtree root the node was captured under. Not owned; only checked
    /// for liveness before the record is resolved.
    pub scene_root: NodeID,
    pub scene_path: String,
    pub packed: PackedNode,
    /// Inert node holding the original's place in the tree.
    pub placeholder: NodeID,
}

/// In-flight backups, kept in insertion order.
#[derive(Debug, Default)]
pub struct BackupRegistry {
    records: IndexMap<RecordHandle, BackupRecord>,
    next: u64,
}

impl BackupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: BackupRecord) -> Result<RecordHandle, RegistryError> {
        if record.packed.is_empty() {
            return Err(RegistryError::EmptyPacked(record.node_name));
        }
        if self
            .records
            .values()
            .any(|r| r.placeholder == record.placeholder)
        {
            return Err(RegistryError::DuplicatePlaceholder(record.placeholder));
        }
        self.next += 1;
        let handle = RecordHandle(self.next);
        self.records.insert(handle, record);
        Ok(handle)
    }

    /// Handles of every record for `class`, oldest first. The result is a
    /// snapshot, so records may be removed while walking it.
    pub fn find_by_class(&self, class: &str) -> Vec<RecordHandle> {
        self.records
            .iter()
            .filter(|(_, r)| r.class_tag == class)
            .map(|(h, _)| *h)
            .collect()
    }

    pub fn pending(&self, class: &str) -> usize {
        self.records.values().filter(|r| r.class_tag == class).count()
    }

    #[inline]
    pub fn get(&self, handle: RecordHandle) -> Option<&BackupRecord> {
        self.records.get(&handle)
    }

    /// Remove a record, keeping the order of the others.
    pub fn remove(&mut self, handle: RecordHandle) -> Option<BackupRecord> {
        self.records.shift_remove(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordHandle, &BackupRecord)> {
        self.records.iter().map(|(h, r)| (*h, r))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, class: &str, placeholder: u32) -> BackupRecord {
        BackupRecord {
            node_name: name.to_string(),
            class_tag: class.to_string(),
            scene_root: NodeID::new(1),
            scene_path: "res://main.scn".to_string(),
            packed: PackedNode::from_bytes(vec![1, 2, 3]),
            placeholder: NodeID::new(placeholder),
        }
    }

    #[test]
    fn keeps_insertion_order_per_class() {
        let mut registry = BackupRegistry::new();
        let a = registry.add(record("A", "X", 10)).unwrap();
        let b = registry.add(record("B", "Y", 11)).unwrap();
        let c = registry.add(record("C", "X", 12)).unwrap();

        assert_eq!(registry.find_by_class("X"), [a, c]);
        assert_eq!(registry.find_by_class("Y"), [b]);
        assert!(registry.find_by_class("Z").is_empty());
        assert_eq!(registry.pending("X"), 2);
    }

    #[test]
    fn removal_during_snapshot_walk() {
        let mut registry = BackupRegistry::new();
        for i in 0..4 {
            registry.add(record("N", "X", 20 + i)).unwrap();
        }
        let mut seen = Vec::new();
        for handle in registry.find_by_class("X") {
            let removed = registry.remove(handle).unwrap();
            seen.push(removed.placeholder.index());
        }
        assert_eq!(seen, [20, 21, 22, 23]);
        assert!(registry.is_empty());
    }

    #[test]
    fn handles_are_never_reused() {
        let mut registry = BackupRegistry::new();
        let first = registry.add(record("A", "X", 1)).unwrap();
        registry.remove(first);
        let second = registry.add(record("A", "X", 1)).unwrap();
        assert_ne!(first, second);
        assert!(registry.get(first).is_none());
        assert!(registry.remove(first).is_none());
    }

    #[test]
    fn rejects_shared_placeholders_and_empty_packs() {
        let mut registry = BackupRegistry::new();
        registry.add(record("A", "X", 5)).unwrap();
        assert!(matches!(
            registry.add(record("B", "X", 5)),
            Err(RegistryError::DuplicatePlaceholder(_))
        ));

        let mut empty = record("C", "X", 6);
        empty.packed = PackedNode::from_bytes(Vec::new());
        assert!(matches!(
            registry.add(empty),
            Err(RegistryError::EmptyPacked(name)) if name == "C"
        ));

        registry.clear();
        assert_eq!(registry.len(), 0);
    }
}
