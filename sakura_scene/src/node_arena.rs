use sakura_ids::NodeID;

use crate::node::SceneNode;

struct Slot {
    generation: u32,
    node: Option<SceneNode>,
}

/// Arena-based storage for scene nodes.
/// NodeID index 0 is reserved (nil), so index N lives in `slots[N - 1]`.
/// Freed slots are recycled with a bumped generation; IDs that point at an
/// older generation stop resolving, which is how stale references are detected.
pub struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: u32,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena {
    /// Create a new empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Create a new arena with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Insert a node, assigning it a fresh ID (written back into `node.id`).
    pub fn insert(&mut self, mut node: SceneNode) -> NodeID {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[(index - 1) as usize];
                NodeID::from_parts(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: None,
                });
                NodeID::from_parts(self.slots.len() as u32, 0)
            }
        };

        node.id = id;
        self.slots[(id.index() - 1) as usize].node = Some(node);
        self.live += 1;
        id
    }

    #[inline]
    fn slot_index(&self, id: NodeID) -> Option<usize> {
        if id.is_nil() {
            return None;
        }
        let idx = (id.index() as usize) - 1;
        let slot = self.slots.get(idx)?;
        (slot.generation == id.generation()).then_some(idx)
    }

    /// Get a reference to the node (if present and not stale).
    #[inline]
    pub fn get(&self, id: NodeID) -> Option<&SceneNode> {
        let idx = self.slot_index(id)?;
        self.slots[idx].node.as_ref()
    }

    /// Get a mutable reference to the node (if present and not stale).
    #[inline]
    pub fn get_mut(&mut self, id: NodeID) -> Option<&mut SceneNode> {
        let idx = self.slot_index(id)?;
        self.slots[idx].node.as_mut()
    }

    /// Remove a node, bumping the slot generation so `id` goes stale.
    pub fn remove(&mut self, id: NodeID) -> Option<SceneNode> {
        let idx = self.slot_index(id)?;
        let slot = &mut self.slots[idx];
        let out = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.live -= 1;
        Some(out)
    }

    #[inline]
    pub fn contains_key(&self, id: NodeID) -> bool {
        self.get(id).is_some()
    }

    /// Get the number of live nodes in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.live as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over all live nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeID, &SceneNode)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.node.as_ref().map(|node| (node.id, node)))
    }
}
