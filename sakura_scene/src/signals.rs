use rustc_hash::FxHashMap;
use sakura_ids::{NodeID, SlotKey};
use smallvec::SmallVec;

/// Native callback signature handed over by extension modules.
pub type RawCallback = extern "C" fn();

/// One-shot callback token.
///
/// Consumed by [`EventCallback::invoke`], so it can run at most once; whatever
/// it captured is released right after. Tokens made from a [`RawCallback`]
/// point into extension code and are marked foreign so they can be purged
/// before that code is unloaded.
pub struct EventCallback {
    callback: Box<dyn FnOnce()>,
    foreign: bool,
}

impl EventCallback {
    pub fn new(callback: impl FnOnce() + 'static) -> Self {
        Self {
            callback: Box::new(callback),
            foreign: false,
        }
    }

    pub fn from_raw(callback: RawCallback) -> Self {
        Self {
            callback: Box::new(move || callback()),
            foreign: true,
        }
    }

    pub fn is_foreign(&self) -> bool {
        self.foreign
    }

    pub fn invoke(self) {
        (self.callback)();
    }
}

impl std::fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EventCallback")
    }
}

/// Per-node signal connections holding one-shot callbacks.
#[derive(Default)]
pub struct SignalBus {
    connections: FxHashMap<(NodeID, SlotKey), SmallVec<[EventCallback; 2]>>,
}

impl SignalBus {
    pub fn connect_once(&mut self, node: NodeID, signal: &str, callback: EventCallback) {
        self.connections
            .entry((node, SlotKey::from_string(signal)))
            .or_default()
            .push(callback);
    }

    /// Fire every callback connected to `signal` on `node`, in connection
    /// order. Returns how many ran; they are all disconnected afterwards.
    pub fn emit(&mut self, node: NodeID, signal: &str) -> usize {
        let Some(callbacks) = self.connections.remove(&(node, SlotKey::from_string(signal))) else {
            return 0;
        };
        let count = callbacks.len();
        for callback in callbacks {
            callback.invoke();
        }
        count
    }

    pub fn connection_count(&self, node: NodeID, signal: &str) -> usize {
        self.connections
            .get(&(node, SlotKey::from_string(signal)))
            .map_or(0, |c| c.len())
    }

    /// Drop every foreign callback, on every node. Returns how many went.
    pub fn purge_foreign(&mut self) -> usize {
        let mut purged = 0;
        self.connections.retain(|_, callbacks| {
            let before = callbacks.len();
            callbacks.retain(|callback| !callback.is_foreign());
            purged += before - callbacks.len();
            !callbacks.is_empty()
        });
        purged
    }

    /// Drop every connection on a node that is being destroyed.
    pub fn disconnect_node(&mut self, node: NodeID) {
        self.connections.retain(|(id, _), _| *id != node);
    }
}
