use sakura_ids::NodeID;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("no scene tree is active")]
    NoActiveTree,

    #[error("node {0} does not exist")]
    NodeNotFound(NodeID),

    #[error("node {0} already has a parent")]
    AlreadyParented(NodeID),

    #[error("node {0} has no parent and is not the tree root")]
    Detached(NodeID),

    #[error("node {0} is the tree root and cannot be destroyed")]
    TreeRoot(NodeID),

    #[error("cannot parent node {child} under its own descendant {parent}")]
    CyclicParent { parent: NodeID, child: NodeID },

    #[error("class `{0}` is not registered")]
    UnknownClass(String),

    #[error("class `{0}` is already registered")]
    ClassAlreadyRegistered(String),

    #[error("class `{0}` is a core class and cannot be unregistered")]
    CoreClass(String),

    #[error("packed scene has no nodes")]
    EmptyPackedScene,

    #[error("packed scene entry {index} references missing parent {parent}")]
    BrokenPackedParent { index: usize, parent: u32 },

    #[error("packed scene encoding failed: {0}")]
    Encode(#[source] bincode::Error),

    #[error("packed scene decoding failed: {0}")]
    Decode(#[source] bincode::Error),
}
