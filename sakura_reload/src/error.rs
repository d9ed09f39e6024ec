use sakura_ids::NodeID;
use sakura_scene::SceneError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("node {0} is not live")]
    NotLive(NodeID),

    #[error("could not copy node {node} for packing: {source}")]
    Duplicate {
        node: NodeID,
        #[source]
        source: SceneError,
    },

    #[error("could not capture node {node}: {source}")]
    Capture {
        node: NodeID,
        #[source]
        source: SceneError,
    },

    #[error("capture of node {0} produced no nodes")]
    Empty(NodeID),

    #[error(transparent)]
    Encode(SceneError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("placeholder {0} already backs another record")]
    DuplicatePlaceholder(NodeID),

    #[error("record for `{0}` has an empty packed form")]
    EmptyPacked(String),
}

/// Why a single match could not be captured during prepare.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
