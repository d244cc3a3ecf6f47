use crate::node::NodeId;

/// Errors surfaced by genome, species and population operations.
#[derive(Debug, thiserror::Error)]
pub enum NeatError {
    #[error("Invalid topology: {reason}")]
    InvalidTopology { reason: String },
    #[error("Fitness-proportionate selection over a total fitness of {total}")]
    DegenerateSelection { total: f32 },
    #[error("Expected {expected} input values, got {actual}")]
    InputMismatch { expected: usize, actual: usize },
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Failed to parse settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl NeatError {
    pub(crate) fn layer_order(from: NodeId, from_layer: usize, to: NodeId, to_layer: usize) -> Self {
        Self::InvalidTopology {
            reason: format!(
                "connection {} (layer {}) -> {} (layer {}) does not increase layer",
                from, from_layer, to, to_layer
            ),
        }
    }
}
