use thiserror::Error;

/// Failures surfaced by chip construction and save-states. Register traffic
/// never fails.
#[derive(Debug, Error)]
pub enum PokeyError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("incompatible save state: {0}")]
    IncompatibleState(String),
    #[error("save state error: {0}")]
    Json(#[from] serde_json::Error),
}
