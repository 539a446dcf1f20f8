use thiserror::Error;

/// Failures at the edges of the chamber: config files, preference files, the window.
///
/// The simulator itself never fails; these only surface while loading or
/// persisting, and the host decides whether they matter.
#[derive(Debug, Error)]
pub enum ChamberError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("sdl error: {0}")]
    Sdl(String),
}

pub type Result<T, E = ChamberError> = std::result::Result<T, E>;
