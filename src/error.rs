use thiserror::Error;

/// Main error type for the caption speaker
#[derive(Error, Debug)]
pub enum CaptionError {
    /// The track has no usable caption document. This is an expected outcome,
    /// callers log it and carry on without synchronized speech.
    #[error("No captions available")]
    NoCaptions,

    #[error("Malformed caption track list: {0}")]
    TrackList(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CaptionError>;
