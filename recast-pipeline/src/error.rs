//! Pipeline error types.

use recast_core::error::{CodecError, ContainerError, Error as CoreError};
use recast_core::format::TrackType;
use thiserror::Error;

/// Pipeline error type.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Codec error.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Container error.
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The input carries no stream of the wanted kind.
    #[error("No {0:?} stream in input")]
    NoMatchingStream(TrackType),

    /// Stream not found.
    #[error("Stream {0} not found")]
    StreamNotFound(usize),

    /// Input submitted after end of stream was signalled.
    #[error("Submit after finish")]
    SubmitAfterFinish,

    /// Operation attempted in the wrong driver state.
    #[error("Invalid pipeline state: {0}")]
    InvalidState(&'static str),
}

/// Pipeline result type.
pub type Result<T> = std::result::Result<T, PipelineError>;
