//! Container formats for the recast library.
//!
//! Exposes the [`Demuxer`] and [`Muxer`] traits plus the built-in IVF
//! implementation, and path-based helpers that select a format from the
//! file extension.

pub mod ivf;
pub mod traits;

pub use ivf::{IvfDemuxer, IvfMuxer};
pub use traits::{AudioStreamInfo, Demuxer, Muxer, StreamInfo, VideoStreamInfo};

use recast_core::error::{ContainerError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

fn extension_of(path: &Path) -> Result<&str> {
    path.extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ContainerError::UnknownFormat(path.display().to_string()).into())
}

/// Open an input file, choosing the demuxer from the file extension.
pub fn open_input(path: impl AsRef<Path>) -> Result<Box<dyn Demuxer>> {
    let path = path.as_ref();
    let ext = extension_of(path)?.to_ascii_lowercase();
    match ext.as_str() {
        "ivf" => {
            info!(path = %path.display(), "opening IVF input");
            let reader = BufReader::new(File::open(path)?);
            Ok(Box::new(IvfDemuxer::new(reader)?))
        }
        other => Err(ContainerError::UnknownFormat(other.to_string()).into()),
    }
}

/// Create an output file, choosing the muxer from the file extension.
pub fn create_output(path: impl AsRef<Path>) -> Result<Box<dyn Muxer>> {
    let path = path.as_ref();
    let ext = extension_of(path)?.to_ascii_lowercase();
    match ext.as_str() {
        "ivf" => {
            info!(path = %path.display(), "creating IVF output");
            let writer = BufWriter::new(File::create(path)?);
            Ok(Box::new(IvfMuxer::new(writer)))
        }
        other => Err(ContainerError::UnknownFormat(other.to_string()).into()),
    }
}
