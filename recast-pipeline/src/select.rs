//! Stream selection.

use crate::error::{PipelineError, Result};
use recast_containers::Demuxer;
use recast_core::format::TrackType;
use tracing::debug;

/// Pick the first stream of the wanted kind, scanning in declaration order.
pub fn select_stream(demuxer: &dyn Demuxer, kind: TrackType) -> Result<usize> {
    for index in 0..demuxer.num_streams() {
        if let Some(info) = demuxer.stream_info(index) {
            if info.track_type == kind {
                debug!(index, codec = %info.codec_id, "selected stream");
                return Ok(index);
            }
        }
    }
    Err(PipelineError::NoMatchingStream(kind))
}
