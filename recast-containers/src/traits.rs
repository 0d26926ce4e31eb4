//! Container format traits for demuxing and muxing.
//!
//! These traits are the boundary between the pipeline and concrete
//! container implementations. Demuxers produce a lazy, finite, forward-only
//! packet sequence; muxers accept finished packets in non-decreasing DTS
//! order per stream.

use recast_core::error::Result;
use recast_core::format::{CodecId, TrackType};
use recast_core::frame::PixelFormat;
use recast_core::packet::Packet;
use recast_core::rational::Rational;
use recast_core::timestamp::TimeBase;

/// Stream information exposed by a demuxer and declared to a muxer.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Stream index within the container.
    pub index: usize,
    /// Track type.
    pub track_type: TrackType,
    /// Codec identity.
    pub codec_id: CodecId,
    /// Time base of the stream's timestamps.
    pub time_base: TimeBase,
    /// Codec-specific extra data (parameter sets and the like).
    pub extra_data: Option<Vec<u8>>,
    /// Video-specific info.
    pub video: Option<VideoStreamInfo>,
    /// Audio-specific info.
    pub audio: Option<AudioStreamInfo>,
}

/// Video stream information.
#[derive(Debug, Clone)]
pub struct VideoStreamInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format, when the container carries one.
    pub pixel_format: Option<PixelFormat>,
    /// Frame rate, when known.
    pub frame_rate: Option<Rational>,
}

/// Audio stream information.
#[derive(Debug, Clone)]
pub struct AudioStreamInfo {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u8,
}

/// Demuxer trait for reading container formats.
///
/// The packet sequence is forward-only and not restartable: callers must
/// never assume they can re-read or look ahead.
pub trait Demuxer: Send {
    /// Get container format name.
    fn format_name(&self) -> &str;

    /// Get number of streams.
    fn num_streams(&self) -> usize;

    /// Get stream information.
    fn stream_info(&self, index: usize) -> Option<&StreamInfo>;

    /// Read the next packet, or `None` once the container is exhausted.
    fn read_packet(&mut self) -> Result<Option<Packet<'static>>>;

    /// Release any resources held by the demuxer.
    fn close(&mut self) {}
}

impl std::fmt::Debug for dyn Demuxer + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Demuxer")
            .field("format", &self.format_name())
            .finish()
    }
}

/// Muxer trait for writing container formats.
pub trait Muxer: Send {
    /// Get container format name.
    fn format_name(&self) -> &str;

    /// Declare an output stream. Returns the output stream index.
    ///
    /// All streams must be declared before [`Muxer::write_header`].
    fn add_stream(&mut self, info: StreamInfo) -> Result<usize>;

    /// Time base the muxer chose for a declared stream.
    fn stream_time_base(&self, index: usize) -> Option<TimeBase>;

    /// Write the container header.
    fn write_header(&mut self) -> Result<()>;

    /// Write a packet.
    ///
    /// Callers must supply packets in non-decreasing DTS order per stream;
    /// the muxer does not reorder or validate.
    fn write_packet(&mut self, packet: &Packet<'_>) -> Result<()>;

    /// Write the trailer and finalize the container.
    fn write_trailer(&mut self) -> Result<()>;

    /// Release any resources held by the muxer.
    fn close(&mut self) {}
}
