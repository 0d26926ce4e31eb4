//! Common codec traits and configuration.
//!
//! This module defines the core traits implemented by video codecs:
//!
//! - [`VideoDecoder`] - turns compressed packets into raw frames
//! - [`VideoEncoder`] - turns raw frames into compressed packets
//!
//! Both traits follow a submit/drain discipline: each `decode`/`encode`
//! call may return zero or more outputs, and `flush` drains whatever the
//! codec still holds once input is exhausted.

use recast_core::{CodecId, Frame, Packet, PixelFormat, Rational, Result, TimeBase};

/// Information about a codec implementation.
#[derive(Debug, Clone)]
pub struct CodecInfo {
    /// Codec name.
    pub name: &'static str,
    /// Long name/description.
    pub long_name: &'static str,
    /// Whether this codec supports encoding.
    pub can_encode: bool,
    /// Whether this codec supports decoding.
    pub can_decode: bool,
}

/// Parameters handed to a decoder factory when a decoder is opened.
///
/// Populated from the demuxed stream description.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Codec to decode.
    pub codec: CodecId,
    /// Coded frame width in pixels.
    pub width: u32,
    /// Coded frame height in pixels.
    pub height: u32,
    /// Pixel format of the decoded frames, when the container declares one.
    pub pixel_format: Option<PixelFormat>,
    /// Time base of the incoming packets.
    pub time_base: TimeBase,
    /// Codec-specific configuration bytes from the container, if any.
    pub extra_data: Option<Vec<u8>>,
}

impl DecoderConfig {
    /// Create a decoder configuration for the given codec and dimensions.
    pub fn new(codec: CodecId, width: u32, height: u32) -> Self {
        Self {
            codec,
            width,
            height,
            pixel_format: None,
            time_base: TimeBase::new(1, 30),
            extra_data: None,
        }
    }

    /// Set the decoded pixel format.
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = Some(format);
        self
    }

    /// Set the packet time base.
    pub fn with_time_base(mut self, time_base: TimeBase) -> Self {
        self.time_base = time_base;
        self
    }

    /// Set codec-specific configuration bytes.
    pub fn with_extra_data(mut self, data: Vec<u8>) -> Self {
        self.extra_data = Some(data);
        self
    }
}

/// Parameters handed to an encoder factory when an encoder is opened.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Codec to encode with.
    pub codec: CodecId,
    /// Output frame width in pixels.
    pub width: u32,
    /// Output frame height in pixels.
    pub height: u32,
    /// Pixel format the encoder accepts.
    pub pixel_format: PixelFormat,
    /// Time base of the produced packets.
    pub time_base: TimeBase,
    /// Nominal frame rate.
    pub frame_rate: Rational,
    /// Keyframe interval in frames.
    pub gop_size: u32,
    /// Target bitrate in bits per second, when the codec supports one.
    pub bitrate: Option<u64>,
}

impl EncoderConfig {
    /// Create an encoder configuration with defaults for a 30 fps stream.
    pub fn new(codec: CodecId, width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            codec,
            width,
            height,
            pixel_format,
            time_base: TimeBase::new(1, 30),
            frame_rate: Rational::new(30, 1),
            gop_size: 10,
            bitrate: None,
        }
    }

    /// Set the output time base, also aligning the frame rate to its inverse.
    pub fn with_time_base(mut self, time_base: TimeBase) -> Self {
        self.time_base = time_base;
        self.frame_rate = time_base.as_rational().recip();
        self
    }

    /// Set the keyframe interval.
    pub fn with_gop_size(mut self, gop_size: u32) -> Self {
        self.gop_size = gop_size;
        self
    }

    /// Set the target bitrate.
    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = Some(bitrate);
        self
    }
}

/// Common trait for video decoders.
pub trait VideoDecoder: Send {
    /// Get codec information.
    fn codec_info(&self) -> CodecInfo;

    /// Decode a packet into frames.
    ///
    /// May return zero or more frames depending on the codec's delay.
    fn decode(&mut self, packet: &Packet<'_>) -> Result<Vec<Frame>>;

    /// Flush the decoder, returning any buffered frames.
    fn flush(&mut self) -> Result<Vec<Frame>>;
}

impl std::fmt::Debug for dyn VideoDecoder + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoDecoder")
            .field("codec", &self.codec_info())
            .finish()
    }
}

/// Common trait for video encoders.
pub trait VideoEncoder: Send {
    /// Get codec information.
    fn codec_info(&self) -> CodecInfo;

    /// Encode a frame into packets.
    ///
    /// May return zero or more packets depending on the codec's delay.
    fn encode(&mut self, frame: &Frame) -> Result<Vec<Packet<'static>>>;

    /// Flush the encoder, returning any buffered packets.
    fn flush(&mut self) -> Result<Vec<Packet<'static>>>;

    /// Get the codec-specific configuration data (e.g. SPS/PPS for H.264).
    fn extra_data(&self) -> Option<&[u8]>;
}
