//! Raw (uncompressed) video codec.
//!
//! "Decoding" unpacks tightly-packed planar pixel data into a strided
//! [`Frame`]; "encoding" packs a frame back into tight bytes. Both sides
//! are stateless, so `flush` never returns anything.

use crate::traits::{CodecInfo, DecoderConfig, EncoderConfig, VideoDecoder, VideoEncoder};
use recast_core::error::{CodecError, Result};
use recast_core::frame::{Frame, FrameFlags, PixelFormat};
use recast_core::packet::{Packet, PacketFlags};
use recast_core::timestamp::Duration;
use tracing::trace;

const RAWVIDEO_INFO: CodecInfo = CodecInfo {
    name: "rawvideo",
    long_name: "Uncompressed planar video",
    can_encode: true,
    can_decode: true,
};

/// Decoder for uncompressed planar video.
pub struct RawVideoDecoder {
    width: u32,
    height: u32,
    format: PixelFormat,
    config: DecoderConfig,
}

impl RawVideoDecoder {
    /// Create a raw video decoder from the stream description.
    pub fn new(config: DecoderConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(CodecError::DecoderConfig(format!(
                "invalid dimensions {}x{}",
                config.width, config.height
            ))
            .into());
        }
        let format = config.pixel_format.unwrap_or(PixelFormat::Yuv420p);
        Ok(Self {
            width: config.width,
            height: config.height,
            format,
            config,
        })
    }
}

impl VideoDecoder for RawVideoDecoder {
    fn codec_info(&self) -> CodecInfo {
        RAWVIDEO_INFO
    }

    fn decode(&mut self, packet: &Packet<'_>) -> Result<Vec<Frame>> {
        let expected = self.format.frame_size(self.width, self.height);
        if packet.size() != expected {
            return Err(CodecError::CorruptData(format!(
                "raw frame is {} bytes, expected {expected}",
                packet.size()
            ))
            .into());
        }

        let mut frame = Frame::new(self.width, self.height, self.format, self.config.time_base);
        let data = packet.data();
        let mut offset = 0;
        for plane in 0..self.format.num_planes() {
            let row_bytes = self.format.plane_row_bytes(plane, self.width);
            let rows = self.format.plane_height(plane, self.height);
            let stride = frame.stride(plane);
            let dst = frame
                .plane_mut(plane)
                .ok_or_else(|| CodecError::Other("missing frame plane".into()))?;
            for row in 0..rows {
                dst[row * stride..row * stride + row_bytes]
                    .copy_from_slice(&data[offset..offset + row_bytes]);
                offset += row_bytes;
            }
        }

        frame.pts = packet.pts;
        frame.duration = packet.duration;
        // Every raw frame stands alone.
        frame.flags |= FrameFlags::KEYFRAME;
        trace!(pts = frame.pts.value, "decoded raw frame");
        Ok(vec![frame])
    }

    fn flush(&mut self) -> Result<Vec<Frame>> {
        Ok(Vec::new())
    }
}

/// Encoder for uncompressed planar video.
pub struct RawVideoEncoder {
    config: EncoderConfig,
}

impl RawVideoEncoder {
    /// Create a raw video encoder from the output description.
    pub fn new(config: EncoderConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(CodecError::EncoderConfig(format!(
                "invalid dimensions {}x{}",
                config.width, config.height
            ))
            .into());
        }
        Ok(Self { config })
    }
}

impl VideoEncoder for RawVideoEncoder {
    fn codec_info(&self) -> CodecInfo {
        RAWVIDEO_INFO
    }

    fn encode(&mut self, frame: &Frame) -> Result<Vec<Packet<'static>>> {
        if frame.width() != self.config.width
            || frame.height() != self.config.height
            || frame.format() != self.config.pixel_format
        {
            return Err(CodecError::EncoderConfig(format!(
                "frame {}x{} {} does not match encoder {}x{} {}",
                frame.width(),
                frame.height(),
                frame.format(),
                self.config.width,
                self.config.height,
                self.config.pixel_format
            ))
            .into());
        }

        let format = frame.format();
        let mut data = Vec::with_capacity(format.frame_size(frame.width(), frame.height()));
        for plane in 0..format.num_planes() {
            let row_bytes = format.plane_row_bytes(plane, frame.width());
            let rows = format.plane_height(plane, frame.height());
            let stride = frame.stride(plane);
            let src = frame
                .plane(plane)
                .ok_or_else(|| CodecError::Other("missing frame plane".into()))?;
            for row in 0..rows {
                data.extend_from_slice(&src[row * stride..row * stride + row_bytes]);
            }
        }

        let packet = Packet::new(data)
            .with_timestamps(frame.pts, frame.pts)
            .with_duration(Duration::new(1, self.config.time_base))
            .with_flags(PacketFlags::KEYFRAME);
        trace!(pts = packet.pts.value, size = packet.size(), "encoded raw frame");
        Ok(vec![packet])
    }

    fn flush(&mut self) -> Result<Vec<Packet<'static>>> {
        Ok(Vec::new())
    }

    fn extra_data(&self) -> Option<&[u8]> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_core::format::CodecId;
    use recast_core::timestamp::{TimeBase, Timestamp};

    fn tight_frame_bytes(width: u32, height: u32) -> Vec<u8> {
        let size = PixelFormat::Yuv420p.frame_size(width, height);
        (0..size).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_decode_encode_round_trip() {
        let tb = TimeBase::new(1, 30);
        let config = DecoderConfig::new(CodecId::RawVideo, 6, 4)
            .with_pixel_format(PixelFormat::Yuv420p)
            .with_time_base(tb);
        let mut decoder = RawVideoDecoder::new(config).unwrap();
        let mut encoder = RawVideoEncoder::new(EncoderConfig::new(
            CodecId::RawVideo,
            6,
            4,
            PixelFormat::Yuv420p,
        ))
        .unwrap();

        let bytes = tight_frame_bytes(6, 4);
        let packet = Packet::new(bytes.clone())
            .with_timestamps(Timestamp::new(7, tb), Timestamp::new(7, tb));

        let frames = decoder.decode(&packet).unwrap();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.pts.value, 7);
        assert!(frame.is_keyframe());

        let packets = encoder.encode(frame).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].data(), bytes.as_slice());
        assert_eq!(packets[0].pts.value, 7);
        assert!(packets[0].is_keyframe());
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        let config = DecoderConfig::new(CodecId::RawVideo, 6, 4)
            .with_pixel_format(PixelFormat::Yuv420p);
        let mut decoder = RawVideoDecoder::new(config).unwrap();
        let packet = Packet::new(vec![0u8; 5]);
        assert!(decoder.decode(&packet).is_err());
    }

    #[test]
    fn test_encode_rejects_layout_mismatch() {
        let mut encoder = RawVideoEncoder::new(EncoderConfig::new(
            CodecId::RawVideo,
            6,
            4,
            PixelFormat::Yuv420p,
        ))
        .unwrap();
        let frame = Frame::new(8, 4, PixelFormat::Yuv420p, TimeBase::new(1, 30));
        assert!(encoder.encode(&frame).is_err());
    }

    #[test]
    fn test_flush_is_empty() {
        let config = DecoderConfig::new(CodecId::RawVideo, 2, 2);
        let mut decoder = RawVideoDecoder::new(config).unwrap();
        assert!(decoder.flush().unwrap().is_empty());
    }
}
