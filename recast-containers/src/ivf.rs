//! IVF container support.
//!
//! IVF is a minimal video container: a fixed 32-byte global header followed
//! by length-prefixed frames, each carrying a 64-bit presentation timestamp.
//! It is single-stream by construction, which matches the pipeline's
//! single-stream scope.

use crate::traits::{Demuxer, Muxer, StreamInfo, VideoStreamInfo};
use recast_core::error::{ContainerError, Result};
use recast_core::format::{CodecId, TrackType};
use recast_core::frame::PixelFormat;
use recast_core::packet::Packet;
use recast_core::rational::Rational;
use recast_core::timestamp::{TimeBase, Timestamp};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::debug;

const IVF_SIGNATURE: &[u8; 4] = b"DKIF";
const IVF_HEADER_LEN: usize = 32;
const IVF_FRAME_HEADER_LEN: usize = 12;
// Byte offset of the frame-count field, patched by the trailer.
const IVF_FRAME_COUNT_OFFSET: u64 = 24;

/// IVF demuxer over any byte source.
#[derive(Debug)]
pub struct IvfDemuxer<R> {
    reader: R,
    stream: StreamInfo,
    /// Bytes consumed so far, reported as the packet position hint.
    offset: u64,
    eof: bool,
}

impl<R: Read> IvfDemuxer<R> {
    /// Open an IVF stream, parsing the global header.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut header = [0u8; IVF_HEADER_LEN];
        reader
            .read_exact(&mut header)
            .map_err(|_| ContainerError::InvalidStructure("short IVF header".into()))?;

        if &header[0..4] != IVF_SIGNATURE {
            return Err(ContainerError::InvalidStructure("missing DKIF signature".into()).into());
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != 0 {
            return Err(ContainerError::InvalidStructure(format!(
                "unsupported IVF version {version}"
            ))
            .into());
        }
        let header_len = u16::from_le_bytes([header[6], header[7]]) as usize;
        if header_len != IVF_HEADER_LEN {
            return Err(ContainerError::InvalidStructure(format!(
                "unexpected IVF header length {header_len}"
            ))
            .into());
        }

        let fourcc = [header[8], header[9], header[10], header[11]];
        let codec_id = CodecId::from_fourcc(fourcc);
        let width = u16::from_le_bytes([header[12], header[13]]) as u32;
        let height = u16::from_le_bytes([header[14], header[15]]) as u32;
        let tb_den = u32::from_le_bytes([header[16], header[17], header[18], header[19]]);
        let tb_num = u32::from_le_bytes([header[20], header[21], header[22], header[23]]);
        if width == 0 || height == 0 || tb_den == 0 || tb_num == 0 {
            return Err(ContainerError::InvalidStructure("zero dimension or time base".into()).into());
        }

        let time_base = TimeBase::new(tb_num as i64, tb_den as i64);
        // The I420 fourcc implies the pixel layout; compressed codecs don't.
        let pixel_format = match codec_id {
            CodecId::RawVideo => Some(PixelFormat::Yuv420p),
            _ => None,
        };

        debug!(codec = %codec_id, width, height, time_base = %time_base.0, "parsed IVF header");

        let stream = StreamInfo {
            index: 0,
            track_type: TrackType::Video,
            codec_id,
            time_base,
            extra_data: None,
            video: Some(VideoStreamInfo {
                width,
                height,
                pixel_format,
                frame_rate: Some(Rational::new(tb_den as i64, tb_num as i64)),
            }),
            audio: None,
        };

        Ok(Self {
            reader,
            stream,
            offset: IVF_HEADER_LEN as u64,
            eof: false,
        })
    }

    /// Read exactly `buf.len()` bytes, distinguishing clean end-of-stream
    /// (no bytes at all) from a truncated record.
    fn read_record(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(
                    ContainerError::InvalidStructure("truncated IVF frame".into()).into()
                );
            }
            filled += n;
        }
        Ok(true)
    }
}

impl<R: Read + Send> Demuxer for IvfDemuxer<R> {
    fn format_name(&self) -> &str {
        "ivf"
    }

    fn num_streams(&self) -> usize {
        1
    }

    fn stream_info(&self, index: usize) -> Option<&StreamInfo> {
        (index == 0).then_some(&self.stream)
    }

    fn read_packet(&mut self) -> Result<Option<Packet<'static>>> {
        if self.eof {
            return Ok(None);
        }

        let mut header = [0u8; IVF_FRAME_HEADER_LEN];
        if !self.read_record(&mut header)? {
            self.eof = true;
            return Ok(None);
        }
        let size = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let pts = i64::from_le_bytes([
            header[4], header[5], header[6], header[7], header[8], header[9], header[10],
            header[11],
        ]);

        let pos = self.offset;
        let mut data = vec![0u8; size];
        if !self.read_record(&mut data)? {
            return Err(ContainerError::InvalidStructure("truncated IVF frame".into()).into());
        }
        self.offset += (IVF_FRAME_HEADER_LEN + size) as u64;

        let tb = self.stream.time_base;
        let mut packet = Packet::new(data)
            // IVF frames are stored in decode order with a single timestamp.
            .with_timestamps(Timestamp::new(pts, tb), Timestamp::new(pts, tb))
            .with_stream_index(0);
        packet.pos = Some(pos);
        Ok(Some(packet))
    }
}

/// IVF muxer over any seekable byte sink.
///
/// The frame count is written as zero in the header and patched when the
/// trailer is written.
pub struct IvfMuxer<W> {
    writer: W,
    stream: Option<StreamInfo>,
    header_written: bool,
    frames_written: u32,
}

impl<W: Write + Seek> IvfMuxer<W> {
    /// Create a muxer writing to the given sink.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            stream: None,
            header_written: false,
            frames_written: 0,
        }
    }
}

impl<W: Write + Seek + Send> Muxer for IvfMuxer<W> {
    fn format_name(&self) -> &str {
        "ivf"
    }

    fn add_stream(&mut self, info: StreamInfo) -> Result<usize> {
        if self.stream.is_some() {
            return Err(
                ContainerError::StreamConfig("IVF carries exactly one stream".into()).into(),
            );
        }
        if info.track_type != TrackType::Video {
            return Err(ContainerError::StreamConfig("IVF requires a video stream".into()).into());
        }
        if info.codec_id.fourcc().is_none() {
            return Err(ContainerError::StreamConfig(format!(
                "codec {} has no FourCC",
                info.codec_id
            ))
            .into());
        }
        let video = info
            .video
            .as_ref()
            .ok_or_else(|| ContainerError::StreamConfig("missing video parameters".into()))?;
        if video.width > u16::MAX as u32 || video.height > u16::MAX as u32 {
            return Err(ContainerError::StreamConfig(format!(
                "dimensions {}x{} exceed the IVF limit",
                video.width, video.height
            ))
            .into());
        }
        let tb = info.time_base.as_rational();
        if tb.num <= 0 || tb.num > u32::MAX as i64 || tb.den > u32::MAX as i64 {
            return Err(ContainerError::StreamConfig(format!(
                "time base {tb} not representable in IVF"
            ))
            .into());
        }

        self.stream = Some(info);
        Ok(0)
    }

    fn stream_time_base(&self, index: usize) -> Option<TimeBase> {
        if index != 0 {
            return None;
        }
        self.stream.as_ref().map(|s| s.time_base)
    }

    fn write_header(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| ContainerError::StreamConfig("no stream declared".into()))?;
        let video = stream
            .video
            .as_ref()
            .ok_or_else(|| ContainerError::StreamConfig("missing video parameters".into()))?;
        let fourcc = stream
            .codec_id
            .fourcc()
            .ok_or_else(|| ContainerError::StreamConfig("codec has no FourCC".into()))?;
        let tb = stream.time_base.as_rational();

        let mut header = [0u8; IVF_HEADER_LEN];
        header[0..4].copy_from_slice(IVF_SIGNATURE);
        header[4..6].copy_from_slice(&0u16.to_le_bytes());
        header[6..8].copy_from_slice(&(IVF_HEADER_LEN as u16).to_le_bytes());
        header[8..12].copy_from_slice(&fourcc);
        header[12..14].copy_from_slice(&(video.width as u16).to_le_bytes());
        header[14..16].copy_from_slice(&(video.height as u16).to_le_bytes());
        header[16..20].copy_from_slice(&(tb.den as u32).to_le_bytes());
        header[20..24].copy_from_slice(&(tb.num as u32).to_le_bytes());
        header[24..28].copy_from_slice(&0u32.to_le_bytes());
        self.writer.write_all(&header)?;
        self.header_written = true;
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet<'_>) -> Result<()> {
        if !self.header_written {
            return Err(ContainerError::WriteFailed("header not written".into()).into());
        }
        if packet.stream_index != 0 {
            return Err(ContainerError::StreamNotFound {
                index: packet.stream_index as usize,
            }
            .into());
        }
        if !packet.pts.is_valid() {
            return Err(ContainerError::WriteFailed("IVF requires a presentation timestamp".into()).into());
        }

        self.writer
            .write_all(&(packet.size() as u32).to_le_bytes())?;
        self.writer.write_all(&packet.pts.value.to_le_bytes())?;
        self.writer.write_all(packet.data())?;
        self.frames_written += 1;
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        if !self.header_written {
            return Err(ContainerError::WriteFailed("header not written".into()).into());
        }
        self.writer.seek(SeekFrom::Start(IVF_FRAME_COUNT_OFFSET))?;
        self.writer.write_all(&self.frames_written.to_le_bytes())?;
        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn raw_stream_info(width: u32, height: u32, tb: TimeBase) -> StreamInfo {
        StreamInfo {
            index: 0,
            track_type: TrackType::Video,
            codec_id: CodecId::RawVideo,
            time_base: tb,
            extra_data: None,
            video: Some(VideoStreamInfo {
                width,
                height,
                pixel_format: Some(PixelFormat::Yuv420p),
                frame_rate: None,
            }),
            audio: None,
        }
    }

    fn mux_frames(frames: &[(i64, Vec<u8>)]) -> Vec<u8> {
        let tb = TimeBase::new(1, 30);
        let mut muxer = IvfMuxer::new(Cursor::new(Vec::new()));
        muxer.add_stream(raw_stream_info(4, 4, tb)).unwrap();
        muxer.write_header().unwrap();
        for (pts, data) in frames {
            let packet = Packet::new(data.clone())
                .with_timestamps(Timestamp::new(*pts, tb), Timestamp::new(*pts, tb));
            muxer.write_packet(&packet).unwrap();
        }
        muxer.write_trailer().unwrap();
        muxer.writer.into_inner()
    }

    #[test]
    fn test_header_layout() {
        let bytes = mux_frames(&[]);
        assert_eq!(&bytes[0..4], b"DKIF");
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 32);
        assert_eq!(&bytes[8..12], b"I420");
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 4);
        // time base 1/30 stored as den=30, num=1
        assert_eq!(
            u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]),
            30
        );
        assert_eq!(
            u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]),
            1
        );
    }

    #[test]
    fn test_trailer_patches_frame_count() {
        let bytes = mux_frames(&[(0, vec![1, 2, 3]), (1, vec![4, 5])]);
        assert_eq!(
            u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            2
        );
    }

    #[test]
    fn test_mux_demux_round_trip() {
        let frames = vec![(0i64, vec![1u8, 2, 3]), (1, vec![4, 5, 6, 7]), (2, vec![8])];
        let bytes = mux_frames(&frames);

        let mut demuxer = IvfDemuxer::new(Cursor::new(bytes)).unwrap();
        assert_eq!(demuxer.num_streams(), 1);
        let info = demuxer.stream_info(0).unwrap();
        assert_eq!(info.codec_id, CodecId::RawVideo);
        assert_eq!(info.time_base, TimeBase::new(1, 30));

        for (pts, data) in &frames {
            let packet = demuxer.read_packet().unwrap().unwrap();
            assert_eq!(packet.data(), data.as_slice());
            assert_eq!(packet.pts.value, *pts);
            assert!(packet.pos.is_some());
        }
        assert!(demuxer.read_packet().unwrap().is_none());
        // Exhausted sequences stay exhausted.
        assert!(demuxer.read_packet().unwrap().is_none());
    }

    #[test]
    fn test_rejects_bad_signature() {
        let err = IvfDemuxer::new(Cursor::new(vec![0u8; 64])).unwrap_err();
        assert!(err.to_string().contains("DKIF"));
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        let mut bytes = mux_frames(&[(0, vec![1, 2, 3, 4, 5, 6])]);
        bytes.truncate(bytes.len() - 2);
        let mut demuxer = IvfDemuxer::new(Cursor::new(bytes)).unwrap();
        assert!(demuxer.read_packet().is_err());
    }

    #[test]
    fn test_second_stream_rejected() {
        let tb = TimeBase::new(1, 30);
        let mut muxer = IvfMuxer::new(Cursor::new(Vec::new()));
        muxer.add_stream(raw_stream_info(4, 4, tb)).unwrap();
        assert!(muxer.add_stream(raw_stream_info(4, 4, tb)).is_err());
    }
}
