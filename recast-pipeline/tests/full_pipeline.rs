//! End-to-end pipeline tests over mock containers and codecs.

use parking_lot::Mutex;
use recast_codecs::{CodecInfo, EncoderConfig, VideoDecoder, VideoEncoder};
use recast_containers::{Demuxer, Muxer, StreamInfo, VideoStreamInfo};
use recast_core::error::{CodecError, Result as CoreResult};
use recast_core::format::{CodecId, TrackType};
use recast_core::frame::{Frame, PixelFormat};
use recast_core::packet::{OwnedPacket, Packet};
use recast_core::timestamp::{TimeBase, Timestamp};
use recast_pipeline::{Driver, PipelineError};
use std::collections::VecDeque;
use std::sync::Arc;

fn video_stream(index: usize, codec: CodecId, tb: TimeBase, format: PixelFormat) -> StreamInfo {
    StreamInfo {
        index,
        track_type: TrackType::Video,
        codec_id: codec,
        time_base: tb,
        extra_data: None,
        video: Some(VideoStreamInfo {
            width: 4,
            height: 4,
            pixel_format: Some(format),
            frame_rate: None,
        }),
        audio: None,
    }
}

fn audio_stream(index: usize, tb: TimeBase) -> StreamInfo {
    StreamInfo {
        index,
        track_type: TrackType::Audio,
        codec_id: CodecId::Unknown("pcm".into()),
        time_base: tb,
        extra_data: None,
        video: None,
        audio: None,
    }
}

struct MockDemuxer {
    streams: Vec<StreamInfo>,
    packets: VecDeque<OwnedPacket>,
}

impl MockDemuxer {
    fn new(streams: Vec<StreamInfo>, packets: Vec<OwnedPacket>) -> Self {
        Self {
            streams,
            packets: packets.into(),
        }
    }
}

impl Demuxer for MockDemuxer {
    fn format_name(&self) -> &str {
        "mock"
    }

    fn num_streams(&self) -> usize {
        self.streams.len()
    }

    fn stream_info(&self, index: usize) -> Option<&StreamInfo> {
        self.streams.get(index)
    }

    fn read_packet(&mut self) -> CoreResult<Option<Packet<'static>>> {
        Ok(self.packets.pop_front())
    }
}

#[derive(Default)]
struct Recording {
    streams: Vec<StreamInfo>,
    header_written: bool,
    trailer_written: bool,
    packets: Vec<OwnedPacket>,
}

struct MockMuxer {
    recording: Arc<Mutex<Recording>>,
    time_base: TimeBase,
}

impl MockMuxer {
    fn new(time_base: TimeBase) -> (Self, Arc<Mutex<Recording>>) {
        let recording = Arc::new(Mutex::new(Recording::default()));
        (
            Self {
                recording: Arc::clone(&recording),
                time_base,
            },
            recording,
        )
    }
}

impl Muxer for MockMuxer {
    fn format_name(&self) -> &str {
        "mock"
    }

    fn add_stream(&mut self, info: StreamInfo) -> CoreResult<usize> {
        let mut rec = self.recording.lock();
        rec.streams.push(info);
        Ok(rec.streams.len() - 1)
    }

    fn stream_time_base(&self, index: usize) -> Option<TimeBase> {
        let rec = self.recording.lock();
        (index < rec.streams.len()).then_some(self.time_base)
    }

    fn write_header(&mut self) -> CoreResult<()> {
        self.recording.lock().header_written = true;
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet<'_>) -> CoreResult<()> {
        self.recording.lock().packets.push(packet.clone().into_owned());
        Ok(())
    }

    fn write_trailer(&mut self) -> CoreResult<()> {
        self.recording.lock().trailer_written = true;
        Ok(())
    }
}

/// Decoder that holds back `delay` packets, emitting one frame per packet.
struct BufferingDecoder {
    delay: usize,
    held: VecDeque<Timestamp>,
    time_base: TimeBase,
    fail_on: Option<usize>,
    seen: usize,
}

impl BufferingDecoder {
    fn new(delay: usize, time_base: TimeBase) -> Self {
        Self {
            delay,
            held: VecDeque::new(),
            time_base,
            fail_on: None,
            seen: 0,
        }
    }

    fn failing_on(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    fn emit(&mut self, pts: Timestamp) -> Frame {
        let mut frame = Frame::new(4, 4, PixelFormat::Yuv420p, self.time_base);
        frame.pts = pts;
        frame
    }
}

impl VideoDecoder for BufferingDecoder {
    fn codec_info(&self) -> CodecInfo {
        CodecInfo {
            name: "mock",
            long_name: "Buffering mock decoder",
            can_encode: false,
            can_decode: true,
        }
    }

    fn decode(&mut self, packet: &Packet<'_>) -> CoreResult<Vec<Frame>> {
        self.seen += 1;
        if self.fail_on == Some(self.seen) {
            return Err(CodecError::CorruptData("mock failure".into()).into());
        }
        self.held.push_back(packet.pts);
        if self.held.len() > self.delay {
            let pts = self.held.pop_front().unwrap();
            Ok(vec![self.emit(pts)])
        } else {
            Ok(Vec::new())
        }
    }

    fn flush(&mut self) -> CoreResult<Vec<Frame>> {
        let held: Vec<_> = self.held.drain(..).collect();
        Ok(held.into_iter().map(|pts| self.emit(pts)).collect())
    }
}

/// Encoder that holds back `delay` frames, emitting one packet per frame.
struct BufferingEncoder {
    delay: usize,
    held: VecDeque<Timestamp>,
}

impl BufferingEncoder {
    fn new(delay: usize) -> Self {
        Self {
            delay,
            held: VecDeque::new(),
        }
    }
}

fn packet_for(pts: Timestamp) -> Packet<'static> {
    Packet::new(vec![0xAB]).with_timestamps(pts, pts)
}

impl VideoEncoder for BufferingEncoder {
    fn codec_info(&self) -> CodecInfo {
        CodecInfo {
            name: "mock",
            long_name: "Buffering mock encoder",
            can_encode: true,
            can_decode: false,
        }
    }

    fn encode(&mut self, frame: &Frame) -> CoreResult<Vec<Packet<'static>>> {
        self.held.push_back(frame.pts);
        if self.held.len() > self.delay {
            Ok(vec![packet_for(self.held.pop_front().unwrap())])
        } else {
            Ok(Vec::new())
        }
    }

    fn flush(&mut self) -> CoreResult<Vec<Packet<'static>>> {
        Ok(self.held.drain(..).map(packet_for).collect())
    }

    fn extra_data(&self) -> Option<&[u8]> {
        None
    }
}

fn raw_packet(pts: i64, tb: TimeBase, data: Vec<u8>) -> OwnedPacket {
    Packet::new(data).with_timestamps(Timestamp::new(pts, tb), Timestamp::new(pts, tb))
}

#[test]
fn test_remux_copies_packets() {
    let tb = TimeBase::new(1, 90000);
    let packets: Vec<_> = (0..4)
        .map(|i| {
            let mut p = raw_packet(i * 3000, tb, vec![i as u8; 8]);
            p.pos = Some(i as u64 * 100);
            p
        })
        .collect();
    let demuxer = MockDemuxer::new(
        vec![video_stream(0, CodecId::H264, tb, PixelFormat::Yuv420p)],
        packets,
    );
    let (muxer, recording) = MockMuxer::new(tb);

    let stats = Driver::new(Box::new(demuxer), Box::new(muxer))
        .remux()
        .unwrap();

    assert_eq!(stats.packets_read, 4);
    assert_eq!(stats.packets_written, 4);
    let rec = recording.lock();
    assert!(rec.header_written);
    assert!(rec.trailer_written);
    assert_eq!(rec.packets.len(), 4);
    for (i, p) in rec.packets.iter().enumerate() {
        assert_eq!(p.data(), &vec![i as u8; 8][..]);
        // Timestamps survive a same-base rescale; byte positions do not.
        assert_eq!(p.pts.value, i as i64 * 3000);
        assert_eq!(p.pos, None);
    }
}

#[test]
fn test_remux_rescales_to_output_time_base() {
    let in_tb = TimeBase::new(1, 90000);
    let out_tb = TimeBase::new(1, 1000);
    let demuxer = MockDemuxer::new(
        vec![video_stream(0, CodecId::H264, in_tb, PixelFormat::Yuv420p)],
        vec![raw_packet(3000, in_tb, vec![1]), raw_packet(4500, in_tb, vec![2])],
    );
    let (muxer, recording) = MockMuxer::new(out_tb);

    Driver::new(Box::new(demuxer), Box::new(muxer))
        .remux()
        .unwrap();

    let rec = recording.lock();
    assert_eq!(rec.packets[0].pts.value, 33);
    assert_eq!(rec.packets[0].pts.time_base, out_tb);
    assert_eq!(rec.packets[1].pts.value, 50);
}

#[test]
fn test_remux_forwards_every_stream() {
    let tb = TimeBase::new(1, 1000);
    let mut audio = raw_packet(0, tb, vec![9]);
    audio.stream_index = 0;
    let mut video = raw_packet(10, tb, vec![7]);
    video.stream_index = 1;
    let demuxer = MockDemuxer::new(
        vec![
            audio_stream(0, tb),
            video_stream(1, CodecId::H264, tb, PixelFormat::Yuv420p),
        ],
        vec![audio, video],
    );
    let (muxer, recording) = MockMuxer::new(tb);

    let stats = Driver::new(Box::new(demuxer), Box::new(muxer))
        .remux()
        .unwrap();

    assert_eq!(stats.packets_read, 2);
    assert_eq!(stats.packets_written, 2);
    let rec = recording.lock();
    // Output declares the same streams in the same order with the same
    // codec identities.
    assert_eq!(rec.streams.len(), 2);
    assert_eq!(rec.streams[0].track_type, TrackType::Audio);
    assert_eq!(rec.streams[1].codec_id, CodecId::H264);
    assert_eq!(rec.packets[0].data(), &[9][..]);
    assert_eq!(rec.packets[0].stream_index, 0);
    assert_eq!(rec.packets[1].data(), &[7][..]);
    assert_eq!(rec.packets[1].stream_index, 1);
}

#[test]
fn test_transcode_without_video_stream_writes_nothing() {
    let tb = TimeBase::new(1, 1000);
    let demuxer = MockDemuxer::new(vec![audio_stream(0, tb)], vec![]);
    let (muxer, recording) = MockMuxer::new(tb);

    let err = Driver::new(Box::new(demuxer), Box::new(muxer))
        .transcode(EncoderConfig::new(
            CodecId::RawVideo,
            4,
            4,
            PixelFormat::Yuv420p,
        ))
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::NoMatchingStream(TrackType::Video)
    ));
    let rec = recording.lock();
    assert!(!rec.header_written);
    assert!(rec.packets.is_empty());
}

#[test]
fn test_transcode_synthesizes_monotonic_pts() {
    let in_tb = TimeBase::new(1, 90000);
    let enc_tb = TimeBase::new(1, 30);
    // Input timestamps are deliberately irregular.
    let packets: Vec<_> = [700, 95, 3000, 2, 40000]
        .iter()
        .map(|&pts| raw_packet(pts, in_tb, vec![1]))
        .collect();
    let demuxer = MockDemuxer::new(
        vec![video_stream(0, CodecId::H264, in_tb, PixelFormat::Yuv420p)],
        packets,
    );
    let (muxer, recording) = MockMuxer::new(enc_tb);

    let config = EncoderConfig::new(CodecId::H264, 4, 4, PixelFormat::Yuv420p)
        .with_time_base(enc_tb);
    let stats = Driver::new(Box::new(demuxer), Box::new(muxer))
        .transcode_with(
            Box::new(BufferingDecoder::new(2, in_tb)),
            Box::new(BufferingEncoder::new(1)),
            config,
        )
        .unwrap();

    assert_eq!(stats.frames_decoded, 5);
    assert_eq!(stats.frames_encoded, 5);
    assert_eq!(stats.packets_written, 5);
    let rec = recording.lock();
    assert!(rec.trailer_written);
    for (i, p) in rec.packets.iter().enumerate() {
        assert_eq!(p.pts.value, i as i64);
        assert_eq!(p.pts.time_base, enc_tb);
    }
}

#[test]
fn test_transcode_drains_buffered_frames_at_eos() {
    let tb = TimeBase::new(1, 30);
    let packets: Vec<_> = (0..3).map(|i| raw_packet(i, tb, vec![1])).collect();
    let demuxer = MockDemuxer::new(
        vec![video_stream(0, CodecId::H264, tb, PixelFormat::Yuv420p)],
        packets,
    );
    let (muxer, recording) = MockMuxer::new(tb);

    // Delays exceed the input length, so everything comes out in the drain.
    let stats = Driver::new(Box::new(demuxer), Box::new(muxer))
        .transcode_with(
            Box::new(BufferingDecoder::new(5, tb)),
            Box::new(BufferingEncoder::new(5)),
            EncoderConfig::new(CodecId::H264, 4, 4, PixelFormat::Yuv420p).with_time_base(tb),
        )
        .unwrap();

    assert_eq!(stats.packets_written, 3);
    assert!(recording.lock().trailer_written);
}

#[test]
fn test_decoder_error_aborts_run() {
    let tb = TimeBase::new(1, 30);
    let packets: Vec<_> = (0..5).map(|i| raw_packet(i, tb, vec![1])).collect();
    let demuxer = MockDemuxer::new(
        vec![video_stream(0, CodecId::H264, tb, PixelFormat::Yuv420p)],
        packets,
    );
    let (muxer, recording) = MockMuxer::new(tb);

    let err = Driver::new(Box::new(demuxer), Box::new(muxer))
        .transcode_with(
            Box::new(BufferingDecoder::new(0, tb).failing_on(3)),
            Box::new(BufferingEncoder::new(0)),
            EncoderConfig::new(CodecId::H264, 4, 4, PixelFormat::Yuv420p).with_time_base(tb),
        )
        .unwrap_err();

    assert!(matches!(err, PipelineError::Core(_)));
    let rec = recording.lock();
    // The failure is mid-run: the header is out, the trailer never is.
    assert!(rec.header_written);
    assert!(!rec.trailer_written);
    assert_eq!(rec.packets.len(), 2);
}

#[test]
fn test_transcode_rawvideo_through_registry() {
    let tb = TimeBase::new(1, 30);
    let frame_size = PixelFormat::Yuv420p.frame_size(4, 4);
    let payloads: Vec<Vec<u8>> = (0..3).map(|i| vec![i as u8 + 1; frame_size]).collect();
    let packets: Vec<_> = payloads
        .iter()
        .enumerate()
        .map(|(i, data)| raw_packet(i as i64 * 100, tb, data.clone()))
        .collect();
    let demuxer = MockDemuxer::new(
        vec![video_stream(0, CodecId::RawVideo, tb, PixelFormat::Yuv420p)],
        packets,
    );
    let (muxer, recording) = MockMuxer::new(tb);

    let config = EncoderConfig::new(CodecId::RawVideo, 4, 4, PixelFormat::Yuv420p)
        .with_time_base(tb);
    let stats = Driver::new(Box::new(demuxer), Box::new(muxer))
        .transcode(config)
        .unwrap();

    assert_eq!(stats.frames_decoded, 3);
    assert_eq!(stats.packets_written, 3);
    let rec = recording.lock();
    for (i, p) in rec.packets.iter().enumerate() {
        // Pixels survive the decode/encode round trip; timing is synthesized.
        assert_eq!(p.data(), payloads[i].as_slice());
        assert_eq!(p.pts.value, i as i64);
    }
}

#[test]
fn test_transcode_converts_mismatched_layout() {
    let tb = TimeBase::new(1, 30);
    let gray_size = PixelFormat::Gray8.frame_size(4, 4);
    let packets: Vec<_> = (0..2)
        .map(|i| raw_packet(i, tb, vec![100 + i as u8; gray_size]))
        .collect();
    let demuxer = MockDemuxer::new(
        vec![video_stream(0, CodecId::RawVideo, tb, PixelFormat::Gray8)],
        packets,
    );
    let (muxer, recording) = MockMuxer::new(tb);

    let config = EncoderConfig::new(CodecId::RawVideo, 4, 4, PixelFormat::Yuv420p)
        .with_time_base(tb);
    let stats = Driver::new(Box::new(demuxer), Box::new(muxer))
        .transcode(config)
        .unwrap();

    assert_eq!(stats.packets_written, 2);
    let rec = recording.lock();
    let yuv_size = PixelFormat::Yuv420p.frame_size(4, 4);
    for p in &rec.packets {
        assert_eq!(p.size(), yuv_size);
        // Luma carried over, chroma neutral.
        assert_eq!(p.data()[0], 100);
        assert_eq!(p.data()[16], 128);
    }
    assert_eq!(rec.packets[0].data()[0], 100);
    assert_eq!(rec.packets[1].data()[0], 101);
}
