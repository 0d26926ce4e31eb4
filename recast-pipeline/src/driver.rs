//! Pipeline driver.
//!
//! [`Driver`] owns one demuxer and one muxer and runs a single stream end
//! to end, either copying packets ([`Driver::remux`]) or decoding,
//! converting, and re-encoding them ([`Driver::transcode`]). Every error is
//! fatal: the driver stops at the first failure, tears down in reverse
//! acquisition order, and reports the error to the caller.

use crate::convert::FrameConverter;
use crate::error::{PipelineError, Result};
use crate::select::select_stream;
use crate::transform::{DecodeAdapter, DecoderBox, EncodeAdapter, EncoderBox, Recv};
use recast_codecs::{open_decoder, open_encoder, DecoderConfig, EncoderConfig, VideoDecoder, VideoEncoder};
use recast_containers::{Demuxer, Muxer, StreamInfo, VideoStreamInfo};
use recast_core::format::TrackType;
use recast_core::frame::{Frame, FrameLayout};
use recast_core::timestamp::{Duration, TimeBase, Timestamp};
use tracing::{debug, info, trace, warn};

/// Counters reported on completion and to progress callbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    /// Packets read from the demuxer, across all streams.
    pub packets_read: u64,
    /// Packets written to the muxer.
    pub packets_written: u64,
    /// Frames produced by the decoder.
    pub frames_decoded: u64,
    /// Frames handed to the encoder.
    pub frames_encoded: u64,
}

/// Callback invoked periodically with the running counters.
pub type ProgressCallback = Box<dyn Fn(&RunStats) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Init,
    StreamsMapped,
    BoxesOpen,
    HeaderWritten,
    Running,
    Draining,
    TrailerWritten,
    Closed,
    Failed,
}

/// Runs one stream from a demuxer to a muxer.
pub struct Driver {
    demuxer: Box<dyn Demuxer>,
    muxer: Box<dyn Muxer>,
    decoder: Option<DecoderBox>,
    encoder: Option<EncoderBox>,
    converter: Option<FrameConverter>,
    scratch: Option<Frame>,
    state: DriverState,
    stats: RunStats,
    progress: Option<ProgressCallback>,
    progress_interval: u64,
    in_index: usize,
    out_index: usize,
    out_time_base: TimeBase,
    enc_time_base: TimeBase,
    enc_layout: Option<FrameLayout>,
    next_pts: i64,
}

impl Driver {
    /// Create a driver over an open input and output.
    pub fn new(demuxer: Box<dyn Demuxer>, muxer: Box<dyn Muxer>) -> Self {
        Self {
            demuxer,
            muxer,
            decoder: None,
            encoder: None,
            converter: None,
            scratch: None,
            state: DriverState::Init,
            stats: RunStats::default(),
            progress: None,
            progress_interval: 30,
            in_index: 0,
            out_index: 0,
            out_time_base: TimeBase::default(),
            enc_time_base: TimeBase::default(),
            enc_layout: None,
            next_pts: 0,
        }
    }

    /// Install a progress callback.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Invoke the progress callback every `interval` written packets.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Copy the first video stream to the output without re-encoding.
    pub fn remux(mut self) -> Result<RunStats> {
        match self.run_remux() {
            Ok(()) => {
                self.shutdown();
                Ok(self.stats)
            }
            Err(e) => {
                self.state = DriverState::Failed;
                self.shutdown();
                Err(e)
            }
        }
    }

    /// Decode, convert, and re-encode the first video stream, with codecs
    /// taken from the registry.
    pub fn transcode(mut self, config: EncoderConfig) -> Result<RunStats> {
        let result = (|| {
            let info = self.map_input_stream()?;
            let video = info
                .video
                .clone()
                .ok_or_else(|| PipelineError::InvalidConfig("selected stream has no video parameters".into()))?;
            let mut decoder_config = DecoderConfig::new(info.codec_id.clone(), video.width, video.height)
                .with_time_base(info.time_base);
            if let Some(format) = video.pixel_format {
                decoder_config = decoder_config.with_pixel_format(format);
            }
            if let Some(extra) = info.extra_data.clone() {
                decoder_config = decoder_config.with_extra_data(extra);
            }
            let decoder = open_decoder(&decoder_config)?;
            let encoder = open_encoder(&config)?;
            self.run_transcode(decoder, encoder, config)
        })();
        self.finish_run(result)
    }

    /// Like [`Driver::transcode`] but with caller-supplied codecs.
    pub fn transcode_with(
        mut self,
        decoder: Box<dyn VideoDecoder>,
        encoder: Box<dyn VideoEncoder>,
        config: EncoderConfig,
    ) -> Result<RunStats> {
        let result = (|| {
            self.map_input_stream()?;
            self.run_transcode(decoder, encoder, config)
        })();
        self.finish_run(result)
    }

    fn finish_run(mut self, result: Result<()>) -> Result<RunStats> {
        match result {
            Ok(()) => {
                self.shutdown();
                Ok(self.stats)
            }
            Err(e) => {
                self.state = DriverState::Failed;
                self.shutdown();
                Err(e)
            }
        }
    }

    /// Tear down in reverse acquisition order. Runs on success and failure.
    fn shutdown(&mut self) {
        self.muxer.close();
        self.encoder = None;
        self.decoder = None;
        self.demuxer.close();
        if self.state != DriverState::Failed {
            self.state = DriverState::Closed;
        }
        debug!(state = ?self.state, "pipeline shut down");
    }

    fn require_init(&self) -> Result<()> {
        if self.state != DriverState::Init {
            return Err(PipelineError::InvalidState("driver already started"));
        }
        Ok(())
    }

    /// Select the input video stream. Used by the transcode paths; the
    /// output stream is declared separately from the encoder configuration.
    fn map_input_stream(&mut self) -> Result<StreamInfo> {
        self.require_init()?;
        let index = select_stream(self.demuxer.as_ref(), TrackType::Video)?;
        let info = self
            .demuxer
            .stream_info(index)
            .ok_or(PipelineError::StreamNotFound(index))?
            .clone();
        self.in_index = index;
        self.state = DriverState::StreamsMapped;
        Ok(info)
    }

    fn run_remux(&mut self) -> Result<()> {
        self.require_init()?;

        // Remux carries every stream: the mapping is 1:1 and in input
        // declaration order.
        let num_streams = self.demuxer.num_streams();
        let mut mapping = Vec::with_capacity(num_streams);
        for index in 0..num_streams {
            let info = self
                .demuxer
                .stream_info(index)
                .ok_or(PipelineError::StreamNotFound(index))?
                .clone();
            let out_index = self.muxer.add_stream(info)?;
            let time_base = self
                .muxer
                .stream_time_base(out_index)
                .ok_or(PipelineError::StreamNotFound(out_index))?;
            mapping.push((out_index, time_base));
        }
        self.state = DriverState::StreamsMapped;

        self.muxer.write_header()?;
        self.state = DriverState::Running;
        info!(streams = num_streams, "remux started");

        while let Some(mut packet) = self.demuxer.read_packet()? {
            self.stats.packets_read += 1;
            let (out_index, time_base) = *mapping
                .get(packet.stream_index as usize)
                .ok_or(PipelineError::StreamNotFound(packet.stream_index as usize))?;
            packet.stream_index = out_index as u32;
            packet.rescale(time_base);
            self.muxer.write_packet(&packet)?;
            self.stats.packets_written += 1;
            self.tick_progress();
        }

        self.state = DriverState::Draining;
        self.muxer.write_trailer()?;
        self.state = DriverState::TrailerWritten;
        info!(
            packets = self.stats.packets_written,
            "remux finished"
        );
        Ok(())
    }

    fn run_transcode(
        &mut self,
        decoder: Box<dyn VideoDecoder>,
        encoder: Box<dyn VideoEncoder>,
        config: EncoderConfig,
    ) -> Result<()> {
        if self.state != DriverState::StreamsMapped {
            return Err(PipelineError::InvalidState("input stream not mapped"));
        }

        // The output stream is described by the encoder configuration, with
        // codec configuration bytes pulled from the encoder before boxing.
        let out_info = StreamInfo {
            index: 0,
            track_type: TrackType::Video,
            codec_id: config.codec.clone(),
            time_base: config.time_base,
            extra_data: encoder.extra_data().map(|d| d.to_vec()),
            video: Some(VideoStreamInfo {
                width: config.width,
                height: config.height,
                pixel_format: Some(config.pixel_format),
                frame_rate: Some(config.frame_rate),
            }),
            audio: None,
        };
        let out_index = self.muxer.add_stream(out_info)?;
        self.out_index = out_index;
        self.out_time_base = self
            .muxer
            .stream_time_base(out_index)
            .ok_or(PipelineError::StreamNotFound(out_index))?;
        self.enc_time_base = config.time_base;
        self.enc_layout = Some(FrameLayout {
            width: config.width,
            height: config.height,
            format: config.pixel_format,
        });

        self.decoder = Some(DecodeAdapter::boxed(decoder));
        self.encoder = Some(EncodeAdapter::boxed(encoder));
        self.state = DriverState::BoxesOpen;

        self.muxer.write_header()?;
        self.state = DriverState::HeaderWritten;
        self.state = DriverState::Running;
        info!(stream = self.in_index, codec = %config.codec, "transcode started");

        while let Some(packet) = self.demuxer.read_packet()? {
            self.stats.packets_read += 1;
            if packet.stream_index as usize != self.in_index {
                trace!(stream = packet.stream_index, "skipping unselected stream");
                continue;
            }
            if let Some(decoder) = self.decoder.as_mut() {
                decoder.submit(&packet)?;
            }
            self.pump_decoder()?;
        }

        // End of input. Drain the decoder fully, then the encoder.
        self.state = DriverState::Draining;
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.finish()?;
        }
        self.pump_decoder()?;
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.finish()?;
        }
        self.pump_encoder()?;

        self.muxer.write_trailer()?;
        self.state = DriverState::TrailerWritten;
        info!(
            frames = self.stats.frames_encoded,
            packets = self.stats.packets_written,
            "transcode finished"
        );
        Ok(())
    }

    /// Drain all frames the decoder currently has queued.
    fn pump_decoder(&mut self) -> Result<()> {
        loop {
            let recv = match self.decoder.as_mut() {
                Some(decoder) => decoder.receive(),
                None => return Ok(()),
            };
            match recv {
                Recv::Item(frame) => {
                    self.stats.frames_decoded += 1;
                    self.handle_frame(frame)?;
                }
                Recv::Pending | Recv::Eos => return Ok(()),
            }
        }
    }

    /// Convert one decoded frame if needed, stamp it, and feed the encoder.
    fn handle_frame(&mut self, frame: Frame) -> Result<()> {
        let enc_layout = self
            .enc_layout
            .ok_or(PipelineError::InvalidState("encoder layout not set"))?;

        let mut out;
        let converted = frame.layout() != enc_layout;
        if converted {
            // Built once for the first mismatched frame, reused after.
            let converter = match self.converter.take() {
                Some(c) => c,
                None => {
                    warn!(
                        from = %frame.format(),
                        to = %enc_layout.format,
                        "frame layout differs from encoder, converting"
                    );
                    FrameConverter::new(frame.layout(), enc_layout)?
                }
            };
            let mut scratch = self.scratch.take().unwrap_or_else(|| {
                Frame::new(
                    enc_layout.width,
                    enc_layout.height,
                    enc_layout.format,
                    self.enc_time_base,
                )
            });
            converter.convert_into(&frame, &mut scratch)?;
            self.converter = Some(converter);
            out = scratch;
        } else {
            out = frame;
        }

        // Output timing is synthesized in the encoder time base, one tick
        // per frame, regardless of input timestamps.
        out.pts = Timestamp::new(self.next_pts, self.enc_time_base);
        out.duration = Duration::new(1, self.enc_time_base);
        self.next_pts += 1;

        if let Some(encoder) = self.encoder.as_mut() {
            encoder.submit(&out)?;
        }
        self.stats.frames_encoded += 1;
        if converted {
            self.scratch = Some(out);
        }
        self.pump_encoder()
    }

    /// Drain all packets the encoder currently has queued.
    fn pump_encoder(&mut self) -> Result<()> {
        loop {
            let recv = match self.encoder.as_mut() {
                Some(encoder) => encoder.receive(),
                None => return Ok(()),
            };
            match recv {
                Recv::Item(mut packet) => {
                    packet.stream_index = self.out_index as u32;
                    packet.rescale(self.out_time_base);
                    self.muxer.write_packet(&packet)?;
                    self.stats.packets_written += 1;
                    self.tick_progress();
                }
                Recv::Pending | Recv::Eos => return Ok(()),
            }
        }
    }

    fn tick_progress(&self) {
        if let Some(progress) = &self.progress {
            if self.stats.packets_written % self.progress_interval == 0 {
                progress(&self.stats);
            }
        }
    }
}
