//! Transform boxes.
//!
//! A [`TransformBox`] wraps a codec behind a uniform submit/receive/finish
//! surface. Inputs go in through [`TransformBox::submit`], outputs come out
//! through [`TransformBox::receive`], and [`TransformBox::finish`] signals
//! end of input so buffered items can drain. The box enforces the lifecycle:
//! submitting after finish is an error, and once drained the box stays at
//! end of stream.

use crate::error::{PipelineError, Result};
use recast_codecs::{VideoDecoder, VideoEncoder};
use recast_core::frame::Frame;
use recast_core::packet::Packet;
use std::collections::VecDeque;

/// A stage that turns inputs into zero or more outputs, with buffered
/// items released by `flush` at end of input.
pub trait Transform<I, O>: Send {
    /// Process one input item.
    fn push(&mut self, input: &I) -> Result<Vec<O>>;

    /// Drain whatever the stage still holds.
    fn flush(&mut self) -> Result<Vec<O>>;
}

/// Lifecycle of a transform box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxState {
    /// Accepting input.
    Open,
    /// Input finished, queued output remains.
    Draining,
    /// Fully drained.
    Closed,
}

/// Result of polling a transform box for output.
#[derive(Debug)]
pub enum Recv<O> {
    /// An output item.
    Item(O),
    /// Nothing queued yet; submit more input.
    Pending,
    /// The box is finished and drained.
    Eos,
}

/// A codec stage with explicit submit/receive/finish lifecycle.
pub struct TransformBox<I, O> {
    inner: Box<dyn Transform<I, O>>,
    queue: VecDeque<O>,
    state: BoxState,
}

/// Box around a decoder: packets in, frames out.
pub type DecoderBox = TransformBox<Packet<'static>, Frame>;

/// Box around an encoder: frames in, packets out.
pub type EncoderBox = TransformBox<Frame, Packet<'static>>;

impl<I, O> TransformBox<I, O> {
    /// Wrap a transform stage.
    pub fn new(inner: Box<dyn Transform<I, O>>) -> Self {
        Self {
            inner,
            queue: VecDeque::new(),
            state: BoxState::Open,
        }
    }

    /// Submit one input item.
    pub fn submit(&mut self, input: &I) -> Result<()> {
        if self.state != BoxState::Open {
            return Err(PipelineError::SubmitAfterFinish);
        }
        let outputs = self.inner.push(input)?;
        self.queue.extend(outputs);
        Ok(())
    }

    /// Signal end of input and drain the stage's internal buffers.
    ///
    /// Calling finish more than once is harmless.
    pub fn finish(&mut self) -> Result<()> {
        if self.state == BoxState::Open {
            let outputs = self.inner.flush()?;
            self.queue.extend(outputs);
            self.state = BoxState::Draining;
        }
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BoxState {
        self.state
    }

    /// Take the next queued output item.
    ///
    /// Infallible: the inner transform only runs during `submit` and
    /// `finish`, so this merely pops the output queue.
    pub fn receive(&mut self) -> Recv<O> {
        if let Some(item) = self.queue.pop_front() {
            return Recv::Item(item);
        }
        match self.state {
            BoxState::Open => Recv::Pending,
            BoxState::Draining => {
                self.state = BoxState::Closed;
                Recv::Eos
            }
            BoxState::Closed => Recv::Eos,
        }
    }
}

/// Adapts a [`VideoDecoder`] to the transform interface.
pub struct DecodeAdapter {
    decoder: Box<dyn VideoDecoder>,
}

impl DecodeAdapter {
    pub fn new(decoder: Box<dyn VideoDecoder>) -> Self {
        Self { decoder }
    }

    /// Wrap a decoder in a ready-to-use box.
    pub fn boxed(decoder: Box<dyn VideoDecoder>) -> DecoderBox {
        TransformBox::new(Box::new(Self::new(decoder)))
    }
}

impl Transform<Packet<'static>, Frame> for DecodeAdapter {
    fn push(&mut self, input: &Packet<'static>) -> Result<Vec<Frame>> {
        Ok(self.decoder.decode(input)?)
    }

    fn flush(&mut self) -> Result<Vec<Frame>> {
        Ok(self.decoder.flush()?)
    }
}

/// Adapts a [`VideoEncoder`] to the transform interface.
pub struct EncodeAdapter {
    encoder: Box<dyn VideoEncoder>,
}

impl EncodeAdapter {
    pub fn new(encoder: Box<dyn VideoEncoder>) -> Self {
        Self { encoder }
    }

    /// Wrap an encoder in a ready-to-use box.
    pub fn boxed(encoder: Box<dyn VideoEncoder>) -> EncoderBox {
        TransformBox::new(Box::new(Self::new(encoder)))
    }
}

impl Transform<Frame, Packet<'static>> for EncodeAdapter {
    fn push(&mut self, input: &Frame) -> Result<Vec<Packet<'static>>> {
        Ok(self.encoder.encode(input)?)
    }

    fn flush(&mut self) -> Result<Vec<Packet<'static>>> {
        Ok(self.encoder.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Holds back the last `delay` items until flush.
    struct DelayLine {
        delay: usize,
        held: VecDeque<u32>,
    }

    impl Transform<u32, u32> for DelayLine {
        fn push(&mut self, input: &u32) -> Result<Vec<u32>> {
            self.held.push_back(*input);
            if self.held.len() > self.delay {
                Ok(vec![self.held.pop_front().unwrap()])
            } else {
                Ok(Vec::new())
            }
        }

        fn flush(&mut self) -> Result<Vec<u32>> {
            Ok(self.held.drain(..).collect())
        }
    }

    fn delay_box(delay: usize) -> TransformBox<u32, u32> {
        TransformBox::new(Box::new(DelayLine {
            delay,
            held: VecDeque::new(),
        }))
    }

    #[test]
    fn test_pending_until_delay_filled() {
        let mut tb = delay_box(2);
        tb.submit(&1).unwrap();
        assert!(matches!(tb.receive(), Recv::Pending));
        tb.submit(&2).unwrap();
        tb.submit(&3).unwrap();
        assert!(matches!(tb.receive(), Recv::Item(1)));
        assert!(matches!(tb.receive(), Recv::Pending));
    }

    #[test]
    fn test_finish_drains_everything_in_order() {
        let mut tb = delay_box(3);
        for v in 1..=3 {
            tb.submit(&v).unwrap();
        }
        tb.finish().unwrap();
        for expect in 1..=3 {
            match tb.receive() {
                Recv::Item(v) => assert_eq!(v, expect),
                other => panic!("expected item, got {other:?}"),
            }
        }
        assert!(matches!(tb.receive(), Recv::Eos));
        // Eos is sticky.
        assert!(matches!(tb.receive(), Recv::Eos));
    }

    #[test]
    fn test_submit_after_finish_rejected() {
        let mut tb = delay_box(0);
        tb.finish().unwrap();
        assert!(matches!(
            tb.submit(&1),
            Err(PipelineError::SubmitAfterFinish)
        ));
    }

    #[test]
    fn test_double_finish_is_harmless() {
        let mut tb = delay_box(1);
        tb.submit(&9).unwrap();
        tb.finish().unwrap();
        tb.finish().unwrap();
        assert!(matches!(tb.receive(), Recv::Item(9)));
        assert!(matches!(tb.receive(), Recv::Eos));
    }
}
