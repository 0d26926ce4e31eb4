//! Codec layer for the recast library.
//!
//! Decoders and encoders implement the traits in [`traits`] and are looked
//! up through the process-wide [`registry`]. The only built-in codec is
//! [`rawvideo`], which moves uncompressed planar pixels between packets
//! and frames.

pub mod rawvideo;
pub mod registry;
pub mod traits;

pub use rawvideo::{RawVideoDecoder, RawVideoEncoder};
pub use registry::{open_decoder, open_encoder, register_decoder, register_encoder};
pub use traits::{CodecInfo, DecoderConfig, EncoderConfig, VideoDecoder, VideoEncoder};
