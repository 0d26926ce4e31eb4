//! Process-wide codec registry.
//!
//! Maps [`CodecId`] values to decoder and encoder factories. The built-in
//! rawvideo codec is registered on first use; additional codecs can be
//! registered at runtime with [`register_decoder`] and [`register_encoder`].

use crate::rawvideo::{RawVideoDecoder, RawVideoEncoder};
use crate::traits::{DecoderConfig, EncoderConfig, VideoDecoder, VideoEncoder};
use parking_lot::RwLock;
use recast_core::error::{CodecError, Result};
use recast_core::format::CodecId;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Factory producing a decoder from a stream description.
pub type DecoderFactory = Box<dyn Fn(&DecoderConfig) -> Result<Box<dyn VideoDecoder>> + Send + Sync>;

/// Factory producing an encoder from an output description.
pub type EncoderFactory = Box<dyn Fn(&EncoderConfig) -> Result<Box<dyn VideoEncoder>> + Send + Sync>;

#[derive(Default)]
struct Registry {
    decoders: HashMap<CodecId, DecoderFactory>,
    encoders: HashMap<CodecId, EncoderFactory>,
}

impl Registry {
    fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.decoders.insert(
            CodecId::RawVideo,
            Box::new(|config| Ok(Box::new(RawVideoDecoder::new(config.clone())?) as _)),
        );
        registry.encoders.insert(
            CodecId::RawVideo,
            Box::new(|config| Ok(Box::new(RawVideoEncoder::new(config.clone())?) as _)),
        );
        registry
    }
}

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| RwLock::new(Registry::with_builtins()))
}

/// Register a decoder factory for a codec, replacing any existing one.
pub fn register_decoder(codec: CodecId, factory: DecoderFactory) {
    debug!(codec = %codec, "registering decoder");
    registry().write().decoders.insert(codec, factory);
}

/// Register an encoder factory for a codec, replacing any existing one.
pub fn register_encoder(codec: CodecId, factory: EncoderFactory) {
    debug!(codec = %codec, "registering encoder");
    registry().write().encoders.insert(codec, factory);
}

/// Open a decoder for the codec named in the configuration.
pub fn open_decoder(config: &DecoderConfig) -> Result<Box<dyn VideoDecoder>> {
    let registry = registry().read();
    let factory = registry
        .decoders
        .get(&config.codec)
        .ok_or_else(|| CodecError::DecoderNotFound(config.codec.clone()))?;
    factory(config)
}

/// Open an encoder for the codec named in the configuration.
pub fn open_encoder(config: &EncoderConfig) -> Result<Box<dyn VideoEncoder>> {
    let registry = registry().read();
    let factory = registry
        .encoders
        .get(&config.codec)
        .ok_or_else(|| CodecError::EncoderNotFound(config.codec.clone()))?;
    factory(config)
}
