//! # Recast Core
//!
//! Core types for the recast remux/transcode pipeline.
//!
//! This crate provides the building blocks shared by every recast component:
//! - Error handling types
//! - Rational arithmetic and timestamp/time-base handling
//! - Packet (compressed unit) and frame (raw picture) abstractions
//! - Codec and track identity

pub mod error;
pub mod format;
pub mod frame;
pub mod packet;
pub mod rational;
pub mod timestamp;

pub use error::{CodecError, ContainerError, Error, Result};
pub use format::{CodecId, TrackType};
pub use frame::{Frame, FrameBuffer, FrameLayout, PixelFormat};
pub use packet::{Packet, PacketFlags};
pub use rational::{Rational, Rounding};
pub use timestamp::{Duration, TimeBase, Timestamp};
