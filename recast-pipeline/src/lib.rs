//! Pipeline layer for the recast library.
//!
//! Ties the container and codec layers together: [`select_stream`] picks
//! the stream to process, [`TransformBox`] gives codecs a uniform
//! submit/receive/finish surface, [`FrameConverter`] bridges mismatched
//! frame layouts, and [`Driver`] runs the whole remux or transcode loop.

pub mod convert;
pub mod driver;
pub mod error;
pub mod select;
pub mod transform;

pub use convert::{copy_frame, FrameConverter};
pub use driver::{Driver, ProgressCallback, RunStats};
pub use error::{PipelineError, Result};
pub use select::select_stream;
pub use transform::{
    BoxState, DecodeAdapter, DecoderBox, EncodeAdapter, EncoderBox, Recv, Transform, TransformBox,
};
