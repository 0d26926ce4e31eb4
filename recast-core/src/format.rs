//! Track and codec identity.

use std::fmt;

/// Media kind of a container stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    /// Video track.
    Video,
    /// Audio track.
    Audio,
    /// Subtitle track.
    Subtitle,
    /// Data track.
    Data,
    /// Unknown track type.
    Unknown,
}

/// Codec identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// Uncompressed planar video.
    RawVideo,
    /// H.264/AVC.
    H264,
    /// H.265/HEVC.
    H265,
    /// VP8.
    Vp8,
    /// VP9.
    Vp9,
    /// AV1.
    Av1,
    /// Unknown codec, carrying the identity string from the container.
    Unknown(String),
}

impl CodecId {
    /// Get the FourCC used in containers that carry one.
    ///
    /// Raw video maps to the conventional `I420` FourCC for planar YUV.
    pub fn fourcc(&self) -> Option<[u8; 4]> {
        match self {
            CodecId::RawVideo => Some(*b"I420"),
            CodecId::H264 => Some(*b"H264"),
            CodecId::H265 => Some(*b"H265"),
            CodecId::Vp8 => Some(*b"VP80"),
            CodecId::Vp9 => Some(*b"VP90"),
            CodecId::Av1 => Some(*b"AV01"),
            CodecId::Unknown(_) => None,
        }
    }

    /// Resolve a FourCC back to a codec identity.
    pub fn from_fourcc(fourcc: [u8; 4]) -> Self {
        match &fourcc {
            b"I420" => CodecId::RawVideo,
            b"H264" => CodecId::H264,
            b"H265" | b"HEVC" => CodecId::H265,
            b"VP80" => CodecId::Vp8,
            b"VP90" => CodecId::Vp9,
            b"AV01" => CodecId::Av1,
            other => CodecId::Unknown(String::from_utf8_lossy(other).into_owned()),
        }
    }

    /// Parse a codec name as used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "rawvideo" | "raw" => Some(CodecId::RawVideo),
            "h264" | "avc" => Some(CodecId::H264),
            "h265" | "hevc" => Some(CodecId::H265),
            "vp8" => Some(CodecId::Vp8),
            "vp9" => Some(CodecId::Vp9),
            "av1" => Some(CodecId::Av1),
            _ => None,
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecId::RawVideo => write!(f, "rawvideo"),
            CodecId::H264 => write!(f, "h264"),
            CodecId::H265 => write!(f, "h265"),
            CodecId::Vp8 => write!(f, "vp8"),
            CodecId::Vp9 => write!(f, "vp9"),
            CodecId::Av1 => write!(f, "av1"),
            CodecId::Unknown(s) => write!(f, "unknown({})", s),
        }
    }
}
