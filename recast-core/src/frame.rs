//! Raw video frame abstractions.
//!
//! Provides types for representing decoded video frames in various pixel
//! formats.

use crate::timestamp::{Duration, TimeBase, Timestamp};
use bitflags::bitflags;
use std::fmt;

/// Pixel format for video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp.
    Yuv420p,
    /// Planar YUV 4:2:2, 16bpp.
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp.
    Yuv444p,
    /// Y plane followed by an interleaved UV plane.
    Nv12,
    /// Packed RGB, 24bpp.
    Rgb24,
    /// Packed RGBA, 32bpp.
    Rgba,
    /// Grayscale, 8bpp.
    Gray8,
}

impl PixelFormat {
    /// Get the number of planes for this pixel format.
    pub fn num_planes(&self) -> usize {
        match self {
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p => 3,
            Self::Nv12 => 2,
            Self::Rgb24 | Self::Rgba | Self::Gray8 => 1,
        }
    }

    /// Check if this is a planar YUV format.
    pub fn is_planar(&self) -> bool {
        matches!(self, Self::Yuv420p | Self::Yuv422p | Self::Yuv444p)
    }

    /// Get chroma subsampling factors (horizontal, vertical).
    pub fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p | Self::Nv12 => (2, 2),
            Self::Yuv422p => (2, 1),
            _ => (1, 1),
        }
    }

    /// Number of payload bytes in one row of the given plane, with no
    /// padding.
    pub fn plane_row_bytes(&self, plane: usize, width: u32) -> usize {
        let width = width as usize;
        match self {
            Self::Yuv420p | Self::Yuv422p => {
                if plane == 0 {
                    width
                } else {
                    width / 2
                }
            }
            Self::Yuv444p => width,
            // Interleaved UV rows carry a U and a V byte per sample pair.
            Self::Nv12 => width,
            Self::Rgb24 => width * 3,
            Self::Rgba => width * 4,
            Self::Gray8 => width,
        }
    }

    /// Number of rows in the given plane.
    pub fn plane_height(&self, plane: usize, height: u32) -> usize {
        let height = height as usize;
        if plane == 0 {
            return height;
        }
        let (_, vsub) = self.chroma_subsampling();
        height / vsub as usize
    }

    /// Total number of payload bytes for one tightly packed picture.
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        (0..self.num_planes())
            .map(|p| self.plane_row_bytes(p, width) * self.plane_height(p, height))
            .sum()
    }

    /// Parse a pixel format name as used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "yuv420p" => Some(Self::Yuv420p),
            "yuv422p" => Some(Self::Yuv422p),
            "yuv444p" => Some(Self::Yuv444p),
            "nv12" => Some(Self::Nv12),
            "rgb24" => Some(Self::Rgb24),
            "rgba" => Some(Self::Rgba),
            "gray8" | "gray" => Some(Self::Gray8),
            _ => None,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PixelFormat {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Nv12 => "nv12",
            Self::Rgb24 => "rgb24",
            Self::Rgba => "rgba",
            Self::Gray8 => "gray8",
        }
    }
}

/// Describes the shape of a raw frame: format plus dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameLayout {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
}

bitflags! {
    /// Frame flags indicating frame properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FrameFlags: u32 {
        /// This is a keyframe (I-frame).
        const KEYFRAME = 0x0001;
        /// Frame is corrupted or incomplete.
        const CORRUPT = 0x0002;
    }
}

/// A decoded video frame.
#[derive(Clone)]
pub struct Frame {
    /// Frame data buffer.
    buffer: FrameBuffer,
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// Frame duration.
    pub duration: Duration,
    /// Frame flags.
    pub flags: FrameFlags,
}

impl Frame {
    /// Create a new zero-filled frame with the specified parameters.
    pub fn new(width: u32, height: u32, format: PixelFormat, time_base: TimeBase) -> Self {
        Self {
            buffer: FrameBuffer::new(width, height, format),
            pts: Timestamp::new(Timestamp::NONE, time_base),
            duration: Duration::new(0, time_base),
            flags: FrameFlags::empty(),
        }
    }

    /// Create a frame from an existing buffer.
    pub fn from_buffer(buffer: FrameBuffer) -> Self {
        Self {
            buffer,
            pts: Timestamp::none(),
            duration: Duration::zero(),
            flags: FrameFlags::empty(),
        }
    }

    /// Get the frame width.
    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    /// Get the frame height.
    pub fn height(&self) -> u32 {
        self.buffer.height
    }

    /// Get the pixel format.
    pub fn format(&self) -> PixelFormat {
        self.buffer.format
    }

    /// Get the frame layout descriptor.
    pub fn layout(&self) -> FrameLayout {
        FrameLayout {
            width: self.buffer.width,
            height: self.buffer.height,
            format: self.buffer.format,
        }
    }

    /// Check if this is a keyframe.
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(FrameFlags::KEYFRAME)
    }

    /// Get the frame buffer.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Get a mutable reference to the frame buffer.
    pub fn buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    /// Get a plane's data.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.buffer.plane(index)
    }

    /// Get a mutable reference to a plane's data.
    pub fn plane_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.buffer.plane_mut(index)
    }

    /// Get the stride (bytes per row) for a plane.
    pub fn stride(&self, plane: usize) -> usize {
        self.buffer.stride(plane)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format())
            .field("pts", &self.pts)
            .field("flags", &self.flags)
            .finish()
    }
}

/// A buffer for storing frame pixel data.
#[derive(Clone)]
pub struct FrameBuffer {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
    /// Plane data.
    planes: Vec<PlaneData>,
}

#[derive(Clone)]
struct PlaneData {
    data: Vec<u8>,
    stride: usize,
}

impl FrameBuffer {
    /// Create a new zero-filled frame buffer.
    ///
    /// Strides are aligned to 32 bytes.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let num_planes = format.num_planes();
        let mut planes = Vec::with_capacity(num_planes);

        for plane in 0..num_planes {
            let row_bytes = format.plane_row_bytes(plane, width);
            let rows = format.plane_height(plane, height);
            let stride = (row_bytes + 31) & !31;
            planes.push(PlaneData {
                data: vec![0u8; stride * rows],
                stride,
            });
        }

        Self {
            width,
            height,
            format,
            planes,
        }
    }

    /// Get the number of planes.
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    /// Get a plane's data.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.planes.get(index).map(|p| p.data.as_slice())
    }

    /// Get a mutable reference to a plane's data.
    pub fn plane_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.planes.get_mut(index).map(|p| p.data.as_mut_slice())
    }

    /// Get the stride for a plane.
    pub fn stride(&self, plane: usize) -> usize {
        self.planes.get(plane).map(|p| p.stride).unwrap_or(0)
    }

    /// Fill all planes with a value.
    pub fn fill(&mut self, value: u8) {
        for plane in &mut self.planes {
            plane.data.fill(value);
        }
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("planes", &self.planes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_planes() {
        assert_eq!(PixelFormat::Yuv420p.num_planes(), 3);
        assert_eq!(PixelFormat::Nv12.num_planes(), 2);
        assert_eq!(PixelFormat::Rgb24.num_planes(), 1);
    }

    #[test]
    fn test_frame_size() {
        assert_eq!(PixelFormat::Yuv420p.frame_size(16, 16), 16 * 16 * 3 / 2);
        assert_eq!(PixelFormat::Rgb24.frame_size(16, 16), 16 * 16 * 3);
        assert_eq!(PixelFormat::Nv12.frame_size(16, 16), 16 * 16 * 3 / 2);
        assert_eq!(PixelFormat::Yuv422p.frame_size(16, 16), 16 * 16 * 2);
    }

    #[test]
    fn test_frame_buffer_creation() {
        let buffer = FrameBuffer::new(1920, 1080, PixelFormat::Yuv420p);
        assert_eq!(buffer.num_planes(), 3);
        assert!(buffer.plane(0).is_some());
        assert!(buffer.plane(2).is_some());
        assert!(buffer.plane(3).is_none());
    }

    #[test]
    fn test_stride_alignment() {
        let buffer = FrameBuffer::new(100, 100, PixelFormat::Yuv420p);
        assert_eq!(buffer.stride(0) % 32, 0);
        assert!(buffer.stride(0) >= 100);
    }

    #[test]
    fn test_frame_layout() {
        let frame = Frame::new(320, 240, PixelFormat::Yuv420p, TimeBase::MILLISECONDS);
        let layout = frame.layout();
        assert_eq!(layout.width, 320);
        assert_eq!(layout.height, 240);
        assert_eq!(layout.format, PixelFormat::Yuv420p);
    }

    #[test]
    fn test_format_name_round_trip() {
        for fmt in [
            PixelFormat::Yuv420p,
            PixelFormat::Rgb24,
            PixelFormat::Gray8,
        ] {
            assert_eq!(PixelFormat::from_name(fmt.name()), Some(fmt));
        }
    }
}
