//! Frame conversion.
//!
//! [`FrameConverter`] bridges a decoder's output layout to an encoder's
//! input layout. It is built once for a (source, destination) layout pair
//! and reused for every frame. Supported conversions are pixel format
//! changes at equal dimensions (yuv420p/rgb24/gray8) and nearest-neighbor
//! scaling at equal format for 8-bit planar layouts. Anything else is
//! rejected at construction time.

use crate::error::{PipelineError, Result};
use recast_core::error::Error as CoreError;
use recast_core::frame::{Frame, FrameLayout, PixelFormat};
use tracing::debug;

/// Copy pixel data between two frames of identical layout, honoring the
/// per-plane strides on both sides.
pub fn copy_frame(src: &Frame, dst: &mut Frame) -> Result<()> {
    if src.layout() != dst.layout() {
        return Err(PipelineError::InvalidConfig(
            "frame layouts differ".into(),
        ));
    }
    let format = src.format();
    for plane in 0..format.num_planes() {
        let row_bytes = format.plane_row_bytes(plane, src.width());
        let rows = format.plane_height(plane, src.height());
        let src_stride = src.stride(plane);
        let dst_stride = dst.stride(plane);
        let src_data = src.plane(plane).ok_or_else(missing_plane)?;
        let dst_data = dst.plane_mut(plane).ok_or_else(missing_plane)?;
        for row in 0..rows {
            dst_data[row * dst_stride..row * dst_stride + row_bytes]
                .copy_from_slice(&src_data[row * src_stride..row * src_stride + row_bytes]);
        }
    }
    Ok(())
}

fn missing_plane() -> PipelineError {
    PipelineError::InvalidConfig("missing frame plane".into())
}

enum Kind {
    Copy,
    Yuv420ToRgb,
    RgbToYuv420,
    GrayToYuv420,
    Yuv420ToGray,
    ScaleNearest,
}

/// Converts frames from one layout to another.
pub struct FrameConverter {
    src: FrameLayout,
    dst: FrameLayout,
    kind: Kind,
}

fn scalable(format: PixelFormat) -> bool {
    matches!(
        format,
        PixelFormat::Yuv420p | PixelFormat::Yuv422p | PixelFormat::Yuv444p | PixelFormat::Gray8
    )
}

impl FrameConverter {
    /// Build a converter for the given layout pair.
    pub fn new(src: FrameLayout, dst: FrameLayout) -> Result<Self> {
        let kind = if src == dst {
            Kind::Copy
        } else if src.width == dst.width && src.height == dst.height {
            match (src.format, dst.format) {
                (PixelFormat::Yuv420p, PixelFormat::Rgb24) => Kind::Yuv420ToRgb,
                (PixelFormat::Rgb24, PixelFormat::Yuv420p) => Kind::RgbToYuv420,
                (PixelFormat::Gray8, PixelFormat::Yuv420p) => Kind::GrayToYuv420,
                (PixelFormat::Yuv420p, PixelFormat::Gray8) => Kind::Yuv420ToGray,
                (from, to) => {
                    return Err(CoreError::unsupported(format!(
                        "pixel format conversion {from} to {to}"
                    ))
                    .into())
                }
            }
        } else if src.format == dst.format && scalable(src.format) {
            Kind::ScaleNearest
        } else {
            return Err(CoreError::unsupported(format!(
                "conversion {}x{} {} to {}x{} {}",
                src.width, src.height, src.format, dst.width, dst.height, dst.format
            ))
            .into());
        };

        debug!(
            from = %format_args!("{}x{} {}", src.width, src.height, src.format),
            to = %format_args!("{}x{} {}", dst.width, dst.height, dst.format),
            "built frame converter"
        );
        Ok(Self { src, dst, kind })
    }

    /// The source layout this converter accepts.
    pub fn src_layout(&self) -> FrameLayout {
        self.src
    }

    /// The destination layout this converter produces.
    pub fn dst_layout(&self) -> FrameLayout {
        self.dst
    }

    /// Convert one frame, writing pixels into `dst` and carrying the
    /// timing fields over from `src`.
    pub fn convert_into(&self, src: &Frame, dst: &mut Frame) -> Result<()> {
        if src.layout() != self.src {
            return Err(PipelineError::InvalidConfig(
                "source frame does not match converter layout".into(),
            ));
        }
        if dst.layout() != self.dst {
            return Err(PipelineError::InvalidConfig(
                "destination frame does not match converter layout".into(),
            ));
        }

        match self.kind {
            Kind::Copy => copy_frame(src, dst)?,
            Kind::Yuv420ToRgb => yuv420_to_rgb(src, dst),
            Kind::RgbToYuv420 => rgb_to_yuv420(src, dst),
            Kind::GrayToYuv420 => gray_to_yuv420(src, dst),
            Kind::Yuv420ToGray => yuv420_to_gray(src, dst),
            Kind::ScaleNearest => scale_nearest(src, dst),
        }

        dst.pts = src.pts;
        dst.duration = src.duration;
        dst.flags = src.flags;
        Ok(())
    }
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

// BT.601 studio-swing integer approximation.
fn yuv420_to_rgb(src: &Frame, dst: &mut Frame) {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let (sy, su, sv) = (src.stride(0), src.stride(1), src.stride(2));
    let y_plane = src.plane(0).unwrap_or(&[]);
    let u_plane = src.plane(1).unwrap_or(&[]);
    let v_plane = src.plane(2).unwrap_or(&[]);
    let dst_stride = dst.stride(0);
    let rgb = match dst.plane_mut(0) {
        Some(p) => p,
        None => return,
    };

    for row in 0..h {
        for col in 0..w {
            let c = y_plane[row * sy + col] as i32 - 16;
            let d = u_plane[(row / 2) * su + col / 2] as i32 - 128;
            let e = v_plane[(row / 2) * sv + col / 2] as i32 - 128;
            let base = row * dst_stride + col * 3;
            rgb[base] = clamp_u8((298 * c + 409 * e + 128) >> 8);
            rgb[base + 1] = clamp_u8((298 * c - 100 * d - 208 * e + 128) >> 8);
            rgb[base + 2] = clamp_u8((298 * c + 516 * d + 128) >> 8);
        }
    }
}

fn rgb_to_yuv420(src: &Frame, dst: &mut Frame) {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let src_stride = src.stride(0);
    let rgb = src.plane(0).unwrap_or(&[]);
    let (sy, su, sv) = (dst.stride(0), dst.stride(1), dst.stride(2));

    if let Some(y_plane) = dst.plane_mut(0) {
        for row in 0..h {
            for col in 0..w {
                let base = row * src_stride + col * 3;
                let (r, g, b) = (rgb[base] as i32, rgb[base + 1] as i32, rgb[base + 2] as i32);
                y_plane[row * sy + col] =
                    clamp_u8(((66 * r + 129 * g + 25 * b + 128) >> 8) + 16);
            }
        }
    }
    // Chroma is taken from the top-left pixel of each 2x2 block.
    for row in (0..h).step_by(2) {
        for col in (0..w).step_by(2) {
            let base = row * src_stride + col * 3;
            let (r, g, b) = (rgb[base] as i32, rgb[base + 1] as i32, rgb[base + 2] as i32);
            if let Some(u_plane) = dst.plane_mut(1) {
                u_plane[(row / 2) * su + col / 2] =
                    clamp_u8(((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128);
            }
            if let Some(v_plane) = dst.plane_mut(2) {
                v_plane[(row / 2) * sv + col / 2] =
                    clamp_u8(((112 * r - 94 * g - 18 * b + 128) >> 8) + 128);
            }
        }
    }
}

fn gray_to_yuv420(src: &Frame, dst: &mut Frame) {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let src_stride = src.stride(0);
    let gray = src.plane(0).unwrap_or(&[]);
    let dst_stride = dst.stride(0);

    if let Some(y_plane) = dst.plane_mut(0) {
        for row in 0..h {
            y_plane[row * dst_stride..row * dst_stride + w]
                .copy_from_slice(&gray[row * src_stride..row * src_stride + w]);
        }
    }
    for plane in 1..3 {
        if let Some(chroma) = dst.plane_mut(plane) {
            chroma.fill(128);
        }
    }
}

fn yuv420_to_gray(src: &Frame, dst: &mut Frame) {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let src_stride = src.stride(0);
    let dst_stride = dst.stride(0);
    let y_plane = src.plane(0).unwrap_or(&[]);
    if let Some(gray) = dst.plane_mut(0) {
        for row in 0..h {
            gray[row * dst_stride..row * dst_stride + w]
                .copy_from_slice(&y_plane[row * src_stride..row * src_stride + w]);
        }
    }
}

fn scale_nearest(src: &Frame, dst: &mut Frame) {
    let format = src.format();
    for plane in 0..format.num_planes() {
        let src_w = format.plane_row_bytes(plane, src.width());
        let src_h = format.plane_height(plane, src.height());
        let dst_w = format.plane_row_bytes(plane, dst.width());
        let dst_h = format.plane_height(plane, dst.height());
        let src_stride = src.stride(plane);
        let dst_stride = dst.stride(plane);
        let src_data = match src.plane(plane) {
            Some(p) => p,
            None => continue,
        };
        let dst_data = match dst.plane_mut(plane) {
            Some(p) => p,
            None => continue,
        };
        for row in 0..dst_h {
            let src_row = row * src_h / dst_h;
            for col in 0..dst_w {
                let src_col = col * src_w / dst_w;
                dst_data[row * dst_stride + col] = src_data[src_row * src_stride + src_col];
            }
        }
    }
}
