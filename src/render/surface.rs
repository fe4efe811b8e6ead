use std::path::Path;

use anyhow::Context;

use crate::{
    assets::decode::FrameImage,
    foundation::core::{Rect, Rgba8Premul, Viewport},
    foundation::error::{ReelError, ReelResult},
};

/// Drawable target the player paints frames into.
pub trait Surface {
    /// Current pixel dimensions.
    fn viewport(&self) -> Viewport;

    /// Change pixel dimensions. Contents afterwards are unspecified until the next clear.
    fn resize(&mut self, viewport: Viewport);

    /// Fill the whole surface with `color`.
    fn clear(&mut self, color: Rgba8Premul);

    /// Scale `frame` into `dest` (surface pixels) and composite it source-over.
    fn blit(&mut self, frame: &FrameImage, dest: Rect);
}

/// CPU surface backed by a premultiplied RGBA8 buffer.
#[derive(Clone, Debug)]
pub struct PixmapSurface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixmapSurface {
    /// Transparent surface of the given size.
    pub fn new(viewport: Viewport) -> Self {
        Self {
            width: viewport.width,
            height: viewport.height,
            data: vec![0; byte_len(viewport)],
        }
    }

    /// Premultiplied RGBA8 bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Premultiplied pixel at `(x, y)`, if inside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Straight-alpha copy of the surface.
    pub fn to_rgba_image(&self) -> ReelResult<image::RgbaImage> {
        let mut straight = self.data.clone();
        unpremultiply_rgba8_in_place(&mut straight);
        image::RgbaImage::from_raw(self.width, self.height, straight)
            .ok_or_else(|| ReelError::validation("surface buffer does not match its dimensions"))
    }

    /// Write the surface as a PNG file.
    pub fn save_png(&self, path: &Path) -> ReelResult<()> {
        self.to_rgba_image()?
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

impl Surface for PixmapSurface {
    fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width,
            height: self.height,
        }
    }

    fn resize(&mut self, viewport: Viewport) {
        self.width = viewport.width;
        self.height = viewport.height;
        self.data.clear();
        self.data.resize(byte_len(viewport), 0);
    }

    fn clear(&mut self, color: Rgba8Premul) {
        let px = color.to_array();
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    fn blit(&mut self, frame: &FrameImage, dest: Rect) {
        let x0 = dest.x0.round();
        let y0 = dest.y0.round();
        let w = (dest.x1.round() - x0).max(0.0);
        let h = (dest.y1.round() - y0).max(0.0);
        if w < 1.0 || h < 1.0 || frame.width == 0 || frame.height == 0 {
            return;
        }
        let (w, h) = (w as u32, h as u32);

        let Some(src) =
            image::RgbaImage::from_raw(frame.width, frame.height, frame.rgba8_premul.to_vec())
        else {
            return;
        };
        // Premultiplied data resamples without fringing.
        let scaled = if (w, h) == (frame.width, frame.height) {
            src
        } else {
            image::imageops::resize(&src, w, h, image::imageops::FilterType::Triangle)
        };

        let (x0, y0) = (x0 as i64, y0 as i64);
        let sw = i64::from(self.width);
        let sh = i64::from(self.height);
        for (sx, sy, px) in scaled.enumerate_pixels() {
            let dx = x0 + i64::from(sx);
            let dy = y0 + i64::from(sy);
            if dx < 0 || dy < 0 || dx >= sw || dy >= sh {
                continue;
            }
            let i = ((dy * sw + dx) as usize) * 4;
            source_over(&mut self.data[i..i + 4], px.0);
        }
    }
}

fn byte_len(viewport: Viewport) -> usize {
    (viewport.width as usize)
        .saturating_mul(viewport.height as usize)
        .saturating_mul(4)
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

fn source_over(dst: &mut [u8], src: [u8; 4]) {
    let sa = src[3];
    if sa == 255 {
        dst.copy_from_slice(&src);
        return;
    }
    if sa == 0 {
        return;
    }
    let inv = 255 - u16::from(sa);
    for c in 0..4 {
        let v = u16::from(src[c]) + mul_div255(u16::from(dst[c]), inv);
        dst[c] = v.min(255) as u8;
    }
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in px.iter_mut().take(3) {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
