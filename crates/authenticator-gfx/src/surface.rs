//! Tiled framebuffer surface
//!
//! The display scans out of a block-linear buffer: pixels are grouped into
//! 32x16 blocks of 512 pixels, blocks are stacked eight high into 128-row
//! bands, and within a block pixels are interleaved in 8x2 groups. Every
//! drawing primitive goes through [`Surface::pixel_offset`], which maps
//! linear coordinates into that layout and refuses anything outside the
//! canvas.

use crate::color::{Color, CHANNEL_MAX};
use crate::error::{GfxError, Result};
use crate::glyph::GlyphCache;

/// Canvas width must be a multiple of this
pub const WIDTH_ALIGNMENT: u32 = 64;

/// Rows per band of blocks; the buffer height is rounded up to this
pub const BLOCK_BAND_HEIGHT: u32 = 128;

/// Blend one 4-bit channel: `alpha` of the incoming `dst` over the existing `src`
pub fn blend_color(src: u8, dst: u8, alpha: u8) -> u8 {
    let alpha = u16::from(alpha.min(CHANNEL_MAX));
    let one_minus_alpha = u16::from(CHANNEL_MAX) - alpha;
    let blended = u16::from(dst) * alpha + u16::from(src) * one_minus_alpha;
    (blended / u16::from(CHANNEL_MAX)) as u8
}

fn align_up(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// How a string is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Line height in pixels
    pub font_size: f32,
    /// A fully transparent color only measures the text
    pub color: Color,
    /// Advance every glyph by the width of `'W'`
    pub monospace: bool,
    /// Stop once the drawn width exceeds this; 0 means unbounded
    pub max_width: i32,
}

impl TextStyle {
    pub fn new(font_size: f32, color: Color) -> Self {
        Self {
            font_size,
            color,
            monospace: false,
            max_width: 0,
        }
    }

    pub fn monospace(mut self) -> Self {
        self.monospace = true;
        self
    }

    pub fn max_width(mut self, max_width: i32) -> Self {
        self.max_width = max_width;
        self
    }

    /// Same style with a transparent color, for measuring
    pub fn measuring(mut self) -> Self {
        self.color = Color::TRANSPARENT;
        self
    }
}

/// An RGBA4444 canvas in the display's tiled layout
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u16>,
    /// Alpha multiplier for bitmap blits
    opacity: f32,
}

impl Surface {
    /// Allocate a transparent canvas
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::validate_geometry(width, height)?;

        Ok(Self {
            width,
            height,
            pixels: vec![Color::TRANSPARENT.raw(); Self::buffer_len(width, height)],
            opacity: 1.0,
        })
    }

    /// Check that the tiled layout can address a `width` x `height` canvas
    pub fn validate_geometry(width: u32, height: u32) -> Result<()> {
        if width == 0 || width % WIDTH_ALIGNMENT != 0 {
            return Err(GfxError::InvalidGeometry {
                width,
                height,
                reason: "width must be a non-zero multiple of 64",
            });
        }
        if height == 0 {
            return Err(GfxError::InvalidGeometry {
                width,
                height,
                reason: "height must be non-zero",
            });
        }
        Ok(())
    }

    /// Pixels backing a canvas (height rounded up to whole bands)
    pub fn buffer_len(width: u32, height: u32) -> usize {
        width as usize * align_up(height, BLOCK_BAND_HEIGHT) as usize
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw buffer in scan-out order
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Buffer index of a pixel, or `None` outside the canvas
    pub fn pixel_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }

        let mut pos =
            ((y & 127) / 16) + (x / 32 * 8) + ((y / 16 / 8) * ((self.width / 2) / 16 * 8));
        pos *= 16 * 16 * 4;
        pos += ((y % 16) / 8) * 512
            + ((x % 32) / 16) * 256
            + ((y % 8) / 2) * 64
            + ((x % 16) / 8) * 32
            + (y % 2) * 16
            + (x % 8) * 2;

        let offset = (pos / 2) as usize;
        (offset < self.pixels.len()).then_some(offset)
    }

    /// Current color of a pixel
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.pixel_offset(x, y).map(|offset| Color::from_raw(self.pixels[offset]))
    }

    /// Write a pixel without blending
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(offset) = self.pixel_offset(x, y) {
            self.pixels[offset] = color.raw();
        }
    }

    /// Blend the color channels, keeping the existing alpha
    pub fn set_pixel_blend_src(&mut self, x: i32, y: i32, color: Color) {
        if let Some(offset) = self.pixel_offset(x, y) {
            let existing = Color::from_raw(self.pixels[offset]);
            let blended = Color::new(
                blend_color(existing.r(), color.r(), color.a()),
                blend_color(existing.g(), color.g(), color.a()),
                blend_color(existing.b(), color.b(), color.a()),
                existing.a(),
            );
            self.pixels[offset] = blended.raw();
        }
    }

    /// Blend the color channels, accumulating alpha (saturating at 15)
    pub fn set_pixel_blend_dst(&mut self, x: i32, y: i32, color: Color) {
        if let Some(offset) = self.pixel_offset(x, y) {
            let existing = Color::from_raw(self.pixels[offset]);
            let blended = Color::new(
                blend_color(existing.r(), color.r(), color.a()),
                blend_color(existing.g(), color.g(), color.a()),
                blend_color(existing.b(), color.b(), color.a()),
                (existing.a() + color.a()).min(CHANNEL_MAX),
            );
            self.pixels[offset] = blended.raw();
        }
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        for x1 in x..x.saturating_add(w) {
            for y1 in y..y.saturating_add(h) {
                self.set_pixel_blend_dst(x1, y1, color);
            }
        }
    }

    pub fn draw_circle(&mut self, cx: i32, cy: i32, radius: u16, filled: bool, color: Color) {
        if filled {
            self.fill_circle(cx, cy, radius, color);
        } else {
            self.outline_circle(cx, cy, radius, color);
        }
    }

    /// Midpoint circle, eight symmetric points per step
    fn outline_circle(&mut self, cx: i32, cy: i32, radius: u16, color: Color) {
        let mut x = i32::from(radius);
        let mut y = 0;
        let mut err = 0;

        while x >= y {
            let (left, right) = (cx.saturating_sub(x), cx.saturating_add(x));
            let (inner_left, inner_right) = (cx.saturating_sub(y), cx.saturating_add(y));
            let (top, bottom) = (cy.saturating_sub(x), cy.saturating_add(x));
            let (inner_top, inner_bottom) = (cy.saturating_sub(y), cy.saturating_add(y));

            self.set_pixel_blend_dst(right, inner_bottom, color);
            self.set_pixel_blend_dst(inner_right, bottom, color);
            self.set_pixel_blend_dst(inner_left, bottom, color);
            self.set_pixel_blend_dst(left, inner_bottom, color);
            self.set_pixel_blend_dst(left, inner_top, color);
            self.set_pixel_blend_dst(inner_left, top, color);
            self.set_pixel_blend_dst(inner_right, top, color);
            self.set_pixel_blend_dst(right, inner_top, color);

            if err <= 0 {
                y += 1;
                err += 2 * y + 1;
            } else {
                x -= 1;
                err -= 2 * x + 1;
            }
        }
    }

    /// Horizontal spans for the four symmetric rows of each step
    fn fill_circle(&mut self, cx: i32, cy: i32, radius: u16, color: Color) {
        let mut x = i32::from(radius);
        let mut y = 0;
        let mut err = 0;
        let mut x_change = 1 - 2 * i32::from(radius);
        let mut y_change = 0;

        while x >= y {
            for i in cx.saturating_sub(x)..=cx.saturating_add(x) {
                self.set_pixel_blend_dst(i, cy.saturating_add(y), color);
                self.set_pixel_blend_dst(i, cy.saturating_sub(y), color);
            }
            for i in cx.saturating_sub(y)..=cx.saturating_add(y) {
                self.set_pixel_blend_dst(i, cy.saturating_add(x), color);
                self.set_pixel_blend_dst(i, cy.saturating_sub(x), color);
            }

            y += 1;
            err += y_change;
            y_change += 2;
            if 2 * err + x_change > 0 {
                x -= 1;
                err += x_change;
                x_change += 2;
            }
        }
    }

    /// Blit an RGBA8888 bitmap, narrowed to 4 bits per channel
    ///
    /// The surface opacity scales each sample's alpha. Samples overwrite the
    /// canvas; nothing is blended.
    pub fn draw_bitmap(&mut self, x: i32, y: i32, w: u32, h: u32, rgba: &[u8]) {
        if w == 0 {
            return;
        }

        let samples = rgba.chunks_exact(4).take(w as usize * h as usize);
        for (i, sample) in samples.enumerate() {
            let dx = (i % w as usize) as i32;
            let dy = (i / w as usize) as i32;
            let color = Color::from_rgba8888([sample[0], sample[1], sample[2], sample[3]])
                .with_opacity(self.opacity);
            self.set_pixel(x.saturating_add(dx), y.saturating_add(dy), color);
        }
    }

    /// Draw `text` with its first baseline at `y`
    ///
    /// Returns the `(width, height)` the text covers: the widest line and
    /// the distance from the first to the last baseline. Drawing with a
    /// transparent color only measures.
    pub fn draw_string(
        &mut self,
        glyphs: &mut GlyphCache,
        text: &str,
        x: i32,
        y: i32,
        style: &TextStyle,
    ) -> (u32, u32) {
        let mut max_x = x;
        let mut cur_x = x;
        let mut cur_y = y;

        for c in text.chars() {
            if style.max_width > 0 && style.max_width < cur_x.saturating_sub(x) {
                break;
            }

            if c == '\n' {
                max_x = max_x.max(cur_x);
                cur_x = x;
                cur_y = (cur_y as f32 + style.font_size) as i32;
                continue;
            }

            let glyph = glyphs.resolve(c, style.monospace, style.font_size);

            let visible = glyph.has_bitmap()
                && !c.is_whitespace()
                && style.font_size > 0.0
                && !style.color.is_transparent();
            if visible {
                let origin_x = cur_x.saturating_add(glyph.bounds[0]);
                let origin_y = cur_y.saturating_add(glyph.bounds[1]);
                for gy in 0..glyph.height {
                    for gx in 0..glyph.width {
                        let px = origin_x.saturating_add(gx as i32);
                        let py = origin_y.saturating_add(gy as i32);
                        match glyph.coverage_at(gx, gy) {
                            0 => {}
                            CHANNEL_MAX => self.set_pixel(px, py, style.color),
                            coverage => {
                                let alpha = coverage * style.color.a() / CHANNEL_MAX;
                                self.set_pixel_blend_dst(px, py, style.color.with_alpha(alpha));
                            }
                        }
                    }
                }
            }

            cur_x = cur_x.saturating_add(glyph.advance_px());
        }

        max_x = max_x.max(cur_x);
        (
            max_x.saturating_sub(x).max(0) as u32,
            cur_y.saturating_sub(y).max(0) as u32,
        )
    }

    /// Fill the whole buffer with one color
    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color.raw());
    }

    /// Make every pixel fully transparent
    pub fn clear(&mut self) {
        self.fill(Color::TRANSPARENT);
    }
}
