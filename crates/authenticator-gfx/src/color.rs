//! RGBA4444 colors
//!
//! A color packs four 4-bit channels into 16 bits: red in bits 0-3, green in
//! 4-7, blue in 8-11 and alpha in 12-15. This is the framebuffer's native
//! pixel format, so a [`Color`] is written to the surface as-is.

/// Largest value of a 4-bit channel
pub const CHANNEL_MAX: u8 = 0xF;

/// A packed RGBA4444 color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(u16);

impl Color {
    /// Fully transparent black
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
    /// Opaque black
    pub const BLACK: Color = Color::new(0, 0, 0, 0xF);
    /// Opaque white
    pub const WHITE: Color = Color::new(0xF, 0xF, 0xF, 0xF);

    /// Build a color from four 4-bit channels (higher bits are dropped)
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(
            (r as u16 & 0xF)
                | ((g as u16 & 0xF) << 4)
                | ((b as u16 & 0xF) << 8)
                | ((a as u16 & 0xF) << 12),
        )
    }

    /// Wrap a raw framebuffer pixel
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw framebuffer pixel
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Narrow one 8-bit-per-channel RGBA sample to 4 bits per channel
    pub const fn from_rgba8888(sample: [u8; 4]) -> Self {
        Self::new(sample[0] >> 4, sample[1] >> 4, sample[2] >> 4, sample[3] >> 4)
    }

    pub const fn r(self) -> u8 {
        (self.0 & 0xF) as u8
    }

    pub const fn g(self) -> u8 {
        ((self.0 >> 4) & 0xF) as u8
    }

    pub const fn b(self) -> u8 {
        ((self.0 >> 8) & 0xF) as u8
    }

    pub const fn a(self) -> u8 {
        ((self.0 >> 12) & 0xF) as u8
    }

    /// Same color with another alpha
    pub const fn with_alpha(self, a: u8) -> Self {
        Self((self.0 & 0x0FFF) | ((a as u16 & 0xF) << 12))
    }

    /// Scale the alpha channel by an opacity in `[0.0, 1.0]` (truncating)
    pub fn with_opacity(self, opacity: f32) -> Self {
        let opacity = opacity.clamp(0.0, 1.0);
        let a = (f32::from(self.a()) * opacity) as u8;
        self.with_alpha(a)
    }

    /// Whether drawing this color can change a pixel
    pub const fn is_transparent(self) -> bool {
        self.a() == 0
    }
}

impl From<u16> for Color {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Color> for u16 {
    fn from(color: Color) -> Self {
        color.0
    }
}
