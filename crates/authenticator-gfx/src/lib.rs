//! Authenticator Gfx - Software renderer for the authentication overlay
//!
//! Draws into a 16-bit RGBA4444 framebuffer laid out in the display's
//! block-tiled format, rasterizes text through a per-presenter glyph cache
//! and hands finished frames to a pluggable [`DisplayBackend`].

pub mod color;
pub mod error;
pub mod glyph;
pub mod presenter;
pub mod surface;

pub use color::Color;
pub use error::{GfxError, Result};
pub use glyph::{
    BoxTypeface, FileFontSource, FontSet, FontSlot, FontdueTypeface, Glyph, GlyphCache,
    RasterizedGlyph, SharedFontKind, SharedFontSource, Typeface,
};
pub use presenter::{DisplayBackend, Frame, HeadlessBackend, LayerGeometry, Presenter};
pub use surface::{blend_color, Surface, TextStyle, BLOCK_BAND_HEIGHT, WIDTH_ALIGNMENT};
