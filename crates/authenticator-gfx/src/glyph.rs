//! Glyph rasterization and caching
//!
//! Text is drawn from three shared system fonts: the standard font, an
//! optional localized font for languages with a non-Latin script, and an
//! extension font carrying button and icon symbols. The [`GlyphCache`]
//! picks a font per code point, rasterizes the glyph once and keeps it for
//! the lifetime of the presenter. Entries are never evicted.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{GfxError, Result};

/// A font engine as seen by the glyph cache
pub trait Typeface: Send {
    /// Whether the font has a glyph for `c`
    fn has_glyph(&self, c: char) -> bool;

    /// Scale factor mapping font units to pixels so that ascent - descent
    /// spans `height` pixels
    fn scale_for_pixel_height(&self, height: f32) -> f32;

    /// Horizontal advance of `c` in font units
    fn h_advance(&self, c: char) -> i32;

    /// Rasterize `c` at `scale` into 8-bit coverage
    fn rasterize(&self, c: char, scale: f32) -> RasterizedGlyph;
}

/// Output of [`Typeface::rasterize`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterizedGlyph {
    /// `(x0, y0, x1, y1)` relative to the pen position and baseline, y down
    pub bounds: [i32; 4],
    pub width: usize,
    pub height: usize,
    /// Row-major coverage, `width * height` bytes
    pub coverage: Vec<u8>,
}

/// [`Typeface`] backed by a parsed TrueType/OpenType font
pub struct FontdueTypeface {
    font: fontdue::Font,
    units_per_em: f32,
    /// Ascent minus descent, in font units
    line_height: f32,
}

impl FontdueTypeface {
    /// Parse a font file
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(|e| GfxError::Font(e.to_string()))?;

        let units_per_em = font.units_per_em();
        let line_height = font
            .horizontal_line_metrics(units_per_em)
            .map(|lm| lm.ascent - lm.descent)
            .filter(|h| *h > 0.0)
            .unwrap_or(units_per_em);

        Ok(Self {
            font,
            units_per_em,
            line_height,
        })
    }
}

impl Typeface for FontdueTypeface {
    fn has_glyph(&self, c: char) -> bool {
        self.font.lookup_glyph_index(c) != 0
    }

    fn scale_for_pixel_height(&self, height: f32) -> f32 {
        height / self.line_height
    }

    fn h_advance(&self, c: char) -> i32 {
        // Metrics at one pixel per font unit are the unscaled metrics
        self.font.metrics(c, self.units_per_em).advance_width.round() as i32
    }

    fn rasterize(&self, c: char, scale: f32) -> RasterizedGlyph {
        let (metrics, coverage) = self.font.rasterize(c, scale * self.units_per_em);
        let width = metrics.width as i32;
        let height = metrics.height as i32;

        RasterizedGlyph {
            bounds: [
                metrics.xmin,
                -(metrics.ymin + height),
                metrics.xmin + width,
                -metrics.ymin,
            ],
            width: metrics.width,
            height: metrics.height,
            coverage,
        }
    }
}

/// Placeholder typeface drawing every glyph as a box
///
/// Stands in for the shared fonts where no font data is available, such as
/// headless runs. The box is solid with a half-covered one-pixel border.
#[derive(Debug, Clone, Default)]
pub struct BoxTypeface {
    /// Restrict the glyph set; `None` covers every non-control character
    glyphs: Option<Vec<char>>,
}

impl BoxTypeface {
    const UNITS_PER_EM: f32 = 1000.0;
    const ADVANCE: i32 = 600;
    const BOX_LEFT: f32 = 50.0;
    const BOX_RIGHT: f32 = 550.0;
    const BOX_TOP: f32 = 700.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// A box font that only has glyphs for the given characters
    pub fn with_glyphs(glyphs: impl IntoIterator<Item = char>) -> Self {
        Self {
            glyphs: Some(glyphs.into_iter().collect()),
        }
    }
}

impl Typeface for BoxTypeface {
    fn has_glyph(&self, c: char) -> bool {
        match &self.glyphs {
            Some(glyphs) => glyphs.contains(&c),
            None => !c.is_control(),
        }
    }

    fn scale_for_pixel_height(&self, height: f32) -> f32 {
        height / Self::UNITS_PER_EM
    }

    fn h_advance(&self, _c: char) -> i32 {
        Self::ADVANCE
    }

    fn rasterize(&self, c: char, scale: f32) -> RasterizedGlyph {
        if !self.has_glyph(c) || scale <= 0.0 {
            return RasterizedGlyph::default();
        }

        let x0 = (Self::BOX_LEFT * scale).floor() as i32;
        let x1 = (Self::BOX_RIGHT * scale).ceil() as i32;
        let y0 = (-Self::BOX_TOP * scale).floor() as i32;
        let width = (x1 - x0).max(0) as usize;
        let height = (-y0).max(0) as usize;

        let mut coverage = vec![0xFF; width * height];
        for y in 0..height {
            for x in 0..width {
                if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                    coverage[y * width + x] = 0x80;
                }
            }
        }

        RasterizedGlyph {
            bounds: [x0, y0, x1, 0],
            width,
            height,
            coverage,
        }
    }
}

/// Shared system fonts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharedFontKind {
    Standard,
    ChineseSimplified,
    ChineseTraditional,
    Korean,
    /// Button glyphs and icons
    Extension,
}

impl SharedFontKind {
    /// File name used by [`FileFontSource`]
    pub fn file_name(&self) -> &'static str {
        match self {
            SharedFontKind::Standard => "standard.ttf",
            SharedFontKind::ChineseSimplified => "chinese_simplified.ttf",
            SharedFontKind::ChineseTraditional => "chinese_traditional.ttf",
            SharedFontKind::Korean => "korean.ttf",
            SharedFontKind::Extension => "extension.ttf",
        }
    }

    /// Localized font needed for a system language, if any
    pub fn localized_for(language: &str) -> Option<Self> {
        match language {
            "zh-CN" | "zh-Hans" => Some(SharedFontKind::ChineseSimplified),
            "zh-TW" | "zh-Hant" => Some(SharedFontKind::ChineseTraditional),
            "ko" => Some(SharedFontKind::Korean),
            _ => None,
        }
    }
}

/// Where the shared fonts and the system language come from
pub trait SharedFontSource {
    fn load_font(&mut self, kind: SharedFontKind) -> Result<Box<dyn Typeface>>;

    /// System language code (`"en-US"`, `"zh-Hans"`, ...), if it can be read
    fn system_language(&mut self) -> Option<String>;
}

/// Loads the shared fonts from a directory of font files
#[derive(Debug, Clone)]
pub struct FileFontSource {
    directory: PathBuf,
    language: Option<String>,
}

impl FileFontSource {
    pub fn new(directory: impl Into<PathBuf>, language: Option<String>) -> Self {
        Self {
            directory: directory.into(),
            language,
        }
    }
}

impl SharedFontSource for FileFontSource {
    fn load_font(&mut self, kind: SharedFontKind) -> Result<Box<dyn Typeface>> {
        let path = self.directory.join(kind.file_name());
        let data = fs::read(&path)
            .map_err(|e| GfxError::Font(format!("cannot read {}: {}", path.display(), e)))?;
        let typeface = FontdueTypeface::from_bytes(&data)?;
        debug!("Loaded {:?} font from {}", kind, path.display());
        Ok(Box::new(typeface))
    }

    fn system_language(&mut self) -> Option<String> {
        self.language.clone()
    }
}

/// Which font of the set a glyph was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontSlot {
    Primary,
    Localized,
    Extension,
}

/// The fonts text is drawn with
pub struct FontSet {
    primary: Box<dyn Typeface>,
    localized: Option<Box<dyn Typeface>>,
    extension: Box<dyn Typeface>,
}

impl FontSet {
    pub fn new(
        primary: Box<dyn Typeface>,
        localized: Option<Box<dyn Typeface>>,
        extension: Box<dyn Typeface>,
    ) -> Self {
        Self {
            primary,
            localized,
            extension,
        }
    }

    /// Box glyphs for every slot; used when no font data is available
    pub fn placeholder() -> Self {
        Self::new(
            Box::new(BoxTypeface::new()),
            None,
            Box::new(BoxTypeface::with_glyphs(Vec::<char>::new())),
        )
    }

    /// Load the standard and extension fonts, plus the localized font the
    /// system language needs
    pub fn load(source: &mut dyn SharedFontSource) -> Result<Self> {
        let primary = source.load_font(SharedFontKind::Standard)?;

        let language = source.system_language();
        let localized = match language.as_deref().and_then(SharedFontKind::localized_for) {
            Some(kind) => match source.load_font(kind) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!("Localized font {:?} unavailable: {}", kind, e);
                    None
                }
            },
            None => None,
        };

        let extension = source.load_font(SharedFontKind::Extension)?;

        info!(
            "Fonts loaded (language: {}, localized: {})",
            language.as_deref().unwrap_or("unknown"),
            localized.is_some()
        );
        Ok(Self::new(primary, localized, extension))
    }

    pub fn has_localized(&self) -> bool {
        self.localized.is_some()
    }

    /// Font a code point is drawn with
    ///
    /// The extension font wins whenever it has the glyph. The localized
    /// font is used only for what the standard font lacks.
    pub fn select(&self, c: char) -> FontSlot {
        if self.extension.has_glyph(c) {
            FontSlot::Extension
        } else if self.localized.is_some() && !self.primary.has_glyph(c) {
            FontSlot::Localized
        } else {
            FontSlot::Primary
        }
    }

    pub fn get(&self, slot: FontSlot) -> &dyn Typeface {
        match slot {
            FontSlot::Primary => self.primary.as_ref(),
            FontSlot::Localized => self
                .localized
                .as_deref()
                .unwrap_or(self.primary.as_ref()),
            FontSlot::Extension => self.extension.as_ref(),
        }
    }
}

/// A rasterized glyph with 4-bit coverage
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub slot: FontSlot,
    /// Font units to pixels
    pub scale: f32,
    /// `(x0, y0, x1, y1)` relative to the pen position and baseline
    pub bounds: [i32; 4],
    /// Horizontal advance in font units
    pub advance: i32,
    pub width: usize,
    pub height: usize,
    /// Row-major coverage, 0-15
    pub coverage: Vec<u8>,
}

impl Glyph {
    /// Advance in whole pixels (truncated)
    pub fn advance_px(&self) -> i32 {
        (self.advance as f32 * self.scale) as i32
    }

    /// Whether there is anything to draw
    pub fn has_bitmap(&self) -> bool {
        !self.coverage.is_empty()
    }

    pub fn coverage_at(&self, x: usize, y: usize) -> u8 {
        self.coverage.get(y * self.width + x).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GlyphKey {
    codepoint: char,
    monospace: bool,
    size_bits: u32,
}

/// Rasterize-once glyph store
pub struct GlyphCache {
    fonts: FontSet,
    glyphs: HashMap<GlyphKey, Glyph>,
}

impl GlyphCache {
    pub fn new(fonts: FontSet) -> Self {
        Self {
            fonts,
            glyphs: HashMap::new(),
        }
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    /// Glyph for a code point at a pixel height, rasterizing it on first use
    pub fn resolve(&mut self, codepoint: char, monospace: bool, font_size: f32) -> &Glyph {
        let key = GlyphKey {
            codepoint,
            monospace,
            size_bits: font_size.to_bits(),
        };

        match self.glyphs.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(Self::rasterize(&self.fonts, codepoint, monospace, font_size))
            }
        }
    }

    fn rasterize(fonts: &FontSet, codepoint: char, monospace: bool, font_size: f32) -> Glyph {
        let slot = fonts.select(codepoint);
        let font = fonts.get(slot);

        let scale = font.scale_for_pixel_height(font_size);
        let advance = font.h_advance(if monospace { 'W' } else { codepoint });
        let raster = font.rasterize(codepoint, scale);

        Glyph {
            slot,
            scale,
            bounds: raster.bounds,
            advance,
            width: raster.width,
            height: raster.height,
            coverage: raster.coverage.iter().map(|c| c >> 4).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}
