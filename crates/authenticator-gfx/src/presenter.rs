//! Overlay presentation
//!
//! The [`Presenter`] owns the platform layer (through a [`DisplayBackend`]),
//! the [`Surface`] drawn into and the [`GlyphCache`]. Drawing happens inside
//! a [`Frame`]: ending the frame, explicitly or by dropping it, waits for
//! vertical sync and hands the buffer to the backend.

use std::ops::{Deref, DerefMut};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::glyph::{FontSet, GlyphCache, SharedFontSource};
use crate::surface::{Surface, TextStyle};

/// Size and top-left position of the overlay layer on the physical display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerGeometry {
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
}

/// Platform display services the presenter needs
pub trait DisplayBackend {
    /// Create the overlay layer and its framebuffer
    fn open_layer(&mut self, geometry: &LayerGeometry) -> Result<()>;

    /// Load the shared system fonts
    fn load_fonts(&mut self) -> Result<FontSet>;

    /// Block until the next vertical blank
    fn wait_for_vsync(&mut self) -> Result<()>;

    /// Queue a finished frame for scan-out
    fn present(&mut self, pixels: &[u16]) -> Result<()>;

    /// Tear the layer down; must tolerate a layer that is already gone
    fn close_layer(&mut self);
}

/// State that exists only while the layer is open
struct ActiveLayer {
    surface: Surface,
    glyphs: GlyphCache,
}

/// Owns the overlay layer and everything drawn on it
pub struct Presenter<B: DisplayBackend> {
    backend: B,
    geometry: Option<LayerGeometry>,
    active: Option<ActiveLayer>,
    opacity: f32,
}

impl<B: DisplayBackend> Presenter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            geometry: None,
            active: None,
            opacity: 1.0,
        }
    }

    /// Open the layer and allocate the canvas
    ///
    /// Calling this again while initialized only records the new geometry;
    /// the layer and canvas are kept as they are.
    pub fn init(&mut self, width: u32, height: u32, x: i32, y: i32) -> Result<()> {
        Surface::validate_geometry(width, height)?;
        let geometry = LayerGeometry {
            width,
            height,
            x,
            y,
        };

        if self.active.is_some() {
            debug!("Presenter already initialized, updating geometry to {:?}", geometry);
            self.geometry = Some(geometry);
            return Ok(());
        }

        info!("Opening overlay layer {}x{} at ({}, {})", width, height, x, y);
        self.backend.open_layer(&geometry)?;

        let fonts = match self.backend.load_fonts() {
            Ok(fonts) => fonts,
            Err(e) => {
                warn!("Font loading failed, closing layer: {}", e);
                self.backend.close_layer();
                return Err(e);
            }
        };

        let mut surface = match Surface::new(width, height) {
            Ok(surface) => surface,
            Err(e) => {
                self.backend.close_layer();
                return Err(e);
            }
        };
        surface.set_opacity(self.opacity);

        self.active = Some(ActiveLayer {
            surface,
            glyphs: GlyphCache::new(fonts),
        });
        self.geometry = Some(geometry);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }

    /// Geometry of the last successful `init`
    pub fn geometry(&self) -> Option<LayerGeometry> {
        self.geometry
    }

    /// Opacity applied to bitmap blits, clamped to `[0, 1]`
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
        if let Some(active) = &mut self.active {
            active.surface.set_opacity(self.opacity);
        }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Begin drawing; `None` unless initialized
    pub fn start_frame(&mut self) -> Option<Frame<'_, B>> {
        let active = self.active.as_mut()?;
        Some(Frame {
            backend: &mut self.backend,
            surface: &mut active.surface,
            glyphs: &mut active.glyphs,
            ended: false,
        })
    }

    /// Close the layer and drop the canvas and glyph cache
    pub fn exit(&mut self) {
        if self.active.take().is_none() {
            return;
        }

        self.backend.close_layer();
        self.geometry = None;
        info!("Overlay layer closed");
    }

    /// Number of glyphs rasterized so far
    pub fn cached_glyphs(&self) -> usize {
        self.active.as_ref().map_or(0, |active| active.glyphs.len())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: DisplayBackend> Drop for Presenter<B> {
    fn drop(&mut self) {
        self.exit();
    }
}

/// Writable access to the canvas for one frame
///
/// Dereferences to the [`Surface`]. The frame is presented when it ends.
pub struct Frame<'a, B: DisplayBackend> {
    backend: &'a mut B,
    surface: &'a mut Surface,
    glyphs: &'a mut GlyphCache,
    ended: bool,
}

impl<B: DisplayBackend> Frame<'_, B> {
    /// Draw text through the presenter's glyph cache
    pub fn draw_string(&mut self, text: &str, x: i32, y: i32, style: &TextStyle) -> (u32, u32) {
        self.surface.draw_string(self.glyphs, text, x, y, style)
    }

    /// Size of `text` without drawing it
    pub fn measure_string(&mut self, text: &str, style: &TextStyle) -> (u32, u32) {
        self.surface.draw_string(self.glyphs, text, 0, 0, &style.measuring())
    }

    /// Make the whole canvas transparent
    pub fn clear_screen(&mut self) {
        self.surface.clear();
    }

    /// Wait for vsync and present
    pub fn end(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        self.ended = true;

        // Presenting without the vsync wait tears
        self.backend.wait_for_vsync()?;
        self.backend.present(self.surface.pixels())
    }
}

impl<B: DisplayBackend> Deref for Frame<'_, B> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        &*self.surface
    }
}

impl<B: DisplayBackend> DerefMut for Frame<'_, B> {
    fn deref_mut(&mut self) -> &mut Surface {
        &mut *self.surface
    }
}

impl<B: DisplayBackend> Drop for Frame<'_, B> {
    fn drop(&mut self) {
        if !self.ended {
            if let Err(e) = self.finish() {
                warn!("Failed to present frame: {}", e);
            }
        }
    }
}

/// Backend without a display
///
/// Keeps the last presented frame in memory. Fonts come from a
/// [`SharedFontSource`] when one is given, otherwise box glyphs are used.
#[derive(Default)]
pub struct HeadlessBackend {
    font_source: Option<Box<dyn SharedFontSource + Send>>,
    geometry: Option<LayerGeometry>,
    layers_opened: usize,
    frames_presented: usize,
    last_frame: Vec<u16>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font_source(source: impl SharedFontSource + Send + 'static) -> Self {
        Self {
            font_source: Some(Box::new(source)),
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn geometry(&self) -> Option<LayerGeometry> {
        self.geometry
    }

    /// Number of times a layer was created
    pub fn layers_opened(&self) -> usize {
        self.layers_opened
    }

    pub fn frames_presented(&self) -> usize {
        self.frames_presented
    }

    pub fn last_frame(&self) -> &[u16] {
        &self.last_frame
    }
}

impl DisplayBackend for HeadlessBackend {
    fn open_layer(&mut self, geometry: &LayerGeometry) -> Result<()> {
        self.geometry = Some(*geometry);
        self.layers_opened += 1;
        Ok(())
    }

    fn load_fonts(&mut self) -> Result<FontSet> {
        match &mut self.font_source {
            Some(source) => FontSet::load(source.as_mut()),
            None => Ok(FontSet::placeholder()),
        }
    }

    fn wait_for_vsync(&mut self) -> Result<()> {
        Ok(())
    }

    fn present(&mut self, pixels: &[u16]) -> Result<()> {
        self.last_frame.clear();
        self.last_frame.extend_from_slice(pixels);
        self.frames_presented += 1;
        Ok(())
    }

    fn close_layer(&mut self) {
        self.geometry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::error::GfxError;

    #[derive(Default)]
    struct RecordingBackend {
        events: Vec<&'static str>,
        fail_open: bool,
        fail_fonts: bool,
        fail_vsync: bool,
        presented: Vec<Vec<u16>>,
    }

    impl RecordingBackend {
        fn count(&self, event: &str) -> usize {
            self.events.iter().filter(|e| **e == event).count()
        }
    }

    impl DisplayBackend for RecordingBackend {
        fn open_layer(&mut self, _geometry: &LayerGeometry) -> Result<()> {
            if self.fail_open {
                return Err(GfxError::Display("no layer".to_string()));
            }
            self.events.push("open");
            Ok(())
        }

        fn load_fonts(&mut self) -> Result<FontSet> {
            if self.fail_fonts {
                return Err(GfxError::Font("no fonts".to_string()));
            }
            self.events.push("fonts");
            Ok(FontSet::placeholder())
        }

        fn wait_for_vsync(&mut self) -> Result<()> {
            if self.fail_vsync {
                return Err(GfxError::Display("vsync lost".to_string()));
            }
            self.events.push("vsync");
            Ok(())
        }

        fn present(&mut self, pixels: &[u16]) -> Result<()> {
            self.events.push("present");
            self.presented.push(pixels.to_vec());
            Ok(())
        }

        fn close_layer(&mut self) {
            self.events.push("close");
        }
    }

    fn initialized() -> Presenter<RecordingBackend> {
        let mut presenter = Presenter::new(RecordingBackend::default());
        presenter.init(128, 64, 10, 20).unwrap();
        presenter
    }

    #[test]
    fn test_init_opens_layer_and_loads_fonts() {
        let presenter = initialized();

        assert!(presenter.is_initialized());
        assert_eq!(presenter.backend().events, vec!["open", "fonts"]);
        assert_eq!(
            presenter.geometry(),
            Some(LayerGeometry {
                width: 128,
                height: 64,
                x: 10,
                y: 20
            })
        );
    }

    #[test]
    fn test_init_rejects_bad_width() {
        let mut presenter = Presenter::new(RecordingBackend::default());

        assert!(matches!(
            presenter.init(100, 64, 0, 0),
            Err(GfxError::InvalidGeometry { .. })
        ));
        assert!(!presenter.is_initialized());
        assert!(presenter.backend().events.is_empty());
    }

    #[test]
    fn test_reinit_only_updates_geometry() {
        let mut presenter = initialized();
        presenter.init(256, 128, 0, 0).unwrap();

        assert_eq!(presenter.backend().count("open"), 1);
        assert_eq!(presenter.geometry().map(|g| g.width), Some(256));

        let frame = presenter.start_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (128, 64));
    }

    #[test]
    fn test_vsync_failure_skips_present() {
        let mut presenter = initialized();
        presenter.backend_mut().fail_vsync = true;

        let frame = presenter.start_frame().unwrap();
        assert!(matches!(frame.end(), Err(GfxError::Display(_))));
        {
            let _dropped = presenter.start_frame().unwrap();
        }

        assert_eq!(presenter.backend().count("present"), 0);
        assert!(presenter.backend().presented.is_empty());
    }

    #[test]
    fn test_font_failure_closes_layer() {
        let mut presenter = Presenter::new(RecordingBackend {
            fail_fonts: true,
            ..Default::default()
        });

        assert!(matches!(presenter.init(64, 64, 0, 0), Err(GfxError::Font(_))));
        assert!(!presenter.is_initialized());
        assert!(presenter.geometry().is_none());
        assert_eq!(presenter.backend().events, vec!["open", "close"]);
    }

    #[test]
    fn test_open_failure_leaves_uninitialized() {
        let mut presenter = Presenter::new(RecordingBackend {
            fail_open: true,
            ..Default::default()
        });

        assert!(matches!(presenter.init(64, 64, 0, 0), Err(GfxError::Display(_))));
        assert!(!presenter.is_initialized());
        assert!(presenter.start_frame().is_none());
    }

    #[test]
    fn test_no_frame_before_init() {
        let mut presenter = Presenter::new(RecordingBackend::default());
        assert!(presenter.start_frame().is_none());
    }

    #[test]
    fn test_frame_end_waits_for_vsync_then_presents() {
        let mut presenter = initialized();

        let mut frame = presenter.start_frame().unwrap();
        frame.set_pixel(0, 0, Color::WHITE);
        frame.end().unwrap();

        let backend = presenter.backend();
        assert_eq!(backend.events, vec!["open", "fonts", "vsync", "present"]);
        assert_eq!(backend.presented.len(), 1);
        assert_eq!(backend.presented[0][0], Color::WHITE.raw());
    }

    #[test]
    fn test_dropped_frame_is_presented() {
        let mut presenter = initialized();
        {
            let mut frame = presenter.start_frame().unwrap();
            frame.clear_screen();
        }
        assert_eq!(presenter.backend().count("present"), 1);
    }

    #[test]
    fn test_clear_screen() {
        let mut presenter = initialized();

        let mut frame = presenter.start_frame().unwrap();
        frame.fill(Color::WHITE);
        frame.clear_screen();
        frame.end().unwrap();

        assert!(presenter.backend().presented[0].iter().all(|p| *p == 0));
    }

    #[test]
    fn test_exit() {
        let mut presenter = initialized();
        presenter.exit();

        assert!(!presenter.is_initialized());
        assert!(presenter.geometry().is_none());
        assert_eq!(presenter.backend().count("close"), 1);

        presenter.exit();
        assert_eq!(presenter.backend().count("close"), 1);
    }

    #[test]
    fn test_exit_without_init_is_noop() {
        let mut presenter = Presenter::new(RecordingBackend::default());
        presenter.exit();
        assert!(presenter.backend().events.is_empty());
    }

    #[test]
    fn test_opacity_carries_into_surface() {
        let mut presenter = Presenter::new(RecordingBackend::default());
        presenter.set_opacity(1.7);
        assert_eq!(presenter.opacity(), 1.0);

        presenter.set_opacity(0.25);
        presenter.init(64, 64, 0, 0).unwrap();
        assert_eq!(presenter.start_frame().unwrap().opacity(), 0.25);
    }

    #[test]
    fn test_frame_text_uses_cache() {
        let mut presenter = initialized();
        {
            let mut frame = presenter.start_frame().unwrap();
            let style = TextStyle::new(20.0, Color::WHITE);
            let measured = frame.measure_string("Hi", &style);
            let drawn = frame.draw_string("Hi", 0, 30, &style);
            assert_eq!(measured, drawn);
        }
        assert_eq!(presenter.cached_glyphs(), 2);
    }

    #[test]
    fn test_headless_backend_keeps_last_frame() {
        let mut presenter = Presenter::new(HeadlessBackend::new());
        presenter.init(64, 32, 0, 0).unwrap();
        {
            let mut frame = presenter.start_frame().unwrap();
            frame.set_pixel(0, 0, Color::BLACK);
        }

        let backend = presenter.backend();
        assert!(backend.is_open());
        assert_eq!(backend.frames_presented(), 1);
        assert_eq!(backend.last_frame().len(), 64 * 128);
        assert_eq!(backend.last_frame()[0], Color::BLACK.raw());

        presenter.exit();
        assert!(!presenter.backend().is_open());
    }
}
