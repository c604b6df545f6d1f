#![no_main]

use arbitrary::Arbitrary;
use authenticator_gfx::{Color, FontSet, GlyphCache, Surface, TextStyle};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Pixel { x: i32, y: i32, raw: u16 },
    Rect { x: i32, y: i32, w: i32, h: i32, raw: u16 },
    Circle { x: i32, y: i32, radius: u16, filled: bool, raw: u16 },
    Bitmap { x: i32, y: i32, w: u8, h: u8, rgba: Vec<u8> },
    Text { text: String, x: i32, y: i32, size: u8, raw: u16, max_width: i32 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    height: u8,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let Ok(mut surface) = Surface::new(64, u32::from(input.height)) else {
        return;
    };
    let mut glyphs = GlyphCache::new(FontSet::placeholder());

    // No operation may write outside the buffer or panic
    for op in input.ops.into_iter().take(64) {
        match op {
            Op::Pixel { x, y, raw } => {
                if let Some(offset) = surface.pixel_offset(x, y) {
                    assert!(offset < surface.pixels().len());
                }
                surface.set_pixel_blend_dst(x, y, Color::from_raw(raw));
            }
            Op::Rect { x, y, w, h, raw } => {
                let color = Color::from_raw(raw);
                surface.draw_rect(x, y, w.clamp(-256, 256), h.clamp(-256, 256), color)
            }
            Op::Circle { x, y, radius, filled, raw } => {
                let color = Color::from_raw(raw);
                surface.draw_circle(x, y, radius % 256, filled, color)
            }
            Op::Bitmap { x, y, w, h, rgba } => {
                surface.draw_bitmap(x, y, u32::from(w), u32::from(h), &rgba)
            }
            Op::Text { text, x, y, size, raw, max_width } => {
                let style =
                    TextStyle::new(f32::from(size), Color::from_raw(raw)).max_width(max_width);
                surface.draw_string(&mut glyphs, &text, x, y, &style);
            }
        }
    }
});
