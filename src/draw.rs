// Window + software drawing utilities.
// Visual effects provided here:
// 1) A window that shows the wafer photo, scaled to fit.
// 2) The green mask tint, red circle, blue die rectangle and pink die grid.
// 3) The live FFD grid with draggable control points while editing.
// 4) A tiny 5x7 bitmap font for the HUD line and die id characters.

use image::RgbImage;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::error::Error;
use crate::grid::DieGridCache;
use crate::mask::MaskRaster;
use crate::naming::name_of;
use crate::session::{InteractionMode, ModeKind, Session};
use crate::types::{FrameBuffer, GridIndex, ImageSize, Point};

const MASK_RGB: u32 = 0x00_00_FF_00;
const CIRCLE_RGB: u32 = 0x00_FF_00_00;
const REGION_RGB: u32 = 0x00_00_00_FF;
const DIE_RGB: u32 = 0x00_FF_69_B4;
const CLEAN_RGB: u32 = 0x00_00_FF_FF;
const MASKED_RGB: u32 = 0x00_00_00_FF;
const LIVE_RGB: u32 = 0x00_FF_00_00;
const SCP_RGB: u32 = 0x00_00_00_FF;
const SCP_ACTIVE_RGB: u32 = 0x00_FF_FF_00;
const HOVER_RGB: u32 = 0x00_00_FF_FF;
const HUD_RGB: u32 = 0x00_FF_FF_FF;

pub struct Drawer {
    window: Window, // the on-screen window you see
}

impl Drawer {
    /// Create a window of the fitted image size.
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Mouse position in window pixels, None while the pointer is outside.
    pub fn mouse_pos(&self) -> Option<(f32, f32)> {
        self.window.get_mouse_pos(MouseMode::Discard)
    }

    pub fn left_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }

    /// One-shot key press (held keys do not repeat).
    pub fn pressed_once(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }
}

/* ---------- Window <-> image coordinates ---------- */

/// Uniform fit-to-window scale. The pan/zoom of a full viewer is out of scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub scale: f64,
    pub screen_width: usize,
    pub screen_height: usize,
}

impl View {
    /// Largest scale (never above 1:1) that fits `image` into `max_w` x `max_h`.
    pub fn fit(image: ImageSize, max_w: usize, max_h: usize) -> Self {
        let sx = max_w as f64 / image.width.max(1) as f64;
        let sy = max_h as f64 / image.height.max(1) as f64;
        let scale = sx.min(sy).min(1.0);
        Self::with_scale(image, scale)
    }

    pub fn with_scale(image: ImageSize, scale: f64) -> Self {
        Self {
            scale,
            screen_width: ((image.width as f64 * scale).round() as usize).max(1),
            screen_height: ((image.height as f64 * scale).round() as usize).max(1),
        }
    }

    #[inline]
    pub fn to_image(&self, sx: f64, sy: f64) -> Point {
        Point::new(sx / self.scale, sy / self.scale)
    }

    #[inline]
    pub fn to_screen(&self, p: Point) -> (i32, i32) {
        ((p.x * self.scale).round() as i32, (p.y * self.scale).round() as i32)
    }
}

/// Nearest-neighbour resample of the photo into screen pixels (0x00RRGGBB).
pub fn scale_image(img: &RgbImage, view: &View) -> FrameBuffer {
    let mut fb = FrameBuffer::new(view.screen_width, view.screen_height);
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return fb;
    }
    for sy in 0..view.screen_height {
        let iy = (((sy as f64 + 0.5) / view.scale) as u32).min(h - 1);
        for sx in 0..view.screen_width {
            let ix = (((sx as f64 + 0.5) / view.scale) as u32).min(w - 1);
            let p = img.get_pixel(ix, iy);
            fb.pixels[sy * fb.width + sx] = ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32;
        }
    }
    fb
}

/// Unpack a framebuffer back into an RGB image (for the annotated export).
pub fn to_rgb_image(fb: &FrameBuffer) -> RgbImage {
    RgbImage::from_fn(fb.width as u32, fb.height as u32, |x, y| {
        let px = fb.pixels[y as usize * fb.width + x as usize];
        image::Rgb([(px >> 16) as u8, (px >> 8) as u8, px as u8])
    })
}

/* ---------- Scene rendering ---------- */

/// What to draw on top of the committed state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overlay {
    pub live_grid: bool,
    pub hover: Option<GridIndex>,
    pub hud: bool,
}

/// Compose one frame: photo, mask tint, annotations, grid, HUD.
pub fn render(fb: &mut FrameBuffer, base: &FrameBuffer, session: &Session, view: &View, overlay: Overlay) {
    fb.pixels.copy_from_slice(&base.pixels);
    tint_mask(fb, session.mask(), view);

    if let Some(c) = session.circle() {
        draw_circle(fb, view, c.center, c.radius, CIRCLE_RGB);
    }
    if let Some(r) = session.region() {
        let corners = [
            Point::new(r.x1, r.y1),
            Point::new(r.x2, r.y1),
            Point::new(r.x2, r.y2),
            Point::new(r.x1, r.y2),
        ];
        draw_polygon(fb, view, &corners, REGION_RGB);
    }
    if let Some(grid) = session.grid() {
        draw_committed(fb, view, &grid, session);
        if let Some(cell) = overlay.hover.and_then(|i| grid.get(i)) {
            draw_polygon(fb, view, &cell.polygon, HOVER_RGB);
            let shifted: Vec<Point> = cell.polygon.iter().map(|p| *p + Point::new(1.0 / view.scale, 0.0)).collect();
            draw_polygon(fb, view, &shifted, HOVER_RGB);
        }
    }
    if overlay.live_grid {
        draw_live(fb, view, session);
    }
    if overlay.hud {
        let mut hud = format!("{} | BRUSH {:.0}", session.mode().kind().label(), session.brush_width());
        if session.has_pending_edits() {
            hud.push_str(" | ENTER: APPLY GRID");
        }
        draw_text_5x7(fb, 8, 8, &hud, HUD_RGB);
    }
}

/// Green at the mask's own alpha, the way it is painted.
/// Visual: masked areas look translucent green.
fn tint_mask(fb: &mut FrameBuffer, mask: &MaskRaster, view: &View) {
    let size = mask.size();
    if size.is_empty() {
        return;
    }
    let alpha = mask.alpha();
    for sy in 0..fb.height {
        let iy = (((sy as f64 + 0.5) / view.scale) as usize).min(size.height - 1);
        for sx in 0..fb.width {
            let ix = (((sx as f64 + 0.5) / view.scale) as usize).min(size.width - 1);
            let a = alpha[iy * size.width + ix];
            if a == 0 {
                continue;
            }
            let idx = sy * fb.width + sx;
            fb.pixels[idx] = blend(fb.pixels[idx], MASK_RGB, a);
        }
    }
}

#[inline]
fn blend(dst: u32, src: u32, a: u8) -> u32 {
    let a = a as u32;
    let inv = 255 - a;
    let ch = |shift: u32| ((((src >> shift) & 0xFF) * a + ((dst >> shift) & 0xFF) * inv) / 255) << shift;
    ch(16) | ch(8) | ch(0)
}

fn draw_committed(fb: &mut FrameBuffer, view: &View, grid: &DieGridCache, session: &Session) {
    let circle = session.circle();
    for cell in grid.cells() {
        if circle.is_some_and(|c| !c.contains(cell.centroid)) {
            continue;
        }
        draw_polygon(fb, view, &cell.polygon, DIE_RGB);

        let color = if session.mask().is_masked(cell.centroid) { MASKED_RGB } else { CLEAN_RGB };
        let (cx, cy) = view.to_screen(cell.centroid);
        // Die id character when the cell is big enough on screen, else a dot.
        let cell_px = cell.polygon[0].dist(cell.polygon[1]) * view.scale;
        let id = name_of(cell.index, session.origin()).chars().next().unwrap_or(' ');
        if cell_px >= 10.0 && id != ' ' {
            draw_char_5x7(fb, cx - 2, cy - 3, id, color);
        } else {
            fill_square(fb, cx, cy, 1, color);
        }
    }
}

fn draw_live(fb: &mut FrameBuffer, view: &View, session: &Session) {
    let Some(mesh) = session.mesh() else {
        return;
    };
    let (max_c, max_r) = (mesh.max_c(), mesh.max_r());
    // Columns, then rows.
    for c in 0..=max_c {
        for r in 0..max_r {
            if let (Some(a), Some(b)) = (mesh.point(c, r), mesh.point(c, r + 1)) {
                draw_segment(fb, view, a, b, LIVE_RGB);
            }
        }
    }
    for r in 0..=max_r {
        for c in 0..max_c {
            if let (Some(a), Some(b)) = (mesh.point(c, r), mesh.point(c + 1, r)) {
                draw_segment(fb, view, a, b, LIVE_RGB);
            }
        }
    }

    let active = match session.mode() {
        InteractionMode::GridEdit { active } => *active,
        _ => None,
    };
    for (idx, p) in mesh.control_points() {
        let (sx, sy) = view.to_screen(p);
        fill_square(fb, sx, sy, 5, HUD_RGB);
        let color = if Some(idx) == active { SCP_ACTIVE_RGB } else { SCP_RGB };
        fill_square(fb, sx, sy, 3, color);
    }
}

/// Whether the live grid belongs on screen for this mode.
pub fn shows_live_grid(kind: ModeKind) -> bool {
    kind == ModeKind::GridEdit
}

/* ---------- Software drawing: pixels, lines, shapes, tiny bitmap font ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    fb.pixels[y * fb.width + x] = color;
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// Image-space segment. Segments far off screen are skipped.
fn draw_segment(fb: &mut FrameBuffer, view: &View, a: Point, b: Point, color: u32) {
    let (x0, y0) = view.to_screen(a);
    let (x1, y1) = view.to_screen(b);
    let limit = 4 * (fb.width.max(fb.height) as i32);
    if [x0, y0, x1, y1].iter().any(|v| v.abs() > limit) {
        return;
    }
    draw_line(fb, x0, y0, x1, y1, color);
}

/// Closed outline through `pts` (image space).
fn draw_polygon(fb: &mut FrameBuffer, view: &View, pts: &[Point], color: u32) {
    for (i, &a) in pts.iter().enumerate() {
        let b = pts[(i + 1) % pts.len()];
        draw_segment(fb, view, a, b, color);
    }
}

fn draw_circle(fb: &mut FrameBuffer, view: &View, center: Point, radius: f64, color: u32) {
    let steps = ((radius * view.scale).ceil() as usize).clamp(64, 2048);
    let at = |i: usize| {
        let t = i as f64 / steps as f64 * std::f64::consts::TAU;
        center + Point::new(t.cos(), t.sin()) * radius
    };
    for i in 0..steps {
        draw_segment(fb, view, at(i), at(i + 1), color);
    }
}

/// Filled square of half-size `r` centered at screen (cx,cy).
fn fill_square(fb: &mut FrameBuffer, cx: i32, cy: i32, r: i32, color: u32) {
    for y in (cy - r)..=(cy + r) {
        for x in (cx - r)..=(cx + r) {
            put_pixel(fb, x, y, color);
        }
    }
}

/* ---------- 5x7 bitmap font (uppercase, digits, a little punctuation) ---------- */

/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '_' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b11111),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y) with a 1-pixel black shadow.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    if let Some(rows) = glyph5x7(ch) {
        // Shadow pass offset by (1,1), then the glyph itself.
        for (ox, oy, c) in [(1, 1, 0x00000000), (0, 0, color)] {
            for (ry, rowbits) in rows.iter().enumerate() {
                for rx in 0..5 {
                    if (rowbits & (1 << (4 - rx))) != 0 {
                        put_pixel(fb, x + rx + ox, y + ry as i32 + oy, c);
                    }
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs (5 px glyph + 1 px spacing).
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += 6;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegionRect;

    #[test]
    fn view_fits_and_round_trips() {
        let v = View::fit(ImageSize::new(4000, 2000), 1200, 800);
        assert_eq!(v.scale, 0.3);
        assert_eq!((v.screen_width, v.screen_height), (1200, 600));
        let p = v.to_image(300.0, 150.0);
        assert_eq!(v.to_screen(p), (300, 150));
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let v = View::fit(ImageSize::new(800, 600), 1200, 800);
        assert_eq!(v.scale, 1.0);
    }

    #[test]
    fn blend_mixes_channels() {
        assert_eq!(blend(0x00_00_00_00, 0x00_00_FF_00, 255), 0x00_00_FF_00);
        assert_eq!(blend(0x00_12_34_56, 0x00_00_FF_00, 0), 0x00_12_34_56);
        assert_eq!(blend(0x00_00_00_00, 0x00_00_FF_00, 128) & 0xFF00, 128 << 8);
    }

    #[test]
    fn render_tints_masked_pixels_and_draws_grid() {
        let size = ImageSize::new(200, 200);
        let mut s = Session::new(size, None);
        s.fit_circle(Point::new(20.0, 100.0), Point::new(100.0, 20.0), Point::new(180.0, 100.0)).unwrap();
        s.set_region(RegionRect { x1: 0.0, y1: 0.0, x2: 40.0, y2: 40.0 }).unwrap();
        s.paint_stroke(Point::new(100.0, 100.0), Point::new(100.0, 100.0));

        let view = View::with_scale(size, 1.0);
        let base = FrameBuffer::new(200, 200);
        let mut fb = FrameBuffer::new(200, 200);
        render(&mut fb, &base, &s, &view, Overlay { live_grid: false, hover: None, hud: true });

        // Masked pixel near the stroke center picks up green.
        assert_eq!(fb.pixels[103 * 200 + 97] & 0xFF00, 128 << 8);
        // Some grid outline made it onto the frame.
        assert!(fb.pixels.iter().any(|&p| p == DIE_RGB));
        // HUD shadow + text in the corner.
        assert!(fb.pixels[..20 * 200].iter().any(|&p| p == HUD_RGB));
    }

    #[test]
    fn rgb_export_round_trips_pixels() {
        let mut fb = FrameBuffer::new(2, 1);
        fb.pixels = vec![0x00_11_22_33, 0x00_AA_BB_CC];
        let img = to_rgb_image(&fb);
        assert_eq!(img.get_pixel(1, 0).0, [0xAA, 0xBB, 0xCC]);
    }
}
