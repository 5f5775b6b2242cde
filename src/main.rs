// What you SEE:
// • The wafer photo, fitted into the window.
// • 1: circle (click 3 rim points)   2: die size (drag a rectangle)
//   3: mask (paint with LMB)         4: edit the FFD grid (drag blue points)
//   5: naming origin (click a die)   0: idle (hover highlights a die)
// • Enter applies the grid, R resets the control points, C clears the mask,
//   [ and ] change the brush, P writes the report, S saves an annotated PNG.
// • ESC quits.

use std::path::{Path, PathBuf};

use clap::Parser;
use image::RgbImage;
use log::{error, info, warn};
use minifb::Key;

use wafer_die_mesh::config::Config;
use wafer_die_mesh::draw::{self, Drawer, Overlay, View};
use wafer_die_mesh::report::{report_path_for, write_report};
use wafer_die_mesh::session::{ModeKind, Session};
use wafer_die_mesh::types::{FrameBuffer, ImageSize};
use wafer_die_mesh::{Error, logger};

const PLACEHOLDER_SIZE: (u32, u32) = (800, 600);
const PLACEHOLDER_GREY: [u8; 3] = [169, 169, 169];
const BRUSH_STEP: f64 = 5.0;

fn main() -> Result<(), Error> {
    let cfg = Config::parse();
    if let Some(path) = logger::init(cfg.log_level) {
        info!("session log: {}", path.display());
    }

    /* --- Image + session ---
       Visual: nothing yet; we hold the photo and an empty annotation session. */
    let photo = load_photo(cfg.image.as_deref())?;
    let size = ImageSize::new(photo.width() as usize, photo.height() as usize);
    let mut session = Session::new(size, cfg.image.as_deref());
    session.set_brush_width(cfg.brush);

    /* --- Window + reusable buffers ---
       Visual: the window opens showing the photo. */
    let view = View::fit(size, cfg.window.width, cfg.window.height);
    let mut drawer = Drawer::new("Wafer Die Mesh", view.screen_width, view.screen_height)?;
    let base = draw::scale_image(&photo, &view);
    let mut screen = FrameBuffer::new(view.screen_width, view.screen_height);

    let mut was_down = false;

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        /* 1) Keyboard: tools and actions. */
        for (key, kind) in [
            (Key::Key0, ModeKind::Idle),
            (Key::Key1, ModeKind::Circle),
            (Key::Key2, ModeKind::Rectangle),
            (Key::Key3, ModeKind::Mask),
            (Key::Key4, ModeKind::GridEdit),
            (Key::Key5, ModeKind::Origin),
        ] {
            if drawer.pressed_once(key) {
                report_err(session.set_mode(kind));
            }
        }
        if drawer.pressed_once(Key::Enter) {
            report_err(session.commit().map(|_| ()));
        }
        if drawer.pressed_once(Key::R) {
            report_err(session.reset_mesh());
        }
        if drawer.pressed_once(Key::C) {
            session.clear_mask();
        }
        if drawer.pressed_once(Key::LeftBracket) {
            session.set_brush_width(session.brush_width() - BRUSH_STEP);
        }
        if drawer.pressed_once(Key::RightBracket) {
            session.set_brush_width(session.brush_width() + BRUSH_STEP);
        }
        if drawer.pressed_once(Key::P) {
            report_err(save_report(&session, cfg.report.as_deref()));
        }
        if drawer.pressed_once(Key::S) {
            report_err(save_annotated(&session, &photo));
        }

        /* 2) Pointer: press / drag / release, in image coordinates. */
        let pointer = drawer.mouse_pos().map(|(x, y)| view.to_image(x as f64, y as f64));
        let down = drawer.left_mouse_down();
        if let Some(p) = pointer {
            let result = match (was_down, down) {
                (false, true) => session.pointer_down(p),
                (true, true) => session.pointer_move(p),
                (true, false) => session.pointer_up(p),
                (false, false) => Ok(()),
            };
            report_err(result);
        }
        was_down = down;

        /* 3) Compose the frame. Hover highlight only while idle. */
        let kind = session.mode().kind();
        let hover = match (kind, pointer) {
            (ModeKind::Idle, Some(p)) => session.nearest_die(p),
            _ => None,
        };
        let overlay = Overlay { live_grid: draw::shows_live_grid(kind), hover, hud: true };
        draw::render(&mut screen, &base, &session, &view, overlay);

        /* 4) Present to the window. */
        drawer.present(&screen)?;
    }

    Ok(())
}

/// The photo, or a flat grey placeholder when no path was given.
fn load_photo(path: Option<&Path>) -> Result<RgbImage, Error> {
    match path {
        Some(p) => Ok(image::open(p)?.to_rgb8()),
        None => {
            let (w, h) = PLACEHOLDER_SIZE;
            Ok(RgbImage::from_pixel(w, h, image::Rgb(PLACEHOLDER_GREY)))
        }
    }
}

fn save_report(session: &Session, target: Option<&Path>) -> Result<(), Error> {
    let report = session.generate_report()?;
    let path = target.map(Path::to_path_buf).unwrap_or_else(|| report_path_for(session.image_path()));
    write_report(&report, &path)?;
    println!("{report}");
    Ok(())
}

/// Full-resolution render of the committed state (no HUD, no live grid).
fn save_annotated(session: &Session, photo: &RgbImage) -> Result<(), Error> {
    let view = View::with_scale(session.image_size(), 1.0);
    let base = draw::scale_image(photo, &view);
    let mut fb = FrameBuffer::new(view.screen_width, view.screen_height);
    draw::render(&mut fb, &base, session, &view, Overlay::default());

    let path = annotated_path_for(session.image_path());
    draw::to_rgb_image(&fb).save(&path)?;
    info!("annotated image saved to {}", path.display());
    Ok(())
}

fn annotated_path_for(image_path: Option<&Path>) -> PathBuf {
    match image_path.and_then(|p| p.file_stem().map(|s| (p, s))) {
        Some((p, stem)) => p.with_file_name(format!("{}_annotated.png", stem.to_string_lossy())),
        None => PathBuf::from("annotated.png"),
    }
}

/// Errors are shown, never fatal: the last committed state stays in charge.
fn report_err(result: Result<(), Error>) {
    if let Err(e) = result {
        match e {
            Error::ReportWrite(_) | Error::ImageLoad(_) => error!("{e}"),
            _ => warn!("{e}"),
        }
    }
}
