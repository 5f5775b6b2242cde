// End-to-end annotation session driven the way the window drives it:
// mode switches plus pointer press / drag / release in image coordinates.

use std::fs;
use std::path::Path;

use wafer_die_mesh::hit::tolerance_sq;
use wafer_die_mesh::naming::name_of;
use wafer_die_mesh::report::{report_path_for, write_report};
use wafer_die_mesh::{Error, GridIndex, ImageSize, ModeKind, Point, Session};

fn click(s: &mut Session, x: f64, y: f64) {
    let p = Point::new(x, y);
    s.pointer_down(p).unwrap();
    s.pointer_up(p).unwrap();
}

fn drag(s: &mut Session, from: Point, to: Point) -> Result<(), Error> {
    s.pointer_down(from)?;
    s.pointer_move(from.lerp(to, 0.5))?;
    s.pointer_move(to)?;
    s.pointer_up(to)
}

/// Circle through three rim clicks, then a 100x50 die rectangle.
fn annotated_session() -> Session {
    let mut s = Session::new(ImageSize::new(1000, 1000), Some(Path::new("wafer.png")));

    s.set_mode(ModeKind::Circle).unwrap();
    click(&mut s, 100.0, 500.0);
    click(&mut s, 500.0, 100.0);
    click(&mut s, 900.0, 500.0);
    let circle = *s.circle().unwrap();
    assert!((circle.center.x - 500.0).abs() < 1e-9 && (circle.center.y - 500.0).abs() < 1e-9);
    assert!((circle.radius - 400.0).abs() < 1e-9);

    s.set_mode(ModeKind::Rectangle).unwrap();
    drag(&mut s, Point::new(0.0, 0.0), Point::new(100.0, 50.0)).unwrap();
    s.set_mode(ModeKind::Idle).unwrap();
    s
}

#[test]
fn region_and_circle_yield_committed_grid() {
    let s = annotated_session();
    let grid = s.grid().unwrap();
    assert_eq!((grid.max_c(), grid.max_r()), (8, 16));
    assert_eq!(grid.len(), 8 * 16);
    assert!(!s.has_pending_edits());
}

#[test]
fn masking_a_die_moves_it_from_clean_to_masked() {
    let mut s = annotated_session();
    let grid = s.grid().unwrap();

    let center = Point::new(500.0, 500.0);
    let hit = s.nearest_die(center).expect("a die at the wafer center");
    let cell = grid.get(hit).unwrap();
    assert!(cell.centroid.dist_sq(center) < tolerance_sq(s.region()));
    let label = name_of(hit, s.origin());

    let before = s.generate_report().unwrap();
    assert_eq!(before.total_masked, 0);
    assert_eq!(before.total_clean, before.total_in_circle);

    // One full-brush stroke straight through the centroid.
    s.set_mode(ModeKind::Mask).unwrap();
    let c = cell.centroid;
    let half = s.brush_width() / 2.0;
    drag(&mut s, c - Point::new(half, 0.0), c + Point::new(half, 0.0)).unwrap();
    s.set_mode(ModeKind::Idle).unwrap();

    let after = s.generate_report().unwrap();
    assert_eq!(after.total_in_circle, before.total_in_circle);
    assert_eq!(after.total_masked, 1);
    assert_eq!(after.total_clean, before.total_clean - 1);
    assert_eq!(after.clean_count(label), before.clean_count(label).map(|n| n - 1));
    assert!(after.mask_area_in_circle > 0);
}

#[test]
fn control_point_drag_blocks_report_until_applied() {
    let mut s = annotated_session();
    s.set_mode(ModeKind::GridEdit).unwrap();

    let handle = s.mesh().unwrap().control_point(1, 1).unwrap();
    drag(&mut s, handle, handle + Point::new(15.0, -10.0)).unwrap();
    assert!(s.has_pending_edits());
    assert!(matches!(s.generate_report(), Err(Error::PendingUncommittedEdits)));

    // Leaving grid edit applies the mesh.
    s.set_mode(ModeKind::Idle).unwrap();
    assert!(!s.has_pending_edits());
    assert!(s.generate_report().is_ok());
}

#[test]
fn origin_click_shifts_labels() {
    let mut s = annotated_session();
    let target = s.nearest_die(Point::new(450.0, 475.0)).unwrap();

    s.set_mode(ModeKind::Origin).unwrap();
    click(&mut s, 450.0, 475.0);
    assert_eq!(s.origin(), target);
    assert_eq!(s.mode().kind(), ModeKind::Idle);
    assert_eq!(name_of(target, s.origin()), name_of(GridIndex::default(), GridIndex::default()));
}

#[test]
fn report_is_written_next_to_image_name() {
    let s = annotated_session();
    let report = s.generate_report().unwrap();

    assert_eq!(report_path_for(Some(Path::new("lot/wafer.png"))), Path::new("lot/wafer_Report.txt"));

    let dir = std::env::temp_dir().join(format!("wafer-die-mesh-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("wafer_Report.txt");
    write_report(&report, &path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("--- Die Count Report ---"));
    assert!(text.contains("wafer.png"));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn report_without_geometry_is_incomplete() {
    let s = Session::new(ImageSize::new(300, 300), None);
    assert!(matches!(s.generate_report(), Err(Error::IncompleteGeometry)));
}
