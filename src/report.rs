// Die accounting: the area estimate and the exact per-label grid counts.
// What you get: a `Report` value; `Display` renders the text file the user saves.

use std::fmt::{self, Display};
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::Error;
use crate::grid::DieGridCache;
use crate::mask::MaskRaster;
use crate::naming::{DIE_NAMES, label_order, name_of};
use crate::types::{CircleGeom, GridIndex, RegionRect};

/// Result of one accounting pass over a committed grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub image_name: String,
    pub circle_area: f64,
    pub mask_area_in_circle: u64,
    pub clean_area: f64,
    pub nominal_die_area: f64,
    pub estimated_die_count: f64,
    pub total_in_circle: usize,
    pub total_masked: usize,
    pub total_clean: usize,
    /// Clean dies per label, in [`DIE_NAMES`] order; every label is present.
    pub clean_by_label: Vec<(&'static str, usize)>,
}

impl Report {
    pub fn clean_count(&self, label: &str) -> Option<usize> {
        self.clean_by_label.iter().find(|(l, _)| *l == label).map(|(_, n)| *n)
    }
}

/// Everything the accountant reads. `dirty` is the mesh's uncommitted-edit flag.
pub struct AccountingInput<'a> {
    pub image_name: &'a str,
    pub region: Option<&'a RegionRect>,
    pub circle: Option<&'a CircleGeom>,
    pub grid: Option<&'a DieGridCache>,
    pub mask: &'a MaskRaster,
    pub origin: GridIndex,
    pub dirty: bool,
}

pub fn generate(input: &AccountingInput<'_>) -> Result<Report, Error> {
    if input.dirty {
        return Err(Error::PendingUncommittedEdits);
    }
    let (Some(region), Some(circle), Some(grid)) = (input.region, input.circle, input.grid) else {
        return Err(Error::IncompleteGeometry);
    };
    if grid.is_empty() {
        return Err(Error::IncompleteGeometry);
    }

    // 1) Continuous estimate from areas alone.
    let circle_area = circle.area();
    let mask_area_in_circle = input.mask.masked_area_in_circle(circle);
    let clean_area = circle_area - mask_area_in_circle as f64;
    let nominal_die_area = region.area();
    let estimated_die_count = if nominal_die_area > 0.0 { clean_area / nominal_die_area } else { 0.0 };

    // 2) Exact count over the committed cells.
    let mut clean_by_label: Vec<(&'static str, usize)> = DIE_NAMES.iter().map(|n| (*n, 0)).collect();
    let (mut total_in_circle, mut total_masked, mut total_clean) = (0, 0, 0);

    for cell in grid.cells() {
        if !circle.contains(cell.centroid) {
            continue;
        }
        total_in_circle += 1;
        if input.mask.is_masked(cell.centroid) {
            total_masked += 1;
            continue;
        }
        total_clean += 1;
        if let Some(slot) = label_order(name_of(cell.index, input.origin)) {
            clean_by_label[slot].1 += 1;
        }
    }

    info!(
        "report: {} dies in circle, {} masked, {} clean, estimate {:.0}",
        total_in_circle, total_masked, total_clean, estimated_die_count
    );

    Ok(Report {
        image_name: input.image_name.to_string(),
        circle_area,
        mask_area_in_circle,
        clean_area,
        nominal_die_area,
        estimated_die_count,
        total_in_circle,
        total_masked,
        total_clean,
        clean_by_label,
    })
}

/// `wafer.png` -> `wafer_Report.txt` in the same folder; no image -> `Report.txt`.
pub fn report_path_for(image_path: Option<&Path>) -> PathBuf {
    match image_path.and_then(|p| p.file_stem().map(|s| (p, s))) {
        Some((p, stem)) => {
            let name = format!("{}_Report.txt", stem.to_string_lossy());
            p.with_file_name(name)
        }
        None => PathBuf::from("Report.txt"),
    }
}

pub fn write_report(report: &Report, path: &Path) -> Result<(), Error> {
    fs::write(path, report.to_string())?;
    info!("report saved to {}", path.display());
    Ok(())
}

/// `1234567.891` with 2 decimals -> `1,234,567.89`.
fn thousands(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && text.chars().any(|c| c != '0' && c != '.') { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Die Count Report ---")?;
        writeln!(f, "Image: {}", self.image_name)?;
        writeln!(f)?;
        writeln!(f, "--- Area Ratio Estimation ---")?;
        writeln!(f, "Circle Area: {} px²", thousands(self.circle_area, 2))?;
        writeln!(f, "Mask Area inside Circle: {} px²", thousands(self.mask_area_in_circle as f64, 0))?;
        writeln!(f, "Clean Area inside Circle: {} px²", thousands(self.clean_area, 2))?;
        writeln!(f, "Nominal Die Area: {} px²", thousands(self.nominal_die_area, 2))?;
        writeln!(f, "Estimated Total Dies: {:.0}", self.estimated_die_count)?;
        writeln!(f)?;
        writeln!(f, "--- Grid Die Counts ---")?;
        writeln!(f, "Total Dies in Circle: {}", self.total_in_circle)?;
        writeln!(f, "Masked Dies: {}", self.total_masked)?;
        writeln!(f, "Clean Dies: {}", self.total_clean)?;
        writeln!(f)?;
        write!(f, "--- Detailed Clean Die Counts ---")?;
        for (label, count) in &self.clean_by_label {
            write!(f, "\n{label}: {count}")?;
        }
        Ok(())
    }
}
