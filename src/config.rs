// Command-line configuration for the interactive front end.
//
// Usage examples:
//   wafer-die-mesh wafer.png
//   wafer-die-mesh wafer.png --brush 35 --window 1600x1000
//   wafer-die-mesh                      (opens a generated placeholder wafer)

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use log::LevelFilter;

use crate::session::{MAX_BRUSH, MIN_BRUSH};

/// Overlay an FFD die grid on a wafer photo and count clean dies.
#[derive(Parser, Debug)]
#[command(name = "wafer-die-mesh", version)]
pub struct Config {
    /// Wafer image (PNG, JPEG, ...). Without one a placeholder wafer is generated.
    pub image: Option<PathBuf>,

    /// Mask brush width in image pixels.
    #[arg(short, long, default_value_t = 20.0, value_parser = parse_brush)]
    pub brush: f64,

    /// Largest window the image is fitted into, as WIDTHxHEIGHT.
    #[arg(short, long, default_value = "1200x800")]
    pub window: WindowSize,

    /// Where to write the report (default: <image>_Report.txt next to the image).
    #[arg(short, long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace.
    #[arg(long, default_value = "info", value_parser = parse_level)]
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: usize,
    pub height: usize,
}

impl FromStr for WindowSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let width: usize = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
        let height: usize = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
        if width < 64 || height < 64 {
            return Err("window must be at least 64x64".into());
        }
        Ok(Self { width, height })
    }
}

fn parse_brush(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("bad brush width {s:?}: {e}"))?;
    if (MIN_BRUSH..=MAX_BRUSH).contains(&v) {
        Ok(v)
    } else {
        Err(format!("brush width must be within {MIN_BRUSH}..={MAX_BRUSH}"))
    }
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    LevelFilter::from_str(s).map_err(|_| format!("unknown log level {s:?}"))
}
