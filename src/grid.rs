// src/grid.rs - Auto-spaced measurement grid

use log::{debug, warn};
use serde::Serialize;

use crate::validation::AnalysisConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// One measurement line in pixel space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridLine {
    pub orientation: Orientation,
    /// 1-based, top-to-bottom for horizontal and left-to-right for vertical
    pub index: u32,
    pub start: (u32, u32),
    /// Inclusive end pixel
    pub end: (u32, u32),
    pub length_px: u32,
    /// Physical length used for MLI.
    ///
    /// The configured length, except for a clamped line, which reports the
    /// length actually sampled (`length_px * scale`) rather than the
    /// nominal configured length.
    pub length_um: f64,
    /// Requested length did not fit the image
    pub clamped: bool,
}

/// Horizontal and vertical lines of one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub horizontal: Vec<GridLine>,
    pub vertical: Vec<GridLine>,
}

impl Grid {
    pub fn lines(&self) -> impl Iterator<Item = &GridLine> {
        self.horizontal.iter().chain(self.vertical.iter())
    }

    /// Two lines of the same orientation landed on the same row or column
    pub fn has_coincident_lines(&self) -> bool {
        self.horizontal.windows(2).any(|w| w[0].start.1 == w[1].start.1)
            || self.vertical.windows(2).any(|w| w[0].start.0 == w[1].start.0)
    }
}

/// Evenly spaced positions `round(k * length / (count + 1))` for k in 1..=count
pub fn auto_positions(length: u32, count: u32) -> Vec<u32> {
    if length == 0 {
        return Vec::new();
    }
    let step = length as f64 / (count as f64 + 1.0);
    (1..=count)
        .map(|k| ((step * k as f64).round() as u32).min(length - 1))
        .collect()
}

/// Centred span of `length_um` along an axis of `axis_px` pixels.
///
/// Returns (start, length_px, length_um, clamped).
fn centred_span(length_um: f64, scale: f64, axis_px: u32) -> (u32, u32, f64, bool) {
    let requested = (length_um / scale).round().max(1.0);
    let clamped = requested > axis_px as f64;
    let length_px = if clamped { axis_px } else { requested as u32 };
    let start = (axis_px - length_px) / 2;
    let effective_um = if clamped {
        length_px as f64 * scale
    } else {
        length_um
    };
    (start, length_px, effective_um, clamped)
}

/// Plan the grid for an image of `width` x `height` pixels.
pub fn plan_grid(width: u32, height: u32, config: &AnalysisConfig) -> Grid {
    let scale = config.scale_um_per_pixel;
    if width == 0 || height == 0 {
        return Grid {
            horizontal: Vec::new(),
            vertical: Vec::new(),
        };
    }

    let (h_start, h_len, h_um, h_clamped) =
        centred_span(config.horizontal_line_length_um, scale, width);
    let horizontal: Vec<GridLine> = auto_positions(height, config.n_lines_horizontal)
        .into_iter()
        .enumerate()
        .map(|(i, y)| GridLine {
            orientation: Orientation::Horizontal,
            index: i as u32 + 1,
            start: (h_start, y),
            end: (h_start + h_len - 1, y),
            length_px: h_len,
            length_um: h_um,
            clamped: h_clamped,
        })
        .collect();

    let (v_start, v_len, v_um, v_clamped) =
        centred_span(config.vertical_line_length_um, scale, height);
    let vertical: Vec<GridLine> = auto_positions(width, config.n_lines_vertical)
        .into_iter()
        .enumerate()
        .map(|(i, x)| GridLine {
            orientation: Orientation::Vertical,
            index: i as u32 + 1,
            start: (x, v_start),
            end: (x, v_start + v_len - 1),
            length_px: v_len,
            length_um: v_um,
            clamped: v_clamped,
        })
        .collect();

    if h_clamped {
        warn!(
            "Horizontal line of {:.1} um exceeds image width {} px at {} um/px; clamped to {:.1} um",
            config.horizontal_line_length_um, width, scale, h_um
        );
    }
    if v_clamped {
        warn!(
            "Vertical line of {:.1} um exceeds image height {} px at {} um/px; clamped to {:.1} um",
            config.vertical_line_length_um, height, scale, v_um
        );
    }
    debug!(
        "Grid: {} horizontal x {} px, {} vertical x {} px",
        horizontal.len(),
        h_len,
        vertical.len(),
        v_len
    );

    Grid { horizontal, vertical }
}
