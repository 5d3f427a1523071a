// src/overlay.rs - Diagnostic overlays for auditing intercept counts

use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;

use crate::grid::{Grid, GridLine, Orientation};
use crate::intercepts::GridIntercepts;
use crate::segmentation::Segmentation;

pub const HORIZONTAL_LINE_COLOR: Rgb<u8> = Rgb([255, 176, 0]);
pub const VERTICAL_LINE_COLOR: Rgb<u8> = Rgb([0, 255, 76]);
pub const LINE_THICKNESS: u32 = 3;

const MARKER_RING_COLOR: Rgb<u8> = Rgb([40, 40, 40]);
const MARKER_CROSS_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const MARKER_DOT_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
const MARKER_RING_RADIUS: i32 = 8;
const MARKER_CROSS_HALF: f32 = 15.0;
const MARKER_DOT_RADIUS: i32 = 4;

const TISSUE_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const REMOVED_SPECKLE_COLOR: Rgb<u8> = Rgb([110, 110, 110]);
const AIRSPACE_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// The two rendered diagnostics of one image, as raw pixel buffers
#[derive(Debug, Clone, PartialEq)]
pub struct Overlays {
    /// Original image with grid and intercept markers
    pub processed: RgbImage,
    /// Threshold mask with grid and intercept markers
    pub threshold: RgbImage,
}

/// Render both overlays.
pub fn render_overlays(
    original: &RgbImage,
    segmentation: &Segmentation,
    grid: &Grid,
    intercepts: &GridIntercepts,
) -> Overlays {
    let mut processed = original.clone();
    let mut threshold = threshold_view(segmentation);

    for canvas in [&mut processed, &mut threshold] {
        draw_grid(canvas, grid);
        for &point in intercepts.points() {
            draw_intercept_marker(canvas, point);
        }
    }

    Overlays { processed, threshold }
}

/// Mask rendering: kept tissue white, speckle removed by the area filter grey,
/// airspace black.
pub fn threshold_view(segmentation: &Segmentation) -> RgbImage {
    let (width, height) = segmentation.raw.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        if segmentation.mask.is_tissue(x, y) {
            TISSUE_COLOR
        } else if segmentation.raw.is_tissue(x, y) {
            REMOVED_SPECKLE_COLOR
        } else {
            AIRSPACE_COLOR
        }
    })
}

/// Draw every grid line, horizontal and vertical in distinct colours
pub fn draw_grid(canvas: &mut RgbImage, grid: &Grid) {
    for line in grid.lines() {
        draw_grid_line(canvas, line);
    }
}

fn draw_grid_line(canvas: &mut RgbImage, line: &GridLine) {
    let half = (LINE_THICKNESS / 2) as i32;
    let (x0, y0) = (line.start.0 as i32, line.start.1 as i32);

    let (rect, color) = match line.orientation {
        Orientation::Horizontal => (
            Rect::at(x0, y0 - half).of_size(line.length_px, LINE_THICKNESS),
            HORIZONTAL_LINE_COLOR,
        ),
        Orientation::Vertical => (
            Rect::at(x0 - half, y0).of_size(LINE_THICKNESS, line.length_px),
            VERTICAL_LINE_COLOR,
        ),
    };

    draw_filled_rect_mut(canvas, rect, color);
}

/// Ring, tilted cross and centre dot at an intercept
pub fn draw_intercept_marker(canvas: &mut RgbImage, point: (u32, u32)) {
    let center = (point.0 as i32, point.1 as i32);

    for radius in MARKER_RING_RADIUS - 1..=MARKER_RING_RADIUS + 1 {
        draw_hollow_circle_mut(canvas, center, radius, MARKER_RING_COLOR);
    }

    let (cx, cy) = (center.0 as f32, center.1 as f32);
    for offset in [-1.0f32, 0.0, 1.0] {
        draw_line_segment_mut(
            canvas,
            (cx - MARKER_CROSS_HALF + offset, cy - MARKER_CROSS_HALF),
            (cx + MARKER_CROSS_HALF + offset, cy + MARKER_CROSS_HALF),
            MARKER_CROSS_COLOR,
        );
        draw_line_segment_mut(
            canvas,
            (cx - MARKER_CROSS_HALF + offset, cy + MARKER_CROSS_HALF),
            (cx + MARKER_CROSS_HALF + offset, cy - MARKER_CROSS_HALF),
            MARKER_CROSS_COLOR,
        );
    }

    draw_filled_circle_mut(canvas, center, MARKER_DOT_RADIUS, MARKER_DOT_COLOR);
}
