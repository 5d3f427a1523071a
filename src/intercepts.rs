// src/intercepts.rs - Boundary crossings along grid lines

use bresenham::Bresenham;
use serde::Serialize;

use crate::grid::{Grid, GridLine};
use crate::segmentation::TissueMask;

/// Crossings found along one grid line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineIntercepts {
    pub count: u32,
    /// Pixel where each crossing lands (first pixel of the new class)
    pub points: Vec<(u32, u32)>,
    /// Number of in-bounds pixels sampled
    pub samples: usize,
}

/// Intercepts for every line of a grid, in the grid's order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridIntercepts {
    pub horizontal: Vec<LineIntercepts>,
    pub vertical: Vec<LineIntercepts>,
}

impl GridIntercepts {
    pub fn points(&self) -> impl Iterator<Item = &(u32, u32)> {
        self.horizontal
            .iter()
            .chain(self.vertical.iter())
            .flat_map(|line| line.points.iter())
    }
}

/// Trace the pixel path between two points with Bresenham's algorithm,
/// both endpoints included.
pub fn trace_line(start: (u32, u32), end: (u32, u32)) -> Vec<(i64, i64)> {
    let from = (start.0 as isize, start.1 as isize);
    let to = (end.0 as isize, end.1 as isize);

    // The iterator stops short of `to`.
    Bresenham::new(from, to)
        .chain(std::iter::once(to))
        .map(|(x, y)| (x as i64, y as i64))
        .collect()
}

/// Count tissue/airspace transitions along a sampled path.
///
/// Out-of-bounds pixels are dropped before comparing neighbours.
pub fn count_along_path(mask: &TissueMask, path: &[(i64, i64)]) -> LineIntercepts {
    let samples: Vec<((u32, u32), bool)> = path
        .iter()
        .filter(|&&(x, y)| mask.in_bounds(x, y))
        .map(|&(x, y)| {
            let (x, y) = (x as u32, y as u32);
            ((x, y), mask.is_tissue(x, y))
        })
        .collect();

    let points: Vec<(u32, u32)> = samples
        .windows(2)
        .filter(|pair| pair[0].1 != pair[1].1)
        .map(|pair| pair[1].0)
        .collect();

    LineIntercepts {
        count: points.len() as u32,
        points,
        samples: samples.len(),
    }
}

/// Count intercepts along a single grid line
pub fn count_intercepts(mask: &TissueMask, line: &GridLine) -> LineIntercepts {
    count_along_path(mask, &trace_line(line.start, line.end))
}

/// Count intercepts along every line of `grid`
pub fn count_grid(mask: &TissueMask, grid: &Grid) -> GridIntercepts {
    GridIntercepts {
        horizontal: grid.horizontal.iter().map(|line| count_intercepts(mask, line)).collect(),
        vertical: grid.vertical.iter().map(|line| count_intercepts(mask, line)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Orientation;

    fn stripes(width: u32, height: u32, period: u32) -> TissueMask {
        TissueMask::from_fn(width, height, |x, _| (x / period) % 2 == 1)
    }

    fn horizontal(y: u32, x0: u32, x1: u32) -> GridLine {
        GridLine {
            orientation: Orientation::Horizontal,
            index: 1,
            start: (x0, y),
            end: (x1, y),
            length_px: x1 - x0 + 1,
            length_um: (x1 - x0 + 1) as f64,
            clamped: false,
        }
    }

    #[test]
    fn trace_includes_both_endpoints() {
        let path = trace_line((2, 5), (6, 5));
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), Some(&(2, 5)));
        assert_eq!(path.last(), Some(&(6, 5)));
        assert_eq!(trace_line((3, 3), (3, 3)), vec![(3, 3)]);
    }

    #[test]
    fn counts_every_stripe_edge() {
        // airspace 0..10, tissue 10..20, airspace 20..30, tissue 30..40
        let mask = stripes(40, 5, 10);
        let result = count_intercepts(&mask, &horizontal(2, 0, 39));
        assert_eq!(result.count, 3);
        assert_eq!(result.points, vec![(10, 2), (20, 2), (30, 2)]);
        assert_eq!(result.samples, 40);
    }

    #[test]
    fn uniform_mask_has_no_intercepts() {
        let mask = TissueMask::from_fn(20, 20, |_, _| false);
        let line = GridLine {
            orientation: Orientation::Vertical,
            index: 1,
            start: (10, 0),
            end: (10, 19),
            length_px: 20,
            length_um: 20.0,
            clamped: false,
        };
        assert_eq!(count_intercepts(&mask, &line).count, 0);
    }

    #[test]
    fn out_of_bounds_pixels_are_skipped() {
        let mask = stripes(10, 2, 5);
        let path: Vec<(i64, i64)> = (-3..13).map(|x| (x, 0)).collect();
        let result = count_along_path(&mask, &path);
        assert_eq!(result.samples, 10);
        assert_eq!(result.count, 1);
    }

    #[test]
    fn counting_is_repeatable() {
        let mask = TissueMask::from_fn(64, 64, |x, y| (x * 7 + y * 3) % 11 < 4);
        let line = horizontal(31, 0, 63);
        assert_eq!(count_intercepts(&mask, &line), count_intercepts(&mask, &line));
    }
}
