// src/statistics.rs - Per-line-pair and per-image MLI

use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::intercepts::GridIntercepts;

/// Measurement for one horizontal/vertical line pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineResult {
    pub line_number: u32,
    pub horizontal_intercepts: u32,
    pub vertical_intercepts: u32,
    pub horizontal_length_um: f64,
    pub vertical_length_um: f64,
    pub total_line_length_um: f64,
    /// `None` when the pair crossed no boundary
    pub mean_linear_intercept_um: Option<f64>,
}

impl LineResult {
    pub fn new(
        line_number: u32,
        horizontal: Option<(u32, f64)>,
        vertical: Option<(u32, f64)>,
    ) -> Self {
        let (horizontal_intercepts, horizontal_length_um) = horizontal.unwrap_or((0, 0.0));
        let (vertical_intercepts, vertical_length_um) = vertical.unwrap_or((0, 0.0));
        let total_line_length_um = horizontal_length_um + vertical_length_um;

        Self {
            line_number,
            horizontal_intercepts,
            vertical_intercepts,
            horizontal_length_um,
            vertical_length_um,
            total_line_length_um,
            mean_linear_intercept_um: mean_linear_intercept(
                total_line_length_um,
                horizontal_intercepts + vertical_intercepts,
            ),
        }
    }

    pub fn total_intercepts(&self) -> u32 {
        self.horizontal_intercepts + self.vertical_intercepts
    }
}

/// `length / intercepts`, undefined for zero intercepts
pub fn mean_linear_intercept(total_length_um: f64, intercepts: u32) -> Option<f64> {
    if intercepts == 0 {
        None
    } else {
        Some(total_length_um / intercepts as f64)
    }
}

/// Pair the k-th horizontal line with the k-th vertical line.
///
/// With unequal counts every surplus line still gets a row; its missing
/// counterpart contributes no intercepts and no length.
pub fn line_results(grid: &Grid, intercepts: &GridIntercepts) -> Vec<LineResult> {
    let pairs = grid.horizontal.len().max(grid.vertical.len());

    (0..pairs)
        .map(|k| {
            let horizontal = grid
                .horizontal
                .get(k)
                .zip(intercepts.horizontal.get(k))
                .map(|(line, hits)| (hits.count, line.length_um));
            let vertical = grid
                .vertical
                .get(k)
                .zip(intercepts.vertical.get(k))
                .map(|(line, hits)| (hits.count, line.length_um));
            LineResult::new(k as u32 + 1, horizontal, vertical)
        })
        .collect()
}

/// Arithmetic mean of the defined per-line MLI values
pub fn average_mli(lines: &[LineResult]) -> Option<f64> {
    let values: Vec<f64> = lines
        .iter()
        .filter_map(|line| line.mean_linear_intercept_um)
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn mli_divides_total_length_by_intercepts() {
        let line = LineResult::new(1, Some((3, 400.0)), Some((5, 300.0)));
        assert_approx_eq!(line.total_line_length_um, 700.0);
        assert_approx_eq!(line.mean_linear_intercept_um.unwrap(), 87.5);
    }

    #[test]
    fn zero_intercepts_leave_mli_undefined() {
        let line = LineResult::new(2, Some((0, 400.0)), Some((0, 400.0)));
        assert_eq!(line.mean_linear_intercept_um, None);
        assert_approx_eq!(line.total_line_length_um, 800.0);
    }

    #[test]
    fn unmatched_side_contributes_nothing() {
        let line = LineResult::new(4, Some((2, 100.0)), None);
        assert_eq!(line.vertical_intercepts, 0);
        assert_approx_eq!(line.vertical_length_um, 0.0);
        assert_approx_eq!(line.mean_linear_intercept_um.unwrap(), 50.0);
    }

    #[test]
    fn average_skips_undefined_lines() {
        let lines = vec![
            LineResult::new(1, Some((2, 100.0)), Some((2, 100.0))),
            LineResult::new(2, Some((0, 100.0)), Some((0, 100.0))),
            LineResult::new(3, Some((1, 100.0)), Some((3, 100.0))),
        ];
        assert_approx_eq!(average_mli(&lines).unwrap(), 50.0);
    }

    #[test]
    fn average_of_nothing_is_undefined() {
        let lines = vec![LineResult::new(1, Some((0, 10.0)), Some((0, 10.0)))];
        assert_eq!(average_mli(&lines), None);
        assert_eq!(average_mli(&[]), None);
    }
}
