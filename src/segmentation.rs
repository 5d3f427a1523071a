// src/segmentation.rs - Otsu thresholding and small-object removal

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::region_labelling::{connected_components, Connectivity};
use log::debug;

use crate::config::TissuePolarity;

/// Binary classification of every pixel: `true` is tissue, `false` airspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TissueMask {
    width: u32,
    height: u32,
    tissue: Vec<bool>,
}

impl TissueMask {
    /// Build a mask by evaluating `is_tissue` at every pixel
    pub fn from_fn<F: Fn(u32, u32) -> bool>(width: u32, height: u32, is_tissue: F) -> Self {
        let mut tissue = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                tissue.push(is_tissue(x, y));
            }
        }
        Self { width, height, tissue }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Mask value at (x, y); callers must stay in bounds
    #[inline]
    pub fn is_tissue(&self, x: u32, y: u32) -> bool {
        self.tissue[(y * self.width + x) as usize]
    }

    pub fn tissue_pixels(&self) -> usize {
        self.tissue.iter().filter(|&&t| t).count()
    }

    pub fn tissue_fraction(&self) -> f64 {
        if self.tissue.is_empty() {
            return 0.0;
        }
        self.tissue_pixels() as f64 / self.tissue.len() as f64
    }

    /// Tissue as 255, airspace as 0
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.is_tissue(x, y) { 255 } else { 0 }])
        })
    }
}

/// Result of segmenting one intensity field
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Mask after small-object removal; used for intercept counting
    pub mask: TissueMask,
    /// Mask straight out of thresholding
    pub raw: TissueMask,
    /// Otsu level, `None` for a uniform image
    pub threshold: Option<u8>,
    pub removed_components: usize,
}

/// Threshold `gray` with Otsu's method and drop tissue components below `min_area`.
pub fn segment(gray: &GrayImage, min_area: u32, polarity: TissuePolarity) -> Segmentation {
    let (width, height) = gray.dimensions();

    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    // A uniform field has no second class to separate from.
    let threshold = if width == 0 || height == 0 || min == max {
        None
    } else {
        Some(otsu_level(gray))
    };

    let raw = match threshold {
        None => TissueMask::from_fn(width, height, |_, _| false),
        Some(level) => TissueMask::from_fn(width, height, |x, y| {
            let value = gray.get_pixel(x, y)[0];
            match polarity {
                TissuePolarity::Dark => value <= level,
                TissuePolarity::Bright => value > level,
            }
        }),
    };

    let (mask, removed_components) = remove_small_objects(&raw, min_area);

    debug!(
        "Segmented {}x{}: threshold={:?}, tissue={:.1}%, removed {} components below {} px",
        width,
        height,
        threshold,
        mask.tissue_fraction() * 100.0,
        removed_components,
        min_area
    );

    Segmentation {
        mask,
        raw,
        threshold,
        removed_components,
    }
}

/// Reclassify 4-connected tissue components with area below `min_area` as airspace.
///
/// Returns the cleaned mask and the number of components removed.
pub fn remove_small_objects(mask: &TissueMask, min_area: u32) -> (TissueMask, usize) {
    if min_area == 0 || mask.tissue_pixels() == 0 {
        return (mask.clone(), 0);
    }

    let labels = connected_components(&mask.to_gray_image(), Connectivity::Four, Luma([0u8]));

    let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut areas = vec![0u32; max_label + 1];
    for p in labels.pixels() {
        areas[p[0] as usize] += 1;
    }

    let removed = areas
        .iter()
        .skip(1)
        .filter(|&&area| area > 0 && area < min_area)
        .count();

    let cleaned = TissueMask::from_fn(mask.width, mask.height, |x, y| {
        let label = labels.get_pixel(x, y)[0] as usize;
        label != 0 && areas[label] >= min_area
    });

    (cleaned, removed)
}
