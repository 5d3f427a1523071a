// src/preprocessing.rs - Luminance conversion and Gaussian denoising

use image::{DynamicImage, GrayImage};
use imageproc::filter::gaussian_blur_f32;
use log::debug;

use crate::errors::{MliError, Result};

/// Largest accepted smoothing sigma, in pixels
pub const MAX_SIGMA_DENOISE: f64 = 50.0;

/// Below this sigma the Gaussian kernel is a unit impulse
const MIN_EFFECTIVE_SIGMA: f32 = 0.01;

/// Convert a decoded image to a smoothed single-channel intensity field.
///
/// `sigma` of zero skips smoothing. The output always has the input's
/// dimensions.
pub fn preprocess(image: &DynamicImage, sigma: f64) -> Result<GrayImage> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(MliError::Computation(format!(
            "image has zero area ({}x{})",
            width, height
        )));
    }

    let gray = image.to_luma8();
    denoise(gray, sigma)
}

/// Gaussian smoothing with standard deviation `sigma`.
///
/// Sigmas too small to move any pixel leave the image unchanged; sigmas
/// above `MAX_SIGMA_DENOISE` are a computation error.
pub fn denoise(gray: GrayImage, sigma: f64) -> Result<GrayImage> {
    let sigma_px = sigma as f32;
    if !sigma_px.is_finite() || sigma > MAX_SIGMA_DENOISE {
        return Err(MliError::Computation(format!(
            "sigma {} exceeds the maximum of {}",
            sigma, MAX_SIGMA_DENOISE
        )));
    }
    if sigma_px < MIN_EFFECTIVE_SIGMA {
        return Ok(gray);
    }

    debug!("Gaussian denoise sigma={:.2} on {}x{}", sigma_px, gray.width(), gray.height());
    Ok(gaussian_blur_f32(&gray, sigma_px))
}
