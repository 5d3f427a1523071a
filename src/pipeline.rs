// src/pipeline.rs - Per-image measurement pipeline and batch orchestration

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{AppConfig, TissuePolarity};
use crate::errors::{ErrorKind, MliError, Result};
use crate::grid::{plan_grid, Grid};
use crate::image_io::{decode_image, ImageInput};
use crate::intercepts::count_grid;
use crate::overlay::{render_overlays, Overlays};
use crate::preprocessing::preprocess;
use crate::segmentation::segment;
use crate::statistics::{average_mli, line_results, LineResult};
use crate::validation::{AnalysisConfig, RawAnalysisConfig};

/// Engine settings that are not part of the measurement parameters
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub polarity: TissuePolarity,
    pub use_parallel: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            polarity: TissuePolarity::Dark,
            use_parallel: true,
        }
    }
}

impl From<&AppConfig> for AnalysisOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            polarity: config.tissue_polarity,
            use_parallel: config.use_parallel,
        }
    }
}

/// Complete measurement of one image
#[derive(Debug, Clone)]
pub struct AnalysisImage {
    pub image_id: String,
    pub image_number: u32,
    pub name: String,
    pub average_mli_um: Option<f64>,
    pub lines: Vec<LineResult>,
    pub overlays: Overlays,
    pub grid: Grid,
    /// Otsu level used for segmentation, `None` for a uniform image
    pub threshold: Option<u8>,
}

/// All images of one animal from one run
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub animal_id: String,
    pub generated_at: DateTime<Utc>,
    pub images: Vec<AnalysisImage>,
}

/// An image of a batch that could not be analysed
#[derive(Debug, Clone, Serialize)]
pub struct ImageFailure {
    pub image_id: String,
    pub image_number: u32,
    pub name: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub result: AnalysisResult,
    pub failures: Vec<ImageFailure>,
}

/// Run every stage for one image with an already validated config.
///
/// `keep_going` is polled between stages; when it returns false the run is
/// abandoned and `Ok(None)` is returned.
pub(crate) fn run_stages(
    input: &ImageInput,
    image_number: u32,
    config: &AnalysisConfig,
    options: &AnalysisOptions,
    keep_going: &dyn Fn() -> bool,
) -> Result<Option<AnalysisImage>> {
    // Step 1: Decode and preprocess
    let decoded = decode_image(&input.bytes)?;
    let gray = preprocess(&decoded, config.sigma_denoise)?;
    if !keep_going() {
        return Ok(None);
    }

    // Step 2: Segment
    let segmentation = segment(&gray, config.min_area, options.polarity);
    if !keep_going() {
        return Ok(None);
    }

    // Step 3: Plan grid and count intercepts
    let (width, height) = gray.dimensions();
    let grid = plan_grid(width, height, config);
    if grid.has_coincident_lines() {
        return Err(MliError::Computation(format!(
            "{}x{} image is too small for {} horizontal and {} vertical lines",
            width, height, config.n_lines_horizontal, config.n_lines_vertical
        )));
    }
    let intercepts = count_grid(&segmentation.mask, &grid);

    // Step 4: Statistics
    let lines = line_results(&grid, &intercepts);
    let average_mli_um = average_mli(&lines);
    if !keep_going() {
        return Ok(None);
    }

    // Step 5: Overlays
    let overlays = render_overlays(&decoded.to_rgb8(), &segmentation, &grid, &intercepts);

    debug!(
        "{}: threshold={:?}, intercepts h={:?} v={:?}",
        input.name,
        segmentation.threshold,
        intercepts.horizontal.iter().map(|l| l.count).collect::<Vec<_>>(),
        intercepts.vertical.iter().map(|l| l.count).collect::<Vec<_>>()
    );

    Ok(Some(AnalysisImage {
        image_id: input.image_id.clone(),
        image_number,
        name: input.name.clone(),
        average_mli_um,
        lines,
        overlays,
        grid,
        threshold: segmentation.threshold,
    }))
}

/// Analyse one image with a validated config
pub fn analyze_image(
    input: &ImageInput,
    image_number: u32,
    config: &AnalysisConfig,
    options: &AnalysisOptions,
) -> Result<AnalysisImage> {
    let image = run_stages(input, image_number, config, options, &|| true)?.ok_or_else(|| {
        MliError::Computation(format!("analysis of {} was abandoned", input.name))
    })?;

    info!(
        "Analysed image {} ({}): {} line pairs, average MLI {}",
        image.image_number,
        image.name,
        image.lines.len(),
        format_mli(image.average_mli_um)
    );

    Ok(image)
}

/// Full analysis: validate the raw parameters, then analyse one image.
pub fn full_analysis(
    input: &ImageInput,
    image_number: u32,
    raw: &RawAnalysisConfig,
    options: &AnalysisOptions,
) -> Result<AnalysisImage> {
    let config = raw.validate()?;
    analyze_image(input, image_number, &config, options)
}

/// Analyse every image of an animal.
///
/// The config is validated once up front; an invalid config fails the whole
/// batch before any image is touched. Failures of individual images are
/// collected and do not stop the others.
pub fn analyze_batch(
    animal_id: &str,
    inputs: &[ImageInput],
    raw: &RawAnalysisConfig,
    options: &AnalysisOptions,
) -> Result<BatchOutcome> {
    let config = raw.validate()?;

    info!(
        "Analysing {} images for animal {} ({})",
        inputs.len(),
        animal_id,
        if options.use_parallel { "parallel" } else { "sequential" }
    );

    let analyse = |(index, input): (usize, &ImageInput)| {
        let image_number = index as u32 + 1;
        analyze_image(input, image_number, &config, options).map_err(|error| {
            warn!("Image {} ({}) failed: {}", image_number, input.name, error);
            ImageFailure {
                image_id: input.image_id.clone(),
                image_number,
                name: input.name.clone(),
                kind: error.kind(),
                message: error.to_string(),
            }
        })
    };

    let outcomes: Vec<std::result::Result<AnalysisImage, ImageFailure>> = if options.use_parallel {
        inputs.par_iter().enumerate().map(analyse).collect()
    } else {
        inputs.iter().enumerate().map(analyse).collect()
    };

    let mut images = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(image) => images.push(image),
            Err(failure) => failures.push(failure),
        }
    }
    images.sort_by_key(|image| image.image_number);

    Ok(BatchOutcome {
        result: AnalysisResult {
            animal_id: animal_id.to_string(),
            generated_at: Utc::now(),
            images,
        },
        failures,
    })
}

fn format_mli(value: Option<f64>) -> String {
    value
        .map(|mli| format!("{:.2} um", mli))
        .unwrap_or_else(|| "undefined".to_string())
}
