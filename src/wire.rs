// src/wire.rs - JSON shapes exchanged with the transport layer

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::image_io::encode_png;
use crate::pipeline::{AnalysisImage, AnalysisResult, ImageFailure};
use crate::statistics::LineResult;

pub type LineRecord = LineResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisImageRecord {
    pub image_id: String,
    pub image_number: u32,
    pub name: String,
    pub average_mli_um: Option<f64>,
    pub processed_image_base64: String,
    pub threshold_image_base64: String,
    pub lines: Vec<LineRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResultRecord {
    pub animal_id: String,
    pub generated_at: String,
    pub images: Vec<AnalysisImageRecord>,
}

/// Batch response including images that failed
#[derive(Debug, Clone, Serialize)]
pub struct BatchRecord {
    #[serde(flatten)]
    pub result: AnalysisResultRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ImageFailure>,
}

/// PNG-encode an overlay and wrap it in base64
pub fn encode_overlay(image: &image::RgbImage) -> Result<String> {
    Ok(STANDARD.encode(encode_png(image)?))
}

impl AnalysisImageRecord {
    pub fn from_image(image: &AnalysisImage) -> Result<Self> {
        Ok(Self {
            image_id: image.image_id.clone(),
            image_number: image.image_number,
            name: image.name.clone(),
            average_mli_um: image.average_mli_um,
            processed_image_base64: encode_overlay(&image.overlays.processed)?,
            threshold_image_base64: encode_overlay(&image.overlays.threshold)?,
            lines: image.lines.clone(),
        })
    }
}

impl AnalysisResultRecord {
    pub fn from_result(result: &AnalysisResult) -> Result<Self> {
        Ok(Self {
            animal_id: result.animal_id.clone(),
            generated_at: result.generated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            images: result
                .images
                .iter()
                .map(AnalysisImageRecord::from_image)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}
