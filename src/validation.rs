// src/validation.rs - Boundary parameter set and the validated analysis config

use serde::{Deserialize, Serialize};

use crate::errors::{MliError, Result};
use crate::preprocessing::MAX_SIGMA_DENOISE;

const MAX_MAGNIFICATION_LEN: usize = 20;

/// A parameter value as sent by a caller: either a number or text
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// Possibly partial parameter set received from a caller.
///
/// Accepts the wire names, the data-model names and the camelCase form
/// names for every field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawAnalysisConfig {
    #[serde(default, alias = "scaleUmPerPixel")]
    pub scale_um_per_pixel: Option<RawValue>,

    #[serde(
        default,
        alias = "horizontal_line_length_um",
        alias = "horizontalLineLengthUm"
    )]
    pub line_length_um_horizontal: Option<RawValue>,

    #[serde(
        default,
        alias = "vertical_line_length_um",
        alias = "verticalLineLengthUm"
    )]
    pub line_length_um_vertical: Option<RawValue>,

    #[serde(default, alias = "nLinesHorizontal")]
    pub n_lines_horizontal: Option<RawValue>,

    #[serde(default, alias = "nLinesVertical")]
    pub n_lines_vertical: Option<RawValue>,

    #[serde(default, alias = "sigmaDenoise")]
    pub sigma_denoise: Option<RawValue>,

    #[serde(default, alias = "minArea")]
    pub min_area: Option<RawValue>,

    #[serde(default)]
    pub magnification: Option<String>,
}

/// Fully typed analysis parameters. Only obtainable through validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisConfig {
    pub scale_um_per_pixel: f64,
    pub horizontal_line_length_um: f64,
    pub vertical_line_length_um: f64,
    pub n_lines_horizontal: u32,
    pub n_lines_vertical: u32,
    pub sigma_denoise: f64,
    pub min_area: u32,
    pub magnification: String,
}

impl RawAnalysisConfig {
    /// Normalise and check every field, producing a typed config.
    pub fn validate(&self) -> Result<AnalysisConfig> {
        let scale_um_per_pixel = positive("scale_um_per_pixel", &self.scale_um_per_pixel)?;
        let horizontal_line_length_um =
            positive("line_length_um_horizontal", &self.line_length_um_horizontal)?;
        let vertical_line_length_um =
            positive("line_length_um_vertical", &self.line_length_um_vertical)?;
        let n_lines_horizontal = line_count("n_lines_horizontal", &self.n_lines_horizontal)?;
        let n_lines_vertical = line_count("n_lines_vertical", &self.n_lines_vertical)?;

        let sigma_denoise = match &self.sigma_denoise {
            None => 0.0,
            Some(raw) => {
                let sigma = number("sigma_denoise", raw)?;
                if sigma < 0.0 {
                    return Err(invalid("sigma_denoise", "must be >= 0"));
                }
                if sigma > MAX_SIGMA_DENOISE {
                    return Err(invalid(
                        "sigma_denoise",
                        &format!("must be <= {}", MAX_SIGMA_DENOISE),
                    ));
                }
                sigma
            }
        };

        let min_area = match &self.min_area {
            None => 0,
            Some(raw) => {
                let area = number("min_area", raw)?;
                if area < 0.0 {
                    return Err(invalid("min_area", "must be >= 0"));
                }
                integral("min_area", area)?
            }
        };

        let magnification = self
            .magnification
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| invalid("magnification", "is required"))?;
        if magnification.is_empty() || magnification.chars().count() > MAX_MAGNIFICATION_LEN {
            return Err(invalid(
                "magnification",
                &format!("must be 1 to {} characters", MAX_MAGNIFICATION_LEN),
            ));
        }

        for (field, length_um) in [
            ("line_length_um_horizontal", horizontal_line_length_um),
            ("line_length_um_vertical", vertical_line_length_um),
        ] {
            if (length_um / scale_um_per_pixel).round() < 1.0 {
                return Err(invalid(field, "is shorter than one pixel at this scale"));
            }
        }

        Ok(AnalysisConfig {
            scale_um_per_pixel,
            horizontal_line_length_um,
            vertical_line_length_um,
            n_lines_horizontal,
            n_lines_vertical,
            sigma_denoise,
            min_area,
            magnification: magnification.to_string(),
        })
    }
}

fn invalid(field: &str, reason: &str) -> MliError {
    MliError::Validation(format!("{} {}", field, reason))
}

fn number(field: &str, raw: &RawValue) -> Result<f64> {
    let value = match raw {
        RawValue::Number(value) => *value,
        RawValue::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(field, &format!("is not numeric: '{}'", text)))?,
    };
    if !value.is_finite() {
        return Err(invalid(field, "must be finite"));
    }
    Ok(value)
}

fn required<'a>(field: &str, raw: &'a Option<RawValue>) -> Result<&'a RawValue> {
    raw.as_ref().ok_or_else(|| invalid(field, "is required"))
}

fn positive(field: &str, raw: &Option<RawValue>) -> Result<f64> {
    let value = number(field, required(field, raw)?)?;
    if value <= 0.0 {
        return Err(invalid(field, "must be > 0"));
    }
    Ok(value)
}

fn integral(field: &str, value: f64) -> Result<u32> {
    if value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(invalid(field, "must be a whole number"));
    }
    Ok(value as u32)
}

fn line_count(field: &str, raw: &Option<RawValue>) -> Result<u32> {
    let value = number(field, required(field, raw)?)?;
    let count = integral(field, value)?;
    if value < 1.0 {
        return Err(invalid(field, "must be >= 1"));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> RawAnalysisConfig {
        RawAnalysisConfig {
            scale_um_per_pixel: Some(0.5.into()),
            line_length_um_horizontal: Some(432.0.into()),
            line_length_um_vertical: Some(300.0.into()),
            n_lines_horizontal: Some(5.0.into()),
            n_lines_vertical: Some(5.0.into()),
            sigma_denoise: Some(1.0.into()),
            min_area: Some(450.0.into()),
            magnification: Some("  20x ".to_string()),
        }
    }

    #[test]
    fn complete_parameters_validate() {
        let config = complete().validate().unwrap();
        assert_eq!(config.n_lines_horizontal, 5);
        assert_eq!(config.min_area, 450);
        assert_eq!(config.magnification, "20x");
    }

    #[test]
    fn negative_min_area_is_rejected() {
        let mut raw = complete();
        raw.min_area = Some((-1.0).into());
        assert!(matches!(raw.validate(), Err(MliError::Validation(_))));
    }

    #[test]
    fn sigma_is_bounded_above() {
        let mut raw = complete();
        raw.sigma_denoise = Some(1e39.into());
        assert!(matches!(raw.validate(), Err(MliError::Validation(_))));

        raw.sigma_denoise = Some(1e-50.into());
        assert_eq!(raw.validate().unwrap().sigma_denoise, 1e-50);
    }

    #[test]
    fn non_positive_lengths_are_rejected() {
        let mut raw = complete();
        raw.scale_um_per_pixel = Some(0.0.into());
        assert!(matches!(raw.validate(), Err(MliError::Validation(_))));

        let mut raw = complete();
        raw.line_length_um_vertical = Some((-3.0).into());
        assert!(matches!(raw.validate(), Err(MliError::Validation(_))));
    }

    #[test]
    fn text_values_are_parsed_or_rejected() {
        let mut raw = complete();
        raw.scale_um_per_pixel = Some("0.25".into());
        assert_eq!(raw.validate().unwrap().scale_um_per_pixel, 0.25);

        raw.scale_um_per_pixel = Some("a quarter".into());
        assert!(matches!(raw.validate(), Err(MliError::Validation(_))));
    }

    #[test]
    fn line_counts_must_be_positive_integers() {
        let mut raw = complete();
        raw.n_lines_vertical = Some(2.5.into());
        assert!(raw.validate().is_err());
        raw.n_lines_vertical = Some(0.0.into());
        assert!(raw.validate().is_err());
    }

    #[test]
    fn optional_fields_default_to_zero() {
        let mut raw = complete();
        raw.sigma_denoise = None;
        raw.min_area = None;
        let config = raw.validate().unwrap();
        assert_eq!(config.sigma_denoise, 0.0);
        assert_eq!(config.min_area, 0);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut raw = complete();
        raw.magnification = None;
        assert!(raw.validate().is_err());
        let mut raw = complete();
        raw.n_lines_horizontal = None;
        assert!(raw.validate().is_err());
    }

    #[test]
    fn sub_pixel_line_is_rejected() {
        let mut raw = complete();
        raw.line_length_um_horizontal = Some(0.1.into());
        assert!(raw.validate().is_err());
    }

    #[test]
    fn accepts_form_and_model_field_names() {
        let json = r#"{
            "scaleUmPerPixel": "0.5",
            "horizontal_line_length_um": 100,
            "verticalLineLengthUm": 100,
            "n_lines_horizontal": 3,
            "nLinesVertical": "3",
            "magnification": "10x"
        }"#;
        let raw: RawAnalysisConfig = serde_json::from_str(json).unwrap();
        let config = raw.validate().unwrap();
        assert_eq!(config.horizontal_line_length_um, 100.0);
        assert_eq!(config.n_lines_vertical, 3);
    }
}
