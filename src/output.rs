use std::fs;
use std::path::Path;
use csv::Writer;

use crate::errors::Result;
use crate::wire::AnalysisResultRecord;

/// Write one row per line pair and one average row per image
pub fn write_results_csv<P: AsRef<Path>>(
    results: &[AnalysisResultRecord],
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(output_path)?;

    writer.write_record([
        "Animal",
        "Image #",
        "Line #",
        "Horizontal Intercepts",
        "Vertical Intercepts",
        "MLI (um)",
    ])?;

    for result in results {
        for image in &result.images {
            for line in &image.lines {
                writer.write_record(&[
                    result.animal_id.clone(),
                    image.image_number.to_string(),
                    line.line_number.to_string(),
                    line.horizontal_intercepts.to_string(),
                    line.vertical_intercepts.to_string(),
                    format_optional(line.mean_linear_intercept_um),
                ])?;
            }

            writer.write_record(&[
                format!("{} - Image {} average", result.animal_id, image.image_number),
                image.image_number.to_string(),
                String::new(),
                String::new(),
                String::new(),
                format_optional(image.average_mli_um),
            ])?;
        }
    }

    writer.flush()?;

    Ok(())
}

/// Write an analysis result as pretty JSON
pub fn write_result_json<P: AsRef<Path>>(record: &AnalysisResultRecord, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(output_path, serde_json::to_string_pretty(record)?)?;

    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::LineResult;
    use crate::wire::AnalysisImageRecord;

    fn record() -> AnalysisResultRecord {
        AnalysisResultRecord {
            animal_id: "A1".to_string(),
            generated_at: "2024-03-01T12:00:00Z".to_string(),
            images: vec![AnalysisImageRecord {
                image_id: "i1".to_string(),
                image_number: 1,
                name: "lung.png".to_string(),
                average_mli_um: Some(50.0),
                processed_image_base64: String::new(),
                threshold_image_base64: String::new(),
                lines: vec![
                    LineResult::new(1, Some((2, 100.0)), Some((2, 100.0))),
                    LineResult::new(2, Some((0, 100.0)), Some((0, 100.0))),
                ],
            }],
        }
    }

    #[test]
    fn csv_has_line_rows_and_average_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export").join("mli.csv");
        write_results_csv(&[record()], &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], "A1,1,1,2,2,50.000000");
        assert_eq!(rows[2], "A1,1,2,0,0,");
        assert_eq!(rows[3], "A1 - Image 1 average,1,,,,50.000000");
    }

    #[test]
    fn json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        write_result_json(&record(), &path).unwrap();
        let back: AnalysisResultRecord =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, record());
    }
}
