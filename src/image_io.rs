use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::errors::{MliError, Result};

/// Extensions accepted when scanning an input directory
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// An image submitted for analysis, still in its encoded form
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub image_id: String,
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(image_id: impl Into<String>, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            image_id: image_id.into(),
            name: name.into(),
            bytes,
        }
    }
}

/// Get all supported image files from a directory (recursively), sorted by path
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.is_dir() {
        return Err(MliError::InvalidPath(dir_path.to_path_buf()));
    }

    let mut files = Vec::new();
    find_image_files_recursive(dir_path, &mut files)?;
    files.sort();

    Ok(files)
}

fn find_image_files_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();

        if path.is_dir() {
            find_image_files_recursive(&path, result)?;
        } else if is_supported_image(&path) {
            result.push(path);
        }
    }

    Ok(())
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read an image file into an `ImageInput`, using the file name as id and name
pub fn load_input<P: AsRef<Path>>(path: P) -> Result<ImageInput> {
    let path = path.as_ref();

    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| MliError::InvalidPath(path.to_path_buf()))?
        .to_string();
    let image_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&name)
        .to_string();

    let bytes = fs::read(path)?;

    Ok(ImageInput::new(image_id, name, bytes))
}

/// Decode raw bytes into a raster image
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(MliError::Decode("empty image buffer".to_string()));
    }

    image::load_from_memory(bytes).map_err(|e| MliError::Decode(e.to_string()))
}

/// Encode an RGB buffer as PNG bytes
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Save an RGB image to the specified path as PNG
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;

    Ok(())
}
