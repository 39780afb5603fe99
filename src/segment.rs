//! Cutting detected plates out of vehicle images.
//!
//! Every plate yields two crops under the same file name: one from the
//! enhanced grayscale (for the text stage) and one from the original colors
//! (for the color stage). Sharing the name is what lets the two result
//! tables be joined later.

use image::{ DynamicImage, GenericImageView, GrayImage, RgbImage, imageops };

use std::fs;
use std::path::{ Path, PathBuf };

use crate::error::LprError;
use crate::region::BoundingBox;
use crate::PlateDetector;

/// `<stem>_plate_<index>.jpg`
pub fn plate_file_name(stem: &str, index: usize) -> String {
    format!("{}_plate_{}.jpg", stem, index)
}

/// Both crops of one plate.
#[derive(Debug, Clone)]
pub struct PlateCrop {
    /// position of the box in the detector output
    pub index: usize,
    pub bbox: BoundingBox,
    pub gray: GrayImage,
    pub color: RgbImage,
}

impl PlateCrop {
    pub fn file_name(&self, stem: &str) -> String {
        plate_file_name(stem, self.index)
    }
}

/// Detect plates on `raw` and crop each box from both images.
///
/// `enhanced` is normally `image_process::enhance(raw)`; boxes are clipped to
/// the area both images cover, and boxes left without pixels are skipped.
pub fn crop_plates<D: PlateDetector>(detector: &D, raw: &DynamicImage, enhanced: &GrayImage) -> Result<Vec<PlateCrop>, LprError> {
    let (raw_width, raw_height) = raw.dimensions();
    let width = raw_width.min(enhanced.width());
    let height = raw_height.min(enhanced.height());
    if (width, height) != (raw_width, raw_height) {
        log::warn!("enhanced image is {}x{}, original is {}x{}", enhanced.width(), enhanced.height(), raw_width, raw_height);
    }
    let rgb = raw.to_rgb8();

    let mut crops = Vec::new();
    for (index, a_box) in detector.detect(raw)?.into_iter().enumerate() {
        let a_box = a_box.clip(width, height);
        if a_box.is_empty() {
            log::warn!("skipping plate {}: {}", index, LprError::invalid_region(a_box.width(), a_box.height()));
            continue;
        }
        let gray = imageops::crop_imm(enhanced, a_box.x_min, a_box.y_min, a_box.width(), a_box.height()).to_image();
        let color = imageops::crop_imm(&rgb, a_box.x_min, a_box.y_min, a_box.width(), a_box.height()).to_image();
        crops.push(PlateCrop { index, bbox: a_box, gray, color });
    }
    Ok(crops)
}

/// Write each crop pair as `gray_dir/<name>` and `color_dir/<name>`, returning
/// the shared file names in crop order.
pub fn save_crops(crops: &[PlateCrop], stem: &str, gray_dir: impl AsRef<Path>, color_dir: impl AsRef<Path>) -> Result<Vec<String>, LprError> {
    let gray_dir = gray_dir.as_ref();
    let color_dir = color_dir.as_ref();
    fs::create_dir_all(gray_dir)?;
    fs::create_dir_all(color_dir)?;
    let mut names = Vec::with_capacity(crops.len());
    for crop in crops {
        let name = crop.file_name(stem);
        let gray_path: PathBuf = gray_dir.join(&name);
        let color_path: PathBuf = color_dir.join(&name);
        crop.gray.save(&gray_path)?;
        crop.color.save(&color_path)?;
        log::debug!("saved {} and {}", gray_path.display(), color_path.display());
        names.push(name);
    }
    Ok(names)
}
