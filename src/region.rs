//! Text region extraction ahead of OCR.
//!
//! The plate crop is binarized, tiny contours are discarded as noise and the
//! remaining contours' bounding rectangles are merged into one box. The crop
//! is then cut to that box, scaled up to a minimum width, framed with a white
//! border and binarized once more for the OCR engine.

use image::{ GrayImage, Luma, imageops::{ self, FilterType } };
use imageproc::contours::{ self, BorderType };
use imageproc::contrast::{ self, ThresholdType };
use imageproc::point::Point;

use std::path::Path;

use crate::error::LprError;
use crate::utils;

/// Axis aligned box in pixel coordinates. `x_max` and `y_max` are exclusive,
/// so `x_max - x_min` is the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl BoundingBox {

    /// Corners in any order; they are sorted so that min <= max holds.
    pub fn new(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
        Self {
            x_min: x_min.min(x_max),
            y_min: y_min.min(y_max),
            x_max: x_min.max(x_max),
            y_max: y_min.max(y_max),
        }
    }

    /// Bounding rectangle of a point set, inclusive of the last pixel.
    pub fn from_points(points: &[Point<i32>]) -> Option<Self> {
        let first = points.first()?;
        let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
        for p in points {
            x_min = x_min.min(p.x);
            y_min = y_min.min(p.y);
            x_max = x_max.max(p.x);
            y_max = y_max.max(p.y);
        }
        let clamp = |v: i32| v.max(0) as u32;
        Some(Self::new(clamp(x_min), clamp(y_min), clamp(x_max) + 1, clamp(y_max) + 1))
    }

    pub fn width(&self) -> u32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Keep the box inside a `width x height` image.
    pub fn clip(&self, width: u32, height: u32) -> BoundingBox {
        BoundingBox::new(
            self.x_min.min(width),
            self.y_min.min(height),
            self.x_max.min(width),
            self.y_max.min(height),
        )
    }

    /// Grow by `padding` on every side, then clip to the image.
    pub fn pad(&self, padding: u32, width: u32, height: u32) -> BoundingBox {
        BoundingBox::new(
            self.x_min.saturating_sub(padding),
            self.y_min.saturating_sub(padding),
            self.x_max.saturating_add(padding),
            self.y_max.saturating_add(padding),
        ).clip(width, height)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegionOptions {
    /// Contours with an area at or below this are noise.
    pub min_contour_area: f64,
    /// Added around the merged text box before cropping.
    pub padding: u32,
    /// Narrower crops are scaled up to exactly this width.
    pub min_width: u32,
    /// White frame added after scaling.
    pub border: u32,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            min_contour_area: 50.0,
            padding: 5,
            min_width: 400,
            border: 5,
        }
    }
}

/// Otsu binarization, foreground is 255.
pub fn binarize(gray: &GrayImage) -> GrayImage {
    let level = contrast::otsu_level(gray);
    log::debug!("otsu level {}", level);
    contrast::threshold(gray, level, ThresholdType::Binary)
}

/// Decode an image file straight to grayscale.
pub fn load_gray(path: impl AsRef<Path>) -> Result<GrayImage, LprError> {
    let img = image::open(path)?;
    Ok(img.to_luma8())
}

#[derive(Debug, Clone, Default)]
pub struct TextRegionExtractor {
    options: RegionOptions,
}

impl TextRegionExtractor {

    pub fn new(options: RegionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RegionOptions {
        &self.options
    }

    /// Union of the bounding rectangles of every outermost contour whose
    /// area exceeds the noise threshold. `None` when nothing qualifies.
    pub fn text_bounds(&self, binary: &GrayImage) -> Option<BoundingBox> {
        let min_area = self.options.min_contour_area;
        contours::find_contours::<i32>(binary)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter(|c| utils::contour_area(&c.points) > min_area)
            .filter_map(|c| BoundingBox::from_points(&c.points))
            .fold(None, |acc: Option<BoundingBox>, b| match acc {
                Some(acc) => Some(acc.union(&b)),
                None => Some(b),
            })
    }

    /// Cut the grayscale crop down to its padded text box. Without any text
    /// contour the crop comes back untouched.
    pub fn crop_to_text(&self, gray: &GrayImage) -> GrayImage {
        let (width, height) = gray.dimensions();
        let binary = binarize(gray);
        match self.text_bounds(&binary) {
            Some(bounds) => {
                let b = bounds.pad(self.options.padding, width, height);
                log::debug!("text box {:?} in {}x{}", b, width, height);
                imageops::crop_imm(gray, b.x_min, b.y_min, b.width(), b.height()).to_image()
            },
            None => gray.clone(),
        }
    }

    /// Same factor on both axes so that the width reaches `min_width`.
    pub fn upscale(&self, img: &GrayImage) -> GrayImage {
        let (width, height) = img.dimensions();
        let min_width = self.options.min_width;
        if width == 0 || width >= min_width {
            return img.clone();
        }
        let scale = min_width as f32 / width as f32;
        let new_height = ((height as f32 * scale).round() as u32).max(1);
        log::debug!("scaling {}x{} by {:.3}", width, height, scale);
        imageops::resize(img, min_width, new_height, FilterType::CatmullRom)
    }

    pub fn add_border(&self, img: &GrayImage) -> GrayImage {
        let border = self.options.border;
        let (width, height) = img.dimensions();
        let mut framed = GrayImage::from_pixel(width + 2 * border, height + 2 * border, Luma([255]));
        imageops::replace(&mut framed, img, border as i64, border as i64);
        framed
    }

    /// Full preparation of a grayscale plate crop for OCR.
    pub fn extract(&self, gray: &GrayImage) -> Result<GrayImage, LprError> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(LprError::invalid_region(width, height));
        }
        let cropped = self.crop_to_text(gray);
        let scaled = self.upscale(&cropped);
        let framed = self.add_border(&scaled);
        Ok(binarize(&framed))
    }
}


#[cfg(test)]
mod test {

    use image::{ GrayImage, Luma };
    use imageproc::point::Point;

    use std::error::Error;

    use crate::error::LprErrorKind;
    use super::{ BoundingBox, RegionOptions, TextRegionExtractor, load_gray };

    fn fill(img: &mut GrayImage, x: u32, y: u32, width: u32, height: u32) {
        for yy in y..y + height {
            for xx in x..x + width {
                img.put_pixel(xx, yy, Luma([255]));
            }
        }
    }

    #[test]
    fn box_from_points_is_inclusive() {
        let points = vec![Point::new(3, 4), Point::new(7, 2), Point::new(5, 9)];
        assert_eq!(BoundingBox::from_points(&points), Some(BoundingBox::new(3, 2, 8, 10)));
        assert_eq!(BoundingBox::from_points(&[]), None);
    }

    #[test]
    fn box_padding_is_clamped() {
        let b = BoundingBox::new(2, 10, 20, 18).pad(5, 22, 40);
        assert_eq!(b, BoundingBox::new(0, 5, 22, 23));
        assert!(b.x_min <= b.x_max && b.y_min <= b.y_max);
        assert_eq!(BoundingBox::new(9, 9, 1, 1), BoundingBox::new(1, 1, 9, 9));
    }

    #[test]
    fn blank_image_is_not_cropped() {
        let extractor = TextRegionExtractor::default();
        let img = GrayImage::new(120, 30);
        assert_eq!(extractor.text_bounds(&img), None);
        let cropped = extractor.crop_to_text(&img);
        assert_eq!(cropped.dimensions(), img.dimensions());
        assert_eq!(cropped, img);
    }

    #[test]
    fn small_contours_are_noise() {
        let extractor = TextRegionExtractor::default();
        let mut img = GrayImage::new(100, 60);
        // 6x7 block: area 30
        fill(&mut img, 5, 5, 6, 7);
        // 15x16 block: area 210
        fill(&mut img, 50, 30, 15, 16);

        assert_eq!(extractor.text_bounds(&img), Some(BoundingBox::new(50, 30, 65, 46)));
        let cropped = extractor.crop_to_text(&img);
        assert_eq!(cropped.dimensions(), (25, 26));
    }

    #[test]
    fn boxes_of_several_contours_are_merged() {
        let extractor = TextRegionExtractor::default();
        let mut img = GrayImage::new(200, 50);
        fill(&mut img, 20, 10, 10, 20);
        fill(&mut img, 60, 15, 10, 25);
        fill(&mut img, 120, 12, 10, 20);
        assert_eq!(extractor.text_bounds(&img), Some(BoundingBox::new(20, 10, 130, 40)));
    }

    #[test]
    fn narrow_crop_is_scaled_and_framed() -> Result<(), Box<dyn Error>> {
        let extractor = TextRegionExtractor::default();
        let mut img = GrayImage::new(150, 40);
        fill(&mut img, 20, 10, 110, 20);

        // text box 120x30 after padding, scaled to 400x100, then a 5px frame
        let out = extractor.extract(&img)?;
        assert_eq!(out.dimensions(), (410, 110));
        assert_eq!(out.get_pixel(0, 0), &Luma([255]));
        assert_eq!(out.get_pixel(409, 109), &Luma([255]));
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        Ok(())
    }

    #[test]
    fn wide_crop_keeps_its_size() -> Result<(), Box<dyn Error>> {
        let extractor = TextRegionExtractor::new(RegionOptions { min_width: 100, ..RegionOptions::default() });
        let img = GrayImage::new(150, 40);
        let out = extractor.extract(&img)?;
        assert_eq!(out.dimensions(), (160, 50));
        Ok(())
    }

    #[test]
    fn empty_crop_is_rejected() {
        let extractor = TextRegionExtractor::default();
        let err = extractor.extract(&GrayImage::new(0, 0)).unwrap_err();
        assert!(matches!(err.kind(), LprErrorKind::InvalidRegion { .. }));
    }

    #[test]
    fn undecodable_file_is_unreadable() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png")?;
        let err = load_gray(&path).unwrap_err();
        assert!(matches!(err.kind(), LprErrorKind::UnreadableImage(_)));
        Ok(())
    }
}
