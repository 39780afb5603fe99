//! Plate background color classification.
//!
//! The crop is converted to HSV on the 8 bit scale used by most vision
//! tooling (hue 0..180, saturation and value 0..256) and the median of each
//! channel is matched against an ordered rule list.

use image::RgbImage;
use palette::{ FromColor, Hsv, Srgb };

use std::fmt;

use crate::error::LprError;
use crate::utils;

/// Legal vehicle category inferred from the plate background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlateColorLabel {
    YellowCommercial,
    WhitePrivate,
    GreenElectric,
    BlueDiplomatic,
    RedGovernment,
    BlackCommercialRental,
    UncertainOther,
}

impl PlateColorLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlateColorLabel::YellowCommercial => "Yellow - Commercial",
            PlateColorLabel::WhitePrivate => "White - Private",
            PlateColorLabel::GreenElectric => "Green - Electric Vehicle",
            PlateColorLabel::BlueDiplomatic => "Blue - Diplomatic",
            PlateColorLabel::RedGovernment => "Red - Government",
            PlateColorLabel::BlackCommercialRental => "Black - Commercial/Rental",
            PlateColorLabel::UncertainOther => "Uncertain / Other",
        }
    }
}

impl fmt::Display for PlateColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Median HSV of a plate crop. Hue in 0..180, saturation and value in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRegionStats {
    pub median_hue: f32,
    pub median_saturation: f32,
    pub median_value: f32,
}

impl PixelRegionStats {

    pub fn new(median_hue: f32, median_saturation: f32, median_value: f32) -> Self {
        Self { median_hue, median_saturation, median_value }
    }

    /// Channel medians over every pixel of the crop.
    /// A crop without pixels is rejected with `InvalidRegion`.
    pub fn from_image(img: &RgbImage) -> Result<Self, LprError> {
        let (width, height) = img.dimensions();
        let len = (width as usize) * (height as usize);
        if len == 0 {
            return Err(LprError::invalid_region(width, height));
        }

        let mut hues = Vec::with_capacity(len);
        let mut sats = Vec::with_capacity(len);
        let mut vals = Vec::with_capacity(len);
        for pixel in img.pixels() {
            let [h, s, v] = rgb_to_hsv8(pixel.0);
            hues.push(h);
            sats.push(s);
            vals.push(v);
        }

        let median_hue = utils::median(&mut hues).ok_or_else(|| LprError::invalid_region(width, height))?;
        let median_saturation = utils::median(&mut sats).ok_or_else(|| LprError::invalid_region(width, height))?;
        let median_value = utils::median(&mut vals).ok_or_else(|| LprError::invalid_region(width, height))?;
        Ok(Self { median_hue, median_saturation, median_value })
    }
}

/// RGB to 8 bit HSV: hue is halved degrees so it fits a byte.
pub fn rgb_to_hsv8([r, g, b]: [u8; 3]) -> [u8; 3] {
    let hsv: Hsv = Hsv::from_color(Srgb::new(r, g, b).into_format::<f32>());
    let hue = (hsv.hue.into_positive_degrees() / 2.0).round() as u32 % 180;
    let saturation = (hsv.saturation * 255.0).round().min(255.0) as u8;
    let value = (hsv.value * 255.0).round().min(255.0) as u8;
    [hue as u8, saturation, value]
}

type Rule = fn(&PixelRegionStats) -> bool;

fn is_yellow(s: &PixelRegionStats) -> bool {
    15.0 < s.median_hue && s.median_hue < 35.0 && s.median_saturation > 80.0 && s.median_value > 100.0
}

fn is_white(s: &PixelRegionStats) -> bool {
    s.median_saturation < 40.0 && s.median_value > 150.0
}

fn is_green(s: &PixelRegionStats) -> bool {
    40.0 < s.median_hue && s.median_hue < 100.0 && s.median_saturation > 60.0
}

fn is_blue(s: &PixelRegionStats) -> bool {
    100.0 < s.median_hue && s.median_hue < 130.0 && s.median_saturation > 80.0
}

// red sits on both ends of the hue circle
fn is_red(s: &PixelRegionStats) -> bool {
    (s.median_hue < 10.0 || s.median_hue > 160.0) && s.median_saturation > 80.0
}

fn is_black(s: &PixelRegionStats) -> bool {
    s.median_value < 80.0
}

/// Evaluated top to bottom, first match wins. Yellow goes first because its
/// band overlaps the white and green readings.
const RULES: [(Rule, PlateColorLabel); 6] = [
    (is_yellow, PlateColorLabel::YellowCommercial),
    (is_white, PlateColorLabel::WhitePrivate),
    (is_green, PlateColorLabel::GreenElectric),
    (is_blue, PlateColorLabel::BlueDiplomatic),
    (is_red, PlateColorLabel::RedGovernment),
    (is_black, PlateColorLabel::BlackCommercialRental),
];

pub fn classify(stats: &PixelRegionStats) -> PlateColorLabel {
    RULES.iter()
        .find(|(rule, _)| rule(stats))
        .map(|(_, label)| *label)
        .unwrap_or(PlateColorLabel::UncertainOther)
}

/// Stats then classification in one go.
pub fn classify_image(img: &RgbImage) -> Result<PlateColorLabel, LprError> {
    let stats = PixelRegionStats::from_image(img)?;
    let label = classify(&stats);
    log::debug!("plate color stats {:?} -> {}", stats, label);
    Ok(label)
}
