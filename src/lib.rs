use image::{ DynamicImage, GenericImageView, GrayImage, RgbImage, imageops };
use imageproc::{ drawing, rect };

pub mod utils;
pub mod error;
pub mod image_process;
pub mod color;
pub mod text;
pub mod region;
pub mod report;
pub mod segment;

pub use color::{ PixelRegionStats, PlateColorLabel };
pub use error::{ LprError, LprErrorKind };
pub use region::{ BoundingBox, RegionOptions, TextRegionExtractor };
pub use segment::{ plate_file_name, PlateCrop };
pub use text::{ PlateNormalizer, RawOcrToken, RawPlateString, UNREADABLE };

/// Finds plates in a vehicle image. Boxes may reach past the image edge,
/// they are clipped before use.
pub trait PlateDetector {
    fn detect(&self, img: &DynamicImage) -> Result<Vec<BoundingBox>, LprError>;
}

/// Reads text off a binarized plate crop, fragments in reading order.
pub trait TextReader {
    fn read_text(&self, img: &GrayImage) -> Result<Vec<RawOcrToken>, LprError>;
}

/// For inputs that are already plate crops: the whole frame is the plate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullFrameDetector;

impl PlateDetector for FullFrameDetector {
    fn detect(&self, img: &DynamicImage) -> Result<Vec<BoundingBox>, LprError> {
        let (width, height) = img.dimensions();
        Ok(vec![BoundingBox::new(0, 0, width, height)])
    }
}

/// Result for one detected plate.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateReading {
    /// position of the box in the detector output
    pub index: usize,
    pub bbox: BoundingBox,
    pub color: PlateColorLabel,
    pub text: String,
}

pub struct Lpr<D, R> {
    detector: D,
    reader: R,
    extractor: TextRegionExtractor,
    normalizer: PlateNormalizer,
}

impl<D: PlateDetector, R: TextReader> Lpr<D, R> {

    pub fn new(detector: D, reader: R) -> Result<Self, LprError> {
        Self::with_options(detector, reader, RegionOptions::default())
    }

    pub fn with_options(detector: D, reader: R, options: RegionOptions) -> Result<Self, LprError> {
        let normalizer = PlateNormalizer::new()?;
        let extractor = TextRegionExtractor::new(options);
        Ok(Lpr { detector, reader, extractor, normalizer })
    }

    /// Recognize every plate in one image.
    ///
    /// Color comes from the original pixels, text from the enhanced
    /// grayscale. Boxes without pixels after clipping are skipped.
    pub fn recognize(&self, img: &DynamicImage) -> Result<Vec<PlateReading>, LprError> {
        let enhanced = image_process::enhance(img);
        let crops = segment::crop_plates(&self.detector, img, &enhanced)?;
        log::debug!("{} plate crops", crops.len());
        let mut readings = Vec::with_capacity(crops.len());
        for crop in crops {
            let color = color::classify_image(&crop.color)?;
            let text = self.read_crop(&crop.gray)?;
            log::info!("plate {} -> {} / {}", crop.index, text, color);
            readings.push(PlateReading { index: crop.index, bbox: crop.bbox, color, text });
        }
        Ok(readings)
    }

    pub fn plate_color(&self, rgb: &RgbImage, a_box: &BoundingBox) -> Result<PlateColorLabel, LprError> {
        let crop = imageops::crop_imm(rgb, a_box.x_min, a_box.y_min, a_box.width(), a_box.height()).to_image();
        color::classify_image(&crop)
    }

    pub fn plate_text(&self, gray: &GrayImage, a_box: &BoundingBox) -> Result<String, LprError> {
        let crop = imageops::crop_imm(gray, a_box.x_min, a_box.y_min, a_box.width(), a_box.height()).to_image();
        self.read_crop(&crop)
    }

    /// text of a grayscale plate crop, `unreadable` when nothing survives
    pub fn read_crop(&self, crop: &GrayImage) -> Result<String, LprError> {
        let prepared = self.extractor.extract(crop)?;
        let tokens = self.reader.read_text(&prepared)?;
        Ok(self.normalizer.plate_text(&tokens))
    }
}

impl PlateReading {
    /// name of the plate's crop files, see `segment::save_crops`
    pub fn file_name(&self, stem: &str) -> String {
        plate_file_name(stem, self.index)
    }
}

/// Red frame around every recognized plate.
pub fn annotate(img: &DynamicImage, readings: &[PlateReading]) -> RgbImage {
    let mut annotated = img.to_rgb8();
    for reading in readings {
        let b = &reading.bbox;
        let rect = rect::Rect::at(b.x_min as i32, b.y_min as i32).of_size(b.width(), b.height());
        drawing::draw_hollow_rect_mut(&mut annotated, rect, image::Rgb([255, 0, 0]));
    }
    annotated
}


#[cfg(test)]
mod test {

    use image::{ DynamicImage, GrayImage, ImageBuffer, Rgb };

    use std::cell::RefCell;
    use std::error::Error;

    use super::{ annotate, BoundingBox, FullFrameDetector, Lpr, LprError, PlateColorLabel, PlateDetector, RawOcrToken, TextReader, UNREADABLE };

    struct FixedBoxes(Vec<BoundingBox>);

    impl PlateDetector for FixedBoxes {
        fn detect(&self, _img: &DynamicImage) -> Result<Vec<BoundingBox>, LprError> {
            Ok(self.0.clone())
        }
    }

    /// hands out canned fragments and remembers the crop sizes it saw
    struct ScriptedReader {
        replies: RefCell<Vec<Vec<RawOcrToken>>>,
        seen: RefCell<Vec<(u32, u32)>>,
    }

    impl ScriptedReader {
        fn new(replies: Vec<Vec<RawOcrToken>>) -> Self {
            Self { replies: RefCell::new(replies), seen: RefCell::new(Vec::new()) }
        }
    }

    impl TextReader for ScriptedReader {
        fn read_text(&self, img: &GrayImage) -> Result<Vec<RawOcrToken>, LprError> {
            self.seen.borrow_mut().push(img.dimensions());
            let mut replies = self.replies.borrow_mut();
            if replies.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(replies.remove(0))
            }
        }
    }

    // yellow plate on the left, white plate on the right, grey car body
    fn two_plate_image() -> DynamicImage {
        let img = ImageBuffer::from_fn(200, 60, |x, y| {
            if (10..90).contains(&x) && (20..40).contains(&y) {
                Rgb([255, 204, 0])
            } else if (110..190).contains(&x) && (20..40).contains(&y) {
                Rgb([240, 240, 240])
            } else {
                Rgb([90, 90, 100])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn recognize_two_plates() -> Result<(), Box<dyn Error>> {
        let detector = FixedBoxes(vec![BoundingBox::new(10, 20, 90, 40), BoundingBox::new(110, 20, 190, 40)]);
        let reader = ScriptedReader::new(vec![
            vec![RawOcrToken::new("mho2", 0.8), RawOcrToken::new("dn 87I8", 0.6)],
            vec![],
        ]);
        let lpr = Lpr::new(detector, reader)?;
        let readings = lpr.recognize(&two_plate_image())?;

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].color, PlateColorLabel::YellowCommercial);
        assert_eq!(readings[0].text, "MH02DN8718");
        assert_eq!(readings[1].color, PlateColorLabel::WhitePrivate);
        assert_eq!(readings[1].text, UNREADABLE);
        // every crop handed to the reader is at least the minimum width plus its frame
        assert!(lpr.reader.seen.borrow().iter().all(|&(w, _)| w >= 410));
        Ok(())
    }

    #[test]
    fn boxes_outside_the_image_are_skipped() -> Result<(), Box<dyn Error>> {
        let detector = FixedBoxes(vec![BoundingBox::new(300, 0, 320, 10), BoundingBox::new(150, 30, 260, 90)]);
        let lpr = Lpr::new(detector, ScriptedReader::new(vec![]))?;
        let readings = lpr.recognize(&two_plate_image())?;

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].index, 1);
        assert_eq!(readings[0].bbox, BoundingBox::new(150, 30, 200, 60));
        assert_eq!(readings[0].text, UNREADABLE);
        assert_eq!(readings[0].file_name("car"), "car_plate_1.jpg");
        Ok(())
    }

    #[test]
    fn full_frame_crop() -> Result<(), Box<dyn Error>> {
        let plate = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(120, 30, Rgb([0, 40, 200])));
        let reader = ScriptedReader::new(vec![vec![RawOcrToken::new("DL01CA1234", 0.9)]]);
        let lpr = Lpr::new(FullFrameDetector, reader)?;
        let readings = lpr.recognize(&plate)?;

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].bbox, BoundingBox::new(0, 0, 120, 30));
        assert_eq!(readings[0].color, PlateColorLabel::BlueDiplomatic);
        assert_eq!(readings[0].text, "DL01CA1234");
        Ok(())
    }

    #[test]
    fn annotate_draws_frames() -> Result<(), Box<dyn Error>> {
        let img = two_plate_image();
        let detector = FixedBoxes(vec![BoundingBox::new(10, 20, 90, 40)]);
        let lpr = Lpr::new(detector, ScriptedReader::new(vec![]))?;
        let readings = lpr.recognize(&img)?;
        let annotated = annotate(&img, &readings);

        assert_eq!(annotated.dimensions(), (200, 60));
        assert_eq!(annotated.get_pixel(10, 20), &Rgb([255, 0, 0]));
        assert_eq!(annotated.get_pixel(89, 39), &Rgb([255, 0, 0]));
        assert_eq!(annotated.get_pixel(50, 30), &Rgb([255, 204, 0]));
        Ok(())
    }
}
