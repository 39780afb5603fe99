//! Enhancement applied to a whole vehicle image before plates are cut out.
//! The grayscale result is what the text region stage works on; the color
//! crops are always taken from the untouched original.

use image::{ DynamicImage, GrayImage, imageops };
use imageproc::contrast;
use imageproc::filter::{ bilateral::GaussianEuclideanColorDistance, bilateral_filter };

// 9 pixel window
const DENOISE_RADIUS: u8 = 4;
const DENOISE_SPATIAL_SIGMA: f32 = 75.0;
const DENOISE_COLOR_SIGMA: f32 = 75.0;

// unit sum, so flat areas keep their intensity
const SHARPEN_KERNEL: [f32; 9] = [
    0.0, -1.0, 0.0,
    -1.0, 5.0, -1.0,
    0.0, -1.0, 0.0,
];

/// Edge preserving smoothing: neighbours across a strong intensity step
/// barely contribute, so character strokes keep their outline.
pub fn denoise(gray: &GrayImage) -> GrayImage {
    if gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }
    bilateral_filter(
        gray,
        DENOISE_RADIUS,
        DENOISE_SPATIAL_SIGMA,
        GaussianEuclideanColorDistance::new(DENOISE_COLOR_SIGMA),
    )
}

/// denoise, stretch contrast, then sharpen edges
pub fn enhance(img: &DynamicImage) -> GrayImage {
    let gray = img.to_luma8();
    if gray.width() == 0 || gray.height() == 0 {
        return gray;
    }
    let denoised = denoise(&gray);
    let equalized = contrast::equalize_histogram(&denoised);
    imageops::filter3x3(&equalized, &SHARPEN_KERNEL)
}
