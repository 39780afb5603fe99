use imageproc::point::Point;

use std::path::Path;

/// Median of a channel sample. An even-sized sample averages the two middle
/// values, so the result is fractional. Returns `None` for an empty sample.
pub fn median(values: &mut [u8]) -> Option<f32> {
    let len = values.len();
    if len == 0 {
        return None;
    }
    values.sort_unstable();
    let mid = len / 2;
    if len % 2 == 1 {
        Some(values[mid] as f32)
    } else {
        Some((values[mid - 1] as f32 + values[mid] as f32) / 2.0)
    }
}

/// Polygon area enclosed by the contour points (shoelace formula).
///
/// The polygon runs through pixel centres, so a filled `w x h` block has an
/// area of `(w - 1) * (h - 1)` and a single pixel or a line has none.
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let doubled: i64 = points.iter().zip(points.iter().cycle().skip(1)).map(|(a, b)| {
        a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
    }).sum();
    (doubled as f64 / 2.0).abs()
}

/// jpg, jpeg and png, case insensitive
pub fn is_supported_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if ext == "png" || ext == "jpg" || ext == "jpeg"
    )
}
