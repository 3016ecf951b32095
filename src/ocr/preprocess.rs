//! Raster page preparation for OCR.
//!
//! Fixed pipeline: grayscale, median denoise, CLAHE contrast enhancement,
//! moment-based deskew, Otsu binarization. Deterministic for identical
//! input pixels.

use image::{DynamicImage, GrayImage, Luma};

/// CLAHE clip limit.
const CLIP_LIMIT: f32 = 2.0;
/// CLAHE tile grid (8x8 tiles).
const TILE_GRID: u32 = 8;
/// Rotations below this angle (degrees) are skipped.
const MIN_DESKEW_ANGLE: f64 = 0.1;

/// Run the full preprocessing pipeline on a page image.
///
/// Output is strictly two-level (0 or 255). Binarization is a fixed point:
/// feeding a binarized image back through [`otsu_binarize`] leaves it
/// unchanged.
pub fn prepare_page(input: &DynamicImage) -> GrayImage {
    let gray = input.to_luma8();
    let denoised = median_denoise(&gray);
    let enhanced = clahe(&denoised);
    let deskewed = deskew(&enhanced);
    otsu_binarize(&deskewed)
}

/// 3x3 median filter.
pub fn median_denoise(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    let mut window = [0u8; 9];

    for y in 0..h {
        for x in 0..w {
            let mut n = 0;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let sx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
                    let sy = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
                    window[n] = img.get_pixel(sx, sy)[0];
                    n += 1;
                }
            }
            window.sort_unstable();
            out.put_pixel(x, y, Luma([window[4]]));
        }
    }
    out
}

/// Contrast-limited adaptive histogram equalization.
///
/// Per-tile clipped histograms with the clipped excess redistributed
/// uniformly, then bilinear interpolation between the four surrounding tile
/// lookup tables for each pixel.
pub fn clahe(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }

    let tiles_x = TILE_GRID.min(w).max(1);
    let tiles_y = TILE_GRID.min(h).max(1);
    let tile_w = w.div_ceil(tiles_x);
    let tile_h = h.div_ceil(tiles_y);

    // Build one equalization LUT per tile.
    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            let count = (x1 - x0) * (y1 - y0);
            let clip = ((CLIP_LIMIT * count as f32 / 256.0).max(1.0)) as u32;

            // Clip and redistribute the excess uniformly.
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            let share = excess / 256;
            let mut rem = excess % 256;
            for bin in hist.iter_mut() {
                *bin += share;
                if rem > 0 {
                    *bin += 1;
                    rem -= 1;
                }
            }

            let lut = &mut luts[(ty * tiles_x + tx) as usize];
            let scale = 255.0 / count.max(1) as f32;
            let mut cdf = 0u32;
            for (level, bin) in hist.iter().enumerate() {
                cdf += *bin;
                lut[level] = (cdf as f32 * scale).round().min(255.0) as u8;
            }
        }
    }

    // Interpolate between tile LUTs.
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let ty0 = (fy.floor().max(0.0) as u32).min(tiles_y - 1);
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let wy = (fy - fy.floor()).clamp(0.0, 1.0);

        for x in 0..w {
            let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let tx0 = (fx.floor().max(0.0) as u32).min(tiles_x - 1);
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let wx = (fx - fx.floor()).clamp(0.0, 1.0);

            let v = img.get_pixel(x, y)[0] as usize;
            let tl = luts[(ty0 * tiles_x + tx0) as usize][v] as f32;
            let tr = luts[(ty0 * tiles_x + tx1) as usize][v] as f32;
            let bl = luts[(ty1 * tiles_x + tx0) as usize][v] as f32;
            let br = luts[(ty1 * tiles_x + tx1) as usize][v] as f32;

            let top = tl + (tr - tl) * wx;
            let bottom = bl + (br - bl) * wx;
            let value = top + (bottom - top) * wy;
            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Estimate the dominant text-block rotation and rotate it out.
///
/// Foreground pixels (darker than the Otsu level) vote via second-order
/// central moments; the resulting axis angle is folded into (-45, 45]
/// before the image is rotated about its center by the negative angle.
pub fn deskew(img: &GrayImage) -> GrayImage {
    let angle = estimate_skew_angle(img);
    if angle.abs() < MIN_DESKEW_ANGLE {
        return img.clone();
    }
    rotate_about_center(img, -angle)
}

/// Estimate the skew angle of the foreground in degrees.
///
/// The angle of the second-order central-moment axis equals the
/// orientation a minimum-area bounding rectangle reports for an
/// elongated point cloud, so text blocks get the same correction
/// without a convex-hull pass.
pub fn estimate_skew_angle(img: &GrayImage) -> f64 {
    let threshold = otsu_level(img);

    // Accumulate moments of foreground (dark) pixels.
    let mut count = 0u64;
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;
    for (x, y, p) in img.enumerate_pixels() {
        if p[0] < threshold {
            count += 1;
            sum_x += x as f64;
            sum_y += y as f64;
        }
    }
    // Too little foreground for a meaningful estimate.
    if count < 64 {
        return 0.0;
    }

    let cx = sum_x / count as f64;
    let cy = sum_y / count as f64;
    let mut mu20 = 0.0f64;
    let mut mu02 = 0.0f64;
    let mut mu11 = 0.0f64;
    for (x, y, p) in img.enumerate_pixels() {
        if p[0] < threshold {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            mu20 += dx * dx;
            mu02 += dy * dy;
            mu11 += dx * dy;
        }
    }

    if mu11.abs() < f64::EPSILON && (mu20 - mu02).abs() < f64::EPSILON {
        return 0.0;
    }

    let mut angle = 0.5 * (2.0 * mu11).atan2(mu20 - mu02).to_degrees();

    // Fold into (-45, 45]: the dominant axis of a text block is within a
    // quarter turn of horizontal.
    while angle > 45.0 {
        angle -= 90.0;
    }
    while angle <= -45.0 {
        angle += 90.0;
    }
    angle
}

/// Rotate about the image center by `degrees`, bicubic interpolation,
/// edge-replicated sampling for out-of-bounds source coordinates.
pub fn rotate_about_center(img: &GrayImage, degrees: f64) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    let cx = (w as f64 - 1.0) / 2.0;
    let cy = (h as f64 - 1.0) / 2.0;
    let rad = degrees.to_radians();
    let (sin, cos) = rad.sin_cos();

    for y in 0..h {
        for x in 0..w {
            // Inverse mapping: destination pixel back to source coordinates.
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            let sx = cos * dx + sin * dy + cx;
            let sy = -sin * dx + cos * dy + cy;
            out.put_pixel(x, y, Luma([sample_bicubic(img, sx, sy)]));
        }
    }
    out
}

/// Catmull-Rom bicubic kernel weight.
fn cubic_weight(t: f64) -> f64 {
    let a = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        (a + 2.0) * t * t * t - (a + 3.0) * t * t + 1.0
    } else if t < 2.0 {
        a * t * t * t - 5.0 * a * t * t + 8.0 * a * t - 4.0 * a
    } else {
        0.0
    }
}

fn sample_bicubic(img: &GrayImage, sx: f64, sy: f64) -> u8 {
    let (w, h) = img.dimensions();
    let x0 = sx.floor() as i64;
    let y0 = sy.floor() as i64;
    let fx = sx - x0 as f64;
    let fy = sy - y0 as f64;

    let mut acc = 0.0f64;
    let mut weight_sum = 0.0f64;
    for m in -1i64..=2 {
        let wy = cubic_weight(m as f64 - fy);
        if wy == 0.0 {
            continue;
        }
        // Edge replication: clamp source coordinates into bounds.
        let py = (y0 + m).clamp(0, h as i64 - 1) as u32;
        for n in -1i64..=2 {
            let wx = cubic_weight(n as f64 - fx);
            if wx == 0.0 {
                continue;
            }
            let px = (x0 + n).clamp(0, w as i64 - 1) as u32;
            acc += img.get_pixel(px, py)[0] as f64 * wx * wy;
            weight_sum += wx * wy;
        }
    }
    (acc / weight_sum).round().clamp(0.0, 255.0) as u8
}

/// Otsu's automatic threshold level: the level maximizing between-class
/// variance over the histogram.
pub fn otsu_level(img: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for p in img.pixels() {
        hist[p[0] as usize] += 1;
    }

    let total: u64 = hist.iter().sum();
    if total == 0 {
        return 0;
    }
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut best_level = 0u8;
    let mut best_variance = 0.0f64;
    let mut weight_bg = 0u64;
    let mut sum_bg = 0.0f64;

    for level in 0..256usize {
        weight_bg += hist[level];
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += level as f64 * hist[level] as f64;

        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let variance =
            weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg) * (mean_bg - mean_fg);

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }
    best_level
}

/// Global binarization via Otsu's method: strictly two-level output.
pub fn otsu_binarize(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    for (x, y, p) in img.enumerate_pixels() {
        out.put_pixel(x, y, Luma([if p[0] > level { 255 } else { 0 }]));
    }
    out
}
