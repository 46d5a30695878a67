// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan filter pipeline: binarization, colour enhancement, edge highlighting
// and background whitening for captured document pages.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use scanflow_core::{FilterKind, FilterOp, PageImage};
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;

/// Applies the scan filter catalog to a captured page.
///
/// Each method consumes `self` and returns the filtered enhancer, so a
/// composite catalog entry is just a chain of primitive operations.
pub struct ScanEnhancer {
    /// The working image (kept as `DynamicImage` for flexibility).
    image: DynamicImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    /// Create an enhancer wrapping an existing `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Start from a session page.
    pub fn from_page(page: &PageImage) -> Self {
        Self {
            image: page.as_dynamic().clone(),
        }
    }

    // -- Accessors ------------------------------------------------------------

    /// Borrow the current working image.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the enhancer and return the underlying image.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Catalog --------------------------------------------------------------

    /// Run every primitive operation of a catalog filter, in order.
    #[instrument(skip_all, fields(filter = %filter))]
    pub fn apply_filter(self, filter: FilterKind) -> Self {
        info!(ops = filter.ops().len(), "Applying scan filter");
        filter.ops().iter().fold(self, |enhancer, op| enhancer.apply(*op))
    }

    /// Run a single primitive operation.
    pub fn apply(self, op: FilterOp) -> Self {
        match op {
            FilterOp::PureBinarized => self.binarize_otsu(),
            FilterOp::ColorEnhanced => self.color_enhance(),
            FilterOp::EdgeHighlight => self.edge_highlight(),
            FilterOp::ColorDocument => self.color_document(),
            FilterOp::Grayscale => Self {
                image: ImageProcessor::from_dynamic(self.image).grayscale().into_dynamic(),
            },
            FilterOp::BlackAndWhite => self.black_and_white(),
        }
    }

    // -- Binarization ---------------------------------------------------------

    /// Apply adaptive thresholding to produce a black-and-white image.
    ///
    /// Uses a local mean approach: for each pixel, the threshold is the mean
    /// intensity within a `block_radius` neighbourhood, minus a constant `c`.
    /// Pixels darker than the local threshold become black; others become white.
    ///
    /// A typical `block_radius` is 15 and `c` is 10.
    #[instrument(skip(self), fields(block_radius, c))]
    pub fn binarize(self, block_radius: u32, c: i32) -> Self {
        debug!(block_radius, c, "Applying adaptive binarization");

        let gray = self.image.to_luma8();
        let (width, height) = gray.dimensions();
        let integral = compute_integral_image(&gray);

        let mut output = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let local_mean = region_mean(&integral, width, height, x, y, block_radius);
                let threshold = (local_mean as i32 - c).clamp(0, 255) as u8;
                let pixel_val = gray.get_pixel(x, y).0[0];
                let binary = if pixel_val < threshold { 0u8 } else { 255u8 };
                output.put_pixel(x, y, Luma([binary]));
            }
        }

        Self {
            image: DynamicImage::ImageLuma8(output),
        }
    }

    /// Global binarization with the threshold picked by Otsu's method.
    #[instrument(skip(self))]
    pub fn binarize_otsu(self) -> Self {
        let gray = self.image.to_luma8();
        let threshold = otsu_threshold(&gray);
        debug!(threshold, "Otsu threshold computed");

        let mut output = gray;
        for pixel in output.pixels_mut() {
            pixel.0[0] = if pixel.0[0] < threshold { 0 } else { 255 };
        }

        Self {
            image: DynamicImage::ImageLuma8(output),
        }
    }

    /// Grayscale, contrast boost (1.4) and adaptive binarization
    /// (block_radius=15, c=10). The recommended filter for text pages.
    #[instrument(skip(self))]
    pub fn black_and_white(self) -> Self {
        let processor = ImageProcessor::from_dynamic(self.image)
            .grayscale()
            .adjust_contrast(1.4);

        Self {
            image: processor.into_dynamic(),
        }
        .binarize(15, 10)
    }

    // -- Colour ---------------------------------------------------------------

    /// Punchier colours for photos and coloured forms: contrast 1.25,
    /// saturation 1.3.
    #[instrument(skip(self))]
    pub fn color_enhance(self) -> Self {
        let processor = ImageProcessor::from_dynamic(self.image)
            .adjust_contrast(1.25)
            .adjust_saturation(1.3);
        Self {
            image: processor.into_dynamic(),
        }
    }

    /// Emphasise strokes and edges with an unsharp mask.
    #[instrument(skip(self))]
    pub fn edge_highlight(self) -> Self {
        Self {
            image: ImageProcessor::from_dynamic(self.image)
                .sharpen(1.5, 4)
                .into_dynamic(),
        }
    }

    /// Whiten the paper background of a colour document while keeping ink
    /// colours.
    ///
    /// Each pixel is divided by a heavily blurred estimate of the local
    /// background luminance, so shadows and uneven lighting flatten to white.
    #[instrument(skip(self))]
    pub fn color_document(self) -> Self {
        let rgba = self.image.to_rgba8();
        let background = gaussian_blur_f32(&self.image.to_luma8(), 12.0);

        let mut output = rgba;
        for (x, y, pixel) in output.enumerate_pixels_mut() {
            let bg = background.get_pixel(x, y).0[0].max(1) as f32;
            let gain = 255.0 / bg;
            for channel in pixel.0.iter_mut().take(3) {
                *channel = (*channel as f32 * gain).clamp(0.0, 255.0) as u8;
            }
        }

        debug!("Background normalisation complete");
        Self {
            image: DynamicImage::ImageRgba8(output),
        }
    }
}

// -- Helpers ------------------------------------------------------------------

/// Build a summed-area table for the grayscale image.
///
/// `integral[y * (width+1) + x]` contains the sum of all pixel values in the
/// rectangle [0, 0) to (x, y) (exclusive on both axes). The table has
/// dimensions `(width+1) x (height+1)` with a zero-padded border.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean pixel value within a square region centred on (cx, cy) with the given
/// radius, using the precomputed integral image.
fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(img_width as usize);
    let y2 = ((cy + radius + 1) as usize).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    // S = I[y2][x2] - I[y1][x2] - I[y2][x1] + I[y1][x1]
    let sum = integral[y2 * stride + x2] as f64
        - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

/// Otsu threshold: the value that maximises the between-class variance of
/// the dark and light pixel groups.
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            // The dark class is [0, t]; everything above it is light.
            best_threshold = (t as u8).saturating_add(1);
        }
    }

    best_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Dark text block on a light page.
    fn page(width: u32, height: u32) -> DynamicImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([220u8]));
        for y in height / 3..2 * height / 3 {
            for x in width / 4..3 * width / 4 {
                img.put_pixel(x, y, Luma([35u8]));
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    fn values(image: &DynamicImage) -> Vec<u8> {
        image.to_luma8().pixels().map(|p| p.0[0]).collect()
    }

    #[test]
    fn otsu_separates_two_levels() {
        let gray = page(40, 30).to_luma8();
        let threshold = otsu_threshold(&gray);
        assert!(threshold > 35 && threshold <= 220, "threshold {threshold}");
    }

    #[test]
    fn otsu_of_empty_image_is_midpoint() {
        assert_eq!(otsu_threshold(&GrayImage::new(0, 0)), 128);
    }

    #[test]
    fn pure_binarized_output_is_two_tone() {
        let out = ScanEnhancer::from_dynamic(page(40, 30))
            .apply_filter(FilterKind::PureBinarized)
            .into_dynamic();
        assert!(values(&out).iter().all(|v| *v == 0 || *v == 255));
        assert_eq!(out.to_luma8().get_pixel(0, 0).0[0], 255);
        assert_eq!(out.to_luma8().get_pixel(20, 15).0[0], 0);
    }

    #[test]
    fn black_and_white_output_is_two_tone() {
        let out = ScanEnhancer::from_dynamic(page(40, 30))
            .apply_filter(FilterKind::BlackAndWhite)
            .into_dynamic();
        assert!(values(&out).iter().all(|v| *v == 0 || *v == 255));
        assert_eq!((out.width(), out.height()), (40, 30));
    }

    #[test]
    fn none_filter_changes_nothing() {
        let input = page(10, 10);
        let out = ScanEnhancer::from_dynamic(input.clone())
            .apply_filter(FilterKind::None)
            .into_dynamic();
        assert_eq!(values(&out), values(&input));
    }

    #[test]
    fn color_document_whitens_uniform_background() {
        let img = RgbaImage::from_pixel(24, 24, Rgba([180, 180, 180, 255]));
        let out = ScanEnhancer::from_dynamic(DynamicImage::ImageRgba8(img))
            .apply_filter(FilterKind::ColorDocument)
            .into_dynamic()
            .to_rgba8();
        let Rgba([r, g, b, a]) = *out.get_pixel(12, 12);
        assert!(r >= 250 && g >= 250 && b >= 250, "got {r},{g},{b}");
        assert_eq!(a, 255);
    }

    #[test]
    fn composite_filter_keeps_dimensions() {
        let out = ScanEnhancer::from_dynamic(page(33, 17))
            .apply_filter(FilterKind::ColorEnhanced)
            .into_dynamic();
        assert_eq!((out.width(), out.height()), (33, 17));
    }

    #[test]
    fn region_mean_of_constant_image() {
        let gray = GrayImage::from_pixel(8, 8, Luma([100u8]));
        let integral = compute_integral_image(&gray);
        let mean = region_mean(&integral, 8, 8, 0, 0, 3);
        assert!((mean - 100.0).abs() < 1e-9);
    }
}
