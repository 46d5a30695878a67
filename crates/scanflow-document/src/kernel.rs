// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `TransformKernel` implementation backed by `ImageProcessor` and
// `ScanEnhancer`.

use scanflow_core::error::{Result, ScanError};
use scanflow_core::{CropRegion, FilterKind, PageImage, TransformKernel};
use tracing::{debug, instrument};

use crate::image::processor::ImageProcessor;
use crate::scan::enhance::ScanEnhancer;

/// Reference kernel used by the transform worker.
///
/// Stateless; share one instance behind an `Arc` across every editing view.
#[derive(Debug, Clone, Default)]
pub struct ImageKernel {
    /// Crops narrower or shorter than this fraction of the page are refused.
    min_crop_extent: f32,
}

impl ImageKernel {
    pub fn new(min_crop_extent: f32) -> Self {
        Self { min_crop_extent }
    }
}

fn ensure_not_empty(image: &PageImage) -> Result<()> {
    if image.is_empty() {
        return Err(ScanError::InvalidImage(format!(
            "{}x{} page has no pixels",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

impl TransformKernel for ImageKernel {
    #[instrument(skip(self, image), fields(image = %image.id()))]
    fn rotate(&self, image: &PageImage, degrees: u32) -> Result<PageImage> {
        ensure_not_empty(image)?;
        if degrees % 90 != 0 {
            return Err(ScanError::Kernel(format!(
                "rotation of {degrees} degrees is not a quarter turn"
            )));
        }
        Ok(ImageProcessor::from_page(image)
            .rotate(degrees as f32)
            .into_page())
    }

    #[instrument(skip(self, image), fields(image = %image.id()))]
    fn filter(&self, image: &PageImage, filter: FilterKind) -> Result<PageImage> {
        ensure_not_empty(image)?;
        let out = ScanEnhancer::from_page(image).apply_filter(filter).into_dynamic();
        debug!(width = out.width(), height = out.height(), "filter output ready");
        Ok(PageImage::new(out))
    }

    #[instrument(skip(self, image), fields(image = %image.id()))]
    fn crop(&self, image: &PageImage, region: &CropRegion) -> Result<PageImage> {
        ensure_not_empty(image)?;
        if !region.is_big_enough(self.min_crop_extent) {
            return Err(ScanError::CropTooSmall {
                extent: region.width().min(region.height()),
                minimum: self.min_crop_extent,
            });
        }
        let (x, y, width, height) = region.to_pixels(image.width(), image.height());
        Ok(ImageProcessor::from_page(image)
            .crop(x, y, width, height)
            .into_page())
    }
}
