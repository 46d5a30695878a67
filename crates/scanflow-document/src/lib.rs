// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanflow-document — Pixel kernels for the scanned-document session.
//
// Provides image processing (rotate, crop, grayscale, brightness/contrast,
// saturation, sharpening), the scan filter catalog (binarization, colour
// enhancement, edge highlight, background whitening) and `ImageKernel`, the
// `TransformKernel` implementation the transform worker runs.

pub mod image;
pub mod kernel;
pub mod scan;

// Re-export the primary structs so callers can use `scanflow_document::ImageKernel` etc.
pub use crate::image::processor::ImageProcessor;
pub use crate::kernel::ImageKernel;
pub use crate::scan::enhance::ScanEnhancer;
