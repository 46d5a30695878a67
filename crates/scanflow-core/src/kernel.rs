// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transform kernel contract.
//
// The session never looks at pixels itself. Rotations, filters and crops are
// opaque, CPU-bound operations supplied by an implementation of this trait and
// run off the interactive path by the transform worker.

use crate::error::Result;
use crate::types::{CropRegion, FilterKind, PageImage};

/// Pixel operations the transform worker delegates to.
///
/// Implementations must be deterministic: the same input and parameters give
/// the same output. They are called from a blocking thread pool, never from
/// the interactive context.
pub trait TransformKernel: Send + Sync {
    /// Rotate clockwise by `degrees` (a multiple of the rotation step).
    fn rotate(&self, image: &PageImage, degrees: u32) -> Result<PageImage>;

    /// Apply a catalog filter. `FilterKind::None` is never passed in; the
    /// pipeline short-circuits it.
    fn filter(&self, image: &PageImage, filter: FilterKind) -> Result<PageImage>;

    /// Cut out a normalised region.
    fn crop(&self, image: &PageImage, region: &CropRegion) -> Result<PageImage>;
}
