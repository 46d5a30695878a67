// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the scanned-document session.

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for one document entry.
///
/// Positions in a session shift on removal; the id does not. Tasks carry both
/// so a completion can tell that a position now holds a different document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a single image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable, cheaply cloneable image buffer.
///
/// Every buffer gets a fresh [`ImageId`] when it is wrapped, so two pages
/// compare equal only when they are the very same buffer, never because the
/// pixels happen to match.
#[derive(Clone)]
pub struct PageImage {
    id: ImageId,
    pixels: Arc<DynamicImage>,
}

impl PageImage {
    /// Wrap a decoded image.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            id: ImageId::new(),
            pixels: Arc::new(image),
        }
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// A zero-sized buffer cannot be shown or transformed.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Borrow the underlying pixels.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.pixels
    }

    /// Whether both handles point at the same buffer.
    pub fn same_as(&self, other: &PageImage) -> bool {
        self.id == other.id
    }
}

impl PartialEq for PageImage {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for PageImage {}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl From<DynamicImage> for PageImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

/// Primitive filter operations a kernel knows how to run.
///
/// A catalog entry ([`FilterKind`]) maps to one or more of these, applied in
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    /// Global (Otsu) binarization.
    PureBinarized,
    /// Contrast and saturation boost for colour pages.
    ColorEnhanced,
    /// Unsharp-mask edge emphasis.
    EdgeHighlight,
    /// Background whitening for colour documents.
    ColorDocument,
    /// Luma conversion.
    Grayscale,
    /// Adaptive (local mean) binarization.
    BlackAndWhite,
}

/// The fixed catalog of selectable filters.
///
/// The catalog position is the `filter_index` stored in a session entry;
/// position 0 is always "no filter".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterKind {
    #[default]
    None,
    PureBinarized,
    ColorEnhanced,
    ColorDocument,
    Grayscale,
    BlackAndWhite,
}

impl FilterKind {
    /// Every selectable filter, in catalog order.
    pub const CATALOG: [FilterKind; 6] = [
        FilterKind::None,
        FilterKind::PureBinarized,
        FilterKind::ColorEnhanced,
        FilterKind::ColorDocument,
        FilterKind::Grayscale,
        FilterKind::BlackAndWhite,
    ];

    /// Position in [`FilterKind::CATALOG`].
    pub fn index(self) -> usize {
        match self {
            Self::None => 0,
            Self::PureBinarized => 1,
            Self::ColorEnhanced => 2,
            Self::ColorDocument => 3,
            Self::Grayscale => 4,
            Self::BlackAndWhite => 5,
        }
    }

    /// Catalog lookup. `None` for positions outside the catalog.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::CATALOG.get(index).copied()
    }

    /// Display name shown in the filter chooser.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::PureBinarized => "Pure Binarized",
            Self::ColorEnhanced => "Color Enhanced",
            Self::ColorDocument => "Color Document",
            Self::Grayscale => "Grey",
            Self::BlackAndWhite => "Black & White",
        }
    }

    /// Case-insensitive lookup by display name or a dashed keyword
    /// (`"color-enhanced"`, `"black-and-white"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::CATALOG.into_iter().find(|kind| {
            kind.name().eq_ignore_ascii_case(&wanted) || kind.keyword() == wanted
        })
    }

    /// Stable machine keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PureBinarized => "pure-binarized",
            Self::ColorEnhanced => "color-enhanced",
            Self::ColorDocument => "color-document",
            Self::Grayscale => "grayscale",
            Self::BlackAndWhite => "black-and-white",
        }
    }

    /// Primitive operations, applied in order. Empty for `None`.
    pub fn ops(self) -> &'static [FilterOp] {
        match self {
            Self::None => &[],
            Self::PureBinarized => &[FilterOp::PureBinarized],
            Self::ColorEnhanced => &[FilterOp::ColorEnhanced, FilterOp::EdgeHighlight],
            Self::ColorDocument => &[FilterOp::ColorDocument],
            Self::Grayscale => &[FilterOp::Grayscale],
            Self::BlackAndWhite => &[FilterOp::BlackAndWhite],
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Axis-aligned crop rectangle in normalised (0.0..=1.0) image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl CropRegion {
    /// Build a region, clamping to the unit square and ordering the edges.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        let clamp = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        let (l, r) = (clamp(left), clamp(right));
        let (t, b) = (clamp(top), clamp(bottom));
        Self {
            left: l.min(r),
            top: t.min(b),
            right: l.max(r),
            bottom: t.max(b),
        }
    }

    /// The whole image.
    pub fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Reject crops that would collapse the page to a sliver.
    pub fn is_big_enough(&self, min_extent: f32) -> bool {
        self.width() >= min_extent && self.height() >= min_extent
    }

    /// Pixel rectangle `(x, y, width, height)` for an image of the given
    /// size. Always at least one pixel wide and high for non-empty images.
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> (u32, u32, u32, u32) {
        let scale = |v: f32, size: u32| (v * size as f32).round() as u32;
        let x = scale(self.left, image_width).min(image_width.saturating_sub(1));
        let y = scale(self.top, image_height).min(image_height.saturating_sub(1));
        let right = scale(self.right, image_width).clamp(x + 1, image_width.max(1));
        let bottom = scale(self.bottom, image_height).clamp(y + 1, image_height.max(1));
        (x, y, right - x, bottom - y)
    }
}

/// Normalise a clockwise angle to `0..360`.
pub fn normalize_degrees(degrees: u32) -> u32 {
    degrees % 360
}
