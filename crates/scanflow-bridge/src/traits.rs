// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the collaborators the scanning flow
// talks to. The session core never calls these directly; the workflow and
// editor controller do.

use scanflow_core::error::Result;
use scanflow_core::{FilterKind, PageImage};

/// Unified bridge grouping every native capability the scanning flow needs.
pub trait PlatformBridge: NativeCamera + FilterPrompt {
    /// Human-readable platform name (e.g. "iOS 17", "Desktop (files)").
    fn platform_name(&self) -> &str;
}

/// Capture pages from the device camera (or whatever stands in for it).
pub trait NativeCamera {
    /// Launch the capture flow and return the page.
    /// Returns Ok(None) if the user cancelled.
    fn capture_image(&self) -> Result<Option<PageImage>>;
}

/// Let the user pick a filter from the catalog.
pub trait FilterPrompt {
    /// Present the chooser with `current` pre-selected.
    /// Returns None if the user dismissed it without choosing.
    fn prompt_for_filter_choice(&self, current: FilterKind) -> Option<FilterKind>;
}
