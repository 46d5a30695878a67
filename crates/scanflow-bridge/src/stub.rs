// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop/CI implementations of the bridge traits.
//
// `StubBridge` has no camera at all. `FileBridge` "captures" by decoding queued
// image files in order and answers the filter chooser with a fixed choice,
// which is what the headless binary and the tests drive the workflow with.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use scanflow_core::error::{Result, ScanError};
use scanflow_core::{FilterKind, PageImage};
use tracing::{debug, info, warn};

use crate::traits::*;

/// No-op bridge returned when no capture source is configured.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativeCamera for StubBridge {
    fn capture_image(&self) -> Result<Option<PageImage>> {
        warn!("NativeCamera::capture_image called on stub bridge");
        Err(ScanError::PlatformUnavailable)
    }
}

impl FilterPrompt for StubBridge {
    fn prompt_for_filter_choice(&self, _current: FilterKind) -> Option<FilterKind> {
        warn!("FilterPrompt::prompt_for_filter_choice called on stub bridge");
        None
    }
}

/// Bridge backed by image files on disk.
///
/// Each `capture_image` call decodes the next queued file; once the queue is
/// exhausted it behaves like a cancelled capture.
pub struct FileBridge {
    pending: Mutex<VecDeque<PathBuf>>,
    filter_choice: Option<FilterKind>,
}

impl FileBridge {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            pending: Mutex::new(paths.into_iter().collect()),
            filter_choice: None,
        }
    }

    /// Answer every filter prompt with `choice`.
    pub fn with_filter_choice(mut self, choice: FilterKind) -> Self {
        self.filter_choice = Some(choice);
        self
    }

    /// Files not yet captured.
    pub fn remaining(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl PlatformBridge for FileBridge {
    fn platform_name(&self) -> &str {
        "Desktop (files)"
    }
}

impl NativeCamera for FileBridge {
    fn capture_image(&self) -> Result<Option<PageImage>> {
        let next = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        let Some(path) = next else {
            debug!("capture queue exhausted");
            return Ok(None);
        };

        let decoded = image::open(&path).map_err(|err| {
            ScanError::ImageError(format!("failed to open {}: {}", path.display(), err))
        })?;
        info!(
            path = %path.display(),
            width = decoded.width(),
            height = decoded.height(),
            "Page captured from file"
        );
        Ok(Some(PageImage::new(decoded)))
    }
}

impl FilterPrompt for FileBridge {
    fn prompt_for_filter_choice(&self, current: FilterKind) -> Option<FilterKind> {
        debug!(%current, choice = ?self.filter_choice, "filter prompt answered");
        self.filter_choice
    }
}
