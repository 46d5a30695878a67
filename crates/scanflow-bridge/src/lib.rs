// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanflow — Bridge abstractions for the collaborators of the scanning flow:
// the camera that produces pages and the chooser that picks a filter.

pub mod stub;
pub mod traits;

use std::path::PathBuf;

use scanflow_core::FilterKind;
use tracing::info;

pub use stub::{FileBridge, StubBridge};
pub use traits::{FilterPrompt, NativeCamera, PlatformBridge};

/// Bridge for the current host. Queued image files are captured through a
/// `FileBridge`; with none, the host has no camera and gets the stub, which
/// refuses to capture.
pub fn platform_bridge(files: Vec<PathBuf>, filter_choice: Option<FilterKind>) -> Box<dyn PlatformBridge> {
    let bridge: Box<dyn PlatformBridge> = if files.is_empty() {
        Box::new(StubBridge)
    } else {
        let mut bridge = FileBridge::new(files);
        if let Some(choice) = filter_choice {
            bridge = bridge.with_filter_choice(choice);
        }
        Box::new(bridge)
    };
    info!(platform = bridge.platform_name(), "Platform bridge selected");
    bridge
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanflow_core::ScanError;

    #[test]
    fn no_files_selects_the_stub() {
        let bridge = platform_bridge(Vec::new(), Some(FilterKind::Grayscale));
        assert_eq!(bridge.platform_name(), "Desktop (stub)");
        assert!(matches!(bridge.capture_image(), Err(ScanError::PlatformUnavailable)));
    }

    #[test]
    fn files_select_the_file_bridge() {
        let bridge = platform_bridge(vec![PathBuf::from("page.png")], Some(FilterKind::Grayscale));
        assert_eq!(bridge.platform_name(), "Desktop (files)");
        assert_eq!(
            bridge.prompt_for_filter_choice(FilterKind::None),
            Some(FilterKind::Grayscale)
        );
    }
}
