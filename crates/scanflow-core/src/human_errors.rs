// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the scanning screens.
//
// The session core only surfaces failures as state signals; the orchestrating
// layer turns them into something a user can act on with this mapping.

use crate::error::ScanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth trying again as-is.
    Transient,
    /// User must do something (rescan, choose a bigger crop).
    ActionRequired,
    /// Cannot be fixed by retrying.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether repeating the same action may succeed.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `ScanError` into a `HumanError`.
pub fn humanize_error(err: &ScanError) -> HumanError {
    match err {
        ScanError::ImageError(_) | ScanError::Kernel(_) => HumanError {
            message: "We couldn't process this page.".into(),
            suggestion: "Try the action again. If it keeps failing, rescan the page.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::InvalidImage(_) => HumanError {
            message: "The captured page is empty or damaged.".into(),
            suggestion: "Please scan the page again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::CropTooSmall { .. } => HumanError {
            message: "The selected area is too small.".into(),
            suggestion: "Drag the corners further apart so more of the page is kept.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::EmptySession => HumanError {
            message: "There are no scanned pages yet.".into(),
            suggestion: "Scan at least one page before continuing.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::WorkerStopped => HumanError {
            message: "Editing was interrupted.".into(),
            suggestion: "Close the editor and open it again. Your pages are kept.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::Config(_) | ScanError::Serialization(_) => HumanError {
            message: "The app's settings couldn't be read.".into(),
            suggestion: "Default settings are used instead. Save your settings again to fix this.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The app doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or pick a different location.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your device's storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        ScanError::Bridge(_) => HumanError {
            message: "The camera didn't respond.".into(),
            suggestion: "Close other apps using the camera and try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::PlatformUnavailable => HumanError {
            message: "Scanning isn't available on your device.".into(),
            suggestion: "Load page images from files instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_failure_is_retriable() {
        let human = humanize_error(&ScanError::Kernel("filter crashed".into()));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn small_crop_needs_user_action() {
        let human = humanize_error(&ScanError::CropTooSmall {
            extent: 0.05,
            minimum: 0.1,
        });
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn missing_file_needs_user_action() {
        let err = ScanError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn unavailable_platform_is_permanent() {
        let human = humanize_error(&ScanError::PlatformUnavailable);
        assert_eq!(human.severity, Severity::Permanent);
    }
}
