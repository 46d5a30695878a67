// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens to a rotate tap that arrives inside the debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebouncePolicy {
    /// The tap is treated as an accidental double-press and its angle is lost.
    #[default]
    Discard,
    /// The tap's angle is carried into the next accepted rotation.
    Accumulate,
}

/// Persistent scanning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Minimum time between two accepted rotate taps on the same page.
    pub rotate_debounce_ms: u64,
    /// Angle added by one accepted rotate tap (clockwise, degrees).
    pub rotation_step_degrees: u32,
    /// Handling of taps inside the debounce window.
    pub debounce_policy: DebouncePolicy,
    /// Smallest crop width/height, as a fraction of the page.
    pub min_crop_extent: f32,
    /// Capacity of the session change broadcast channel.
    pub change_channel_capacity: usize,
}

impl ScanConfig {
    pub fn rotate_debounce(&self) -> Duration {
        Duration::from_millis(self.rotate_debounce_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rotate_debounce_ms: 350,
            rotation_step_degrees: 90,
            debounce_policy: DebouncePolicy::Discard,
            min_crop_extent: 0.1,
            change_channel_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ScanConfig =
            serde_json::from_str(r#"{ "debounce_policy": "accumulate" }"#).expect("parse");
        assert_eq!(config.debounce_policy, DebouncePolicy::Accumulate);
        assert_eq!(config.rotate_debounce(), Duration::from_millis(350));
        assert_eq!(config.rotation_step_degrees, 90);
    }
}
