// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotate-tap debounce.
//
// Each page keeps the time of its last accepted tap and the cumulative angle
// from its upright orientation. A tap inside the debounce window is ignored;
// under `DebouncePolicy::Accumulate` its step is carried into the next
// accepted tap instead of being lost.
//
// State is keyed by entry identity, not position. While rotations for a page
// are queued the debouncer's angle runs ahead of the session; once none is in
// flight it is re-read from what the session actually committed, so failed,
// discarded or externally replaced pages never leave a stale angle behind.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use scanflow_core::{DebouncePolicy, EntryId, ImageId, ScanConfig, normalize_degrees};
use tracing::debug;

/// Time source, injectable so tests can step through a tap sequence.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|p| p.into_inner());
        *offset += by;
    }

    /// Jump to `at` after creation.
    pub fn set(&self, at: Duration) {
        *self.offset.lock().unwrap_or_else(|p| p.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateDecision {
    /// Submit a rotation to `degrees` (cumulative from upright, `0..360`).
    /// `delta` is the angle this tap added, including any carried taps.
    Accepted { degrees: u32, delta: u32 },
    Ignored,
}

/// Rotation the session has committed for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedRotation {
    /// Identity of the entry's upright image.
    pub basis: ImageId,
    pub degrees: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct RotationSlot {
    /// `None` while a basis-replacing task (crop) is queued.
    basis: Option<ImageId>,
    last_accepted_at: Option<Instant>,
    degrees: u32,
    dropped_taps: u32,
    in_flight: usize,
}

impl RotationSlot {
    fn at(committed: CommittedRotation) -> Self {
        Self {
            basis: Some(committed.basis),
            degrees: normalize_degrees(committed.degrees),
            ..Self::default()
        }
    }
}

/// Per-page rotate debounce.
#[derive(Debug)]
pub struct RotationDebouncer {
    min_interval: Duration,
    step: u32,
    policy: DebouncePolicy,
    slots: HashMap<EntryId, RotationSlot>,
}

impl Default for RotationDebouncer {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl RotationDebouncer {
    pub fn new(min_interval: Duration, step: u32, policy: DebouncePolicy) -> Self {
        Self {
            min_interval,
            step,
            policy,
            slots: HashMap::new(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            config.rotate_debounce(),
            config.rotation_step_degrees,
            config.debounce_policy,
        )
    }

    /// A rotate tap on `entry`, whose session state is `committed`.
    ///
    /// An accepted tap counts as in flight until [`settled`](Self::settled).
    pub fn request_rotate(
        &mut self,
        entry: EntryId,
        committed: CommittedRotation,
        now: Instant,
    ) -> RotateDecision {
        let slot = self
            .slots
            .entry(entry)
            .or_insert_with(|| RotationSlot::at(committed));
        if slot.in_flight == 0 {
            if slot.basis != Some(committed.basis) {
                debug!(%entry, "page has a new rotation basis");
                *slot = RotationSlot::at(committed);
            } else {
                slot.degrees = normalize_degrees(committed.degrees);
            }
        }

        if let Some(last) = slot.last_accepted_at {
            if now.saturating_duration_since(last) < self.min_interval {
                slot.dropped_taps += 1;
                debug!(%entry, dropped = slot.dropped_taps, "rotate tap debounced");
                return RotateDecision::Ignored;
            }
        }

        let taps = match self.policy {
            DebouncePolicy::Discard => 1,
            DebouncePolicy::Accumulate => 1 + slot.dropped_taps,
        };
        let delta = self.step.saturating_mul(taps);
        slot.degrees = normalize_degrees(slot.degrees + normalize_degrees(delta));
        slot.dropped_taps = 0;
        slot.last_accepted_at = Some(now);
        slot.in_flight += 1;
        debug!(%entry, degrees = slot.degrees, delta, "rotate tap accepted");
        RotateDecision::Accepted {
            degrees: slot.degrees,
            delta,
        }
    }

    /// A task replacing the upright basis of `entry` was queued: later taps
    /// rotate the new basis from zero. Counts as in flight.
    pub fn rebase(&mut self, entry: EntryId) {
        let slot = self.slots.entry(entry).or_default();
        *slot = RotationSlot {
            in_flight: slot.in_flight + 1,
            ..RotationSlot::default()
        };
    }

    /// A task counted by `request_rotate` or `rebase` finished, whatever
    /// its outcome.
    pub fn settled(&mut self, entry: EntryId) {
        if let Some(slot) = self.slots.get_mut(&entry) {
            slot.in_flight = slot.in_flight.saturating_sub(1);
        }
    }

    /// Drop state for a page that left the session.
    pub fn forget(&mut self, entry: EntryId) {
        self.slots.remove(&entry);
    }
}
