// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanflow — Document session engine: the shared page list, the per-view
// transform worker, rotate-tap debounce, the filter in-progress gate and the
// view binder, plus the controller and workflow that drive them.

pub mod binder;
pub mod debounce;
pub mod editor;
pub mod executor;
pub mod filter;
pub mod session;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use binder::{BindOutcome, BoundView, SessionViewBinder, counter_label};
pub use debounce::{Clock, CommittedRotation, ManualClock, RotateDecision, RotationDebouncer, SystemClock};
pub use editor::{EditorController, SaveBlocked};
pub use executor::{TaskId, TaskReport, TransformExecutor, TransformKind, TransformTask};
pub use filter::{FilterPipeline, FilterState};
pub use session::{DocumentEntry, DocumentSession, SessionChange, SessionSnapshot, SlotRef};
pub use workflow::ScanWorkflow;
