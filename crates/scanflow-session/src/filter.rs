// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filter application and the in-progress gate.
//
// The gate counts outstanding filter tasks instead of holding a flag, so two
// quick selections keep it closed until the second one has settled too.

use std::sync::Arc;

use scanflow_core::FilterKind;
use scanflow_core::error::Result;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::executor::{TaskId, TaskReport, TransformExecutor, TransformKind};
use crate::session::DocumentSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    #[default]
    Idle,
    Applying { pending: usize },
}

impl FilterState {
    fn started(self) -> Self {
        match self {
            Self::Idle => Self::Applying { pending: 1 },
            Self::Applying { pending } => Self::Applying {
                pending: pending + 1,
            },
        }
    }

    fn settled(self) -> Self {
        match self {
            Self::Applying { pending } if pending > 1 => Self::Applying {
                pending: pending - 1,
            },
            _ => Self::Idle,
        }
    }
}

/// Applies filters through the transform worker of one editing view.
pub struct FilterPipeline {
    session: Arc<DocumentSession>,
    executor: Arc<TransformExecutor>,
    state: Arc<watch::Sender<FilterState>>,
}

impl FilterPipeline {
    pub fn new(session: Arc<DocumentSession>, executor: Arc<TransformExecutor>) -> Self {
        let (state, _) = watch::channel(FilterState::Idle);
        Self {
            session,
            executor,
            state: Arc::new(state),
        }
    }

    /// Select `filter` for the page at `index` and queue its computation.
    /// Returns `Ok(None)` when there is no page at `index`.
    pub fn apply_filter(&self, index: usize, filter: FilterKind) -> Result<Option<TaskId>> {
        let Some(slot) = self.session.slot_at(index) else {
            debug!(index, "apply_filter on a missing page");
            return Ok(None);
        };
        self.session.set_filter_index(index, filter.index());

        // Close the gate before the task exists so its completion can never
        // run ahead of the increment.
        self.state.send_modify(|s| *s = s.started());
        let state = Arc::clone(&self.state);
        let submitted = self.executor.submit_with(
            slot,
            TransformKind::Filter { filter },
            Some(Box::new(move |report: &TaskReport| {
                debug!(committed = report.is_committed(), "filter settled");
                state.send_modify(|s| *s = s.settled());
            })),
        );
        match submitted {
            Ok(id) => {
                info!(index, %filter, task = %id, "Filter queued");
                Ok(Some(id))
            }
            Err(err) => {
                self.state.send_modify(|s| *s = s.settled());
                Err(err)
            }
        }
    }

    pub fn state(&self) -> FilterState {
        *self.state.borrow()
    }

    pub fn is_in_progress(&self) -> bool {
        self.state() != FilterState::Idle
    }

    /// Observe gate transitions.
    pub fn watch(&self) -> watch::Receiver<FilterState> {
        self.state.subscribe()
    }

    /// Resolve once no filter is outstanding.
    pub async fn wait_idle(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| *s == FilterState::Idle).await;
    }
}
