// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resolves a requested page position against the current session when an
// editing view is (re)created.

use std::sync::Arc;

use crate::session::DocumentSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundView {
    /// Page to show; always a valid position at bind time.
    pub position: usize,
    pub count: usize,
    /// Page counter is hidden for a single page.
    pub show_counter: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Editor(BoundView),
    /// Nothing to edit; route back to capture.
    CaptureMore,
}

pub struct SessionViewBinder {
    session: Arc<DocumentSession>,
    remembered: Option<usize>,
}

impl SessionViewBinder {
    pub fn new(session: Arc<DocumentSession>) -> Self {
        Self {
            session,
            remembered: None,
        }
    }

    /// Bind to `requested`, falling back to the remembered position, then to
    /// the first page. Out-of-range positions clamp to the last page.
    pub fn bind(&self, requested: Option<usize>) -> BindOutcome {
        let count = self.session.len();
        if count == 0 {
            return BindOutcome::CaptureMore;
        }
        let position = requested.or(self.remembered).unwrap_or(0).min(count - 1);
        BindOutcome::Editor(BoundView {
            position,
            count,
            show_counter: count > 1,
        })
    }

    /// Keep the current position across a view recreation.
    pub fn remember(&mut self, position: usize) {
        self.remembered = Some(position);
    }

    pub fn remembered(&self) -> Option<usize> {
        self.remembered
    }
}

/// One-based "position / count" label.
pub fn counter_label(view: &BoundView) -> String {
    format!("{} / {}", view.position + 1, view.count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::page;

    #[test]
    fn empty_session_routes_to_capture() {
        let binder = SessionViewBinder::new(Arc::new(DocumentSession::default()));
        assert_eq!(binder.bind(Some(0)), BindOutcome::CaptureMore);
    }

    #[test]
    fn position_clamps_to_last_page() {
        let session = Arc::new(DocumentSession::default());
        for _ in 0..3 {
            session.add(Some(page(2, 2)));
        }
        let binder = SessionViewBinder::new(Arc::clone(&session));
        let BindOutcome::Editor(view) = binder.bind(Some(7)) else {
            panic!("expected editor");
        };
        assert_eq!(view.position, 2);
        assert_eq!(view.count, 3);
        assert!(view.show_counter);
        assert_eq!(counter_label(&view), "3 / 3");
    }

    #[test]
    fn remembered_position_survives_removal() {
        let session = Arc::new(DocumentSession::default());
        session.add(Some(page(2, 2)));
        session.add(Some(page(2, 2)));
        let mut binder = SessionViewBinder::new(Arc::clone(&session));
        binder.remember(1);
        session.remove_at(1);

        assert_eq!(
            binder.bind(None),
            BindOutcome::Editor(BoundView {
                position: 0,
                count: 1,
                show_counter: false,
            })
        );
    }
}
