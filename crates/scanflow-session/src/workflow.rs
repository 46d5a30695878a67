// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning workflow: owns the session from start to completion and opens
// editors over it.

use std::sync::Arc;

use scanflow_bridge::NativeCamera;
use scanflow_core::error::{Result, ScanError};
use scanflow_core::{PageImage, ScanConfig, TransformKernel};
use tracing::info;

use crate::binder::BindOutcome;
use crate::debounce::{Clock, SystemClock};
use crate::editor::EditorController;
use crate::session::DocumentSession;

pub struct ScanWorkflow {
    config: ScanConfig,
    kernel: Arc<dyn TransformKernel>,
    clock: Arc<dyn Clock>,
    session: Arc<DocumentSession>,
}

impl ScanWorkflow {
    pub fn new(config: ScanConfig, kernel: Arc<dyn TransformKernel>) -> Self {
        Self::with_clock(config, kernel, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ScanConfig, kernel: Arc<dyn TransformKernel>, clock: Arc<dyn Clock>) -> Self {
        let session = Arc::new(DocumentSession::from_config(&config));
        Self {
            config,
            kernel,
            clock,
            session,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<DocumentSession> {
        &self.session
    }

    /// Begin a new scan with a fresh session. Editors still holding the old
    /// session keep it alive until they close.
    pub fn start(&mut self) -> Arc<DocumentSession> {
        self.session = Arc::new(DocumentSession::from_config(&self.config));
        info!("Scan workflow started");
        Arc::clone(&self.session)
    }

    /// Discard every page and scan again.
    pub fn restart(&mut self) {
        self.session.clear();
        info!("Scan workflow restarted");
    }

    /// Capture one page and append it. `Ok(None)` when the capture was
    /// cancelled or produced nothing usable.
    pub fn capture<C: NativeCamera + ?Sized>(&self, camera: &C) -> Result<Option<usize>> {
        let image = camera.capture_image()?;
        Ok(self.session.add(image))
    }

    /// Open an editor over the current session.
    pub fn open_editor(&self, requested: Option<usize>) -> (EditorController, BindOutcome) {
        let editor = EditorController::new(
            Arc::clone(&self.session),
            Arc::clone(&self.kernel),
            &self.config,
            Arc::clone(&self.clock),
        );
        let outcome = editor.bind(requested);
        (editor, outcome)
    }

    /// Hand back the displayed pages in order and clear the session.
    pub fn complete(&mut self) -> Result<Vec<PageImage>> {
        let pages = self.session.snapshot().displayed_images();
        if pages.is_empty() {
            return Err(ScanError::EmptySession);
        }
        self.session.clear();
        info!(pages = pages.len(), "Scan workflow completed");
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use scanflow_core::FilterKind;

    use crate::testing::{FakeKernel, Step, page};

    /// Camera that hands out pre-made pages.
    struct QueueCamera(Mutex<Vec<PageImage>>);

    impl NativeCamera for QueueCamera {
        fn capture_image(&self) -> Result<Option<PageImage>> {
            Ok(self.0.lock().unwrap().pop())
        }
    }

    #[tokio::test]
    async fn capture_edit_complete() {
        let mut workflow = ScanWorkflow::new(ScanConfig::default(), FakeKernel::new());
        let camera = QueueCamera(Mutex::new(vec![page(4, 4), page(6, 3)]));
        assert_eq!(workflow.capture(&camera).expect("capture"), Some(0));
        assert_eq!(workflow.capture(&camera).expect("capture"), Some(1));
        assert_eq!(workflow.capture(&camera).expect("cancelled"), None);

        let (editor, outcome) = workflow.open_editor(Some(1));
        assert!(matches!(outcome, BindOutcome::Editor(view) if view.position == 1 && view.show_counter));
        editor.apply_filter(1, FilterKind::Grayscale).expect("filter");
        editor.wait_filters_idle().await;
        assert_eq!(editor.proceed_to_save(), Ok(()));
        let filtered = editor.session().entry(1).expect("entry").displayed;
        editor.close().await;

        let pages = workflow.complete().expect("complete");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1], filtered);
        assert!(workflow.session().is_empty());
    }

    #[tokio::test]
    async fn empty_workflow_routes_back_to_capture() {
        let mut workflow = ScanWorkflow::new(ScanConfig::default(), FakeKernel::new());
        let (_editor, outcome) = workflow.open_editor(None);
        assert_eq!(outcome, BindOutcome::CaptureMore);
        assert!(matches!(workflow.complete(), Err(ScanError::EmptySession)));
    }

    #[tokio::test]
    async fn restart_clears_and_start_replaces() {
        let mut workflow = ScanWorkflow::new(ScanConfig::default(), FakeKernel::new());
        let old = Arc::clone(workflow.session());
        old.add(Some(page(2, 2)));
        workflow.restart();
        assert!(old.is_empty());

        old.add(Some(page(2, 2)));
        let fresh = workflow.start();
        assert!(fresh.is_empty());
        assert!(!Arc::ptr_eq(&fresh, &old));
    }

    #[tokio::test]
    async fn interleaved_adds_removes_and_tasks_stay_consistent() {
        let kernel = FakeKernel::new();
        let workflow = ScanWorkflow::new(ScanConfig::default(), kernel.clone());
        let session = Arc::clone(workflow.session());
        let (editor, _) = workflow.open_editor(None);

        let mut added = 0;
        let mut removed = 0;
        for round in 0..12usize {
            if session.add(Some(page(5 + round as u32, 4))).is_some() {
                added += 1;
            }
            let len = session.len();
            let filter = FilterKind::CATALOG[round % FilterKind::CATALOG.len()];
            editor.apply_filter(round % len, filter).expect("filter");
            editor.rotate(len - 1).expect("rotate");
            if round % 3 == 2 && editor.delete(round % len) {
                removed += 1;
            }
        }
        editor.flush().await;
        editor.wait_filters_idle().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.len(), added - removed);
        for entry in snapshot.iter() {
            assert!(entry.is_consistent(), "entry {} inconsistent", entry.id);
            if !entry.applied_filter.is_none() {
                // Never a filter output of some other page's original.
                assert_eq!(
                    kernel.source_of(&entry.displayed),
                    Some((Step::Filter(entry.applied_filter), entry.original.id()))
                );
            }
        }
    }
}
