// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editing-view controller: owns one transform worker, the rotate debounce and
// the filter gate for an open editor, and translates user actions into
// session mutations and transform tasks.

use std::sync::{Arc, Mutex, MutexGuard};

use scanflow_bridge::FilterPrompt;
use scanflow_core::error::{Result, ScanError};
use scanflow_core::{CropRegion, EntryId, FilterKind, ScanConfig, TransformKernel};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use crate::binder::{BindOutcome, SessionViewBinder};
use crate::debounce::{Clock, CommittedRotation, RotateDecision, RotationDebouncer};
use crate::executor::{OnSettled, TaskId, TaskReport, TransformExecutor, TransformKind};
use crate::filter::{FilterPipeline, FilterState};
use crate::session::{DocumentSession, SlotRef};

/// Why the editor cannot move on to saving yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SaveBlocked {
    #[error("a filter is still being applied")]
    FilterInProgress,
    #[error("there are no pages to save")]
    EmptySession,
}

pub struct EditorController {
    session: Arc<DocumentSession>,
    executor: Arc<TransformExecutor>,
    pipeline: FilterPipeline,
    debouncer: Arc<Mutex<RotationDebouncer>>,
    binder: Mutex<SessionViewBinder>,
    clock: Arc<dyn Clock>,
    min_crop_extent: f32,
}

impl EditorController {
    /// Open an editor over `session`. Must be called inside a tokio runtime.
    pub fn new(
        session: Arc<DocumentSession>,
        kernel: Arc<dyn TransformKernel>,
        config: &ScanConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let executor = Arc::new(TransformExecutor::new(Arc::clone(&session), kernel));
        let pipeline = FilterPipeline::new(Arc::clone(&session), Arc::clone(&executor));
        Self {
            binder: Mutex::new(SessionViewBinder::new(Arc::clone(&session))),
            session,
            executor,
            pipeline,
            debouncer: Arc::new(Mutex::new(RotationDebouncer::from_config(config))),
            clock,
            min_crop_extent: config.min_crop_extent,
        }
    }

    fn debouncer(&self) -> MutexGuard<'_, RotationDebouncer> {
        self.debouncer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn binder(&self) -> MutexGuard<'_, SessionViewBinder> {
        self.binder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn session(&self) -> &Arc<DocumentSession> {
        &self.session
    }

    /// Bind the view, preferring `requested` over the remembered position.
    pub fn bind(&self, requested: Option<usize>) -> BindOutcome {
        let outcome = self.binder().bind(requested);
        if let BindOutcome::Editor(view) = outcome {
            self.binder().remember(view.position);
        }
        outcome
    }

    /// Settle callback for a task the debouncer counted as in flight.
    fn settle_rotation(&self, entry: EntryId) -> OnSettled {
        let debouncer = Arc::clone(&self.debouncer);
        Box::new(move |_: &TaskReport| {
            debouncer
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .settled(entry);
        })
    }

    /// Rotate tap on the page at `index`.
    #[instrument(skip(self))]
    pub fn rotate(&self, index: usize) -> Result<RotateDecision> {
        // The entry is read under the debouncer lock so a settled rotation
        // is always visible in the session by the time it is no longer
        // counted as in flight.
        let mut debouncer = self.debouncer();
        let Some(entry) = self.session.entry(index) else {
            debug!("rotate on a missing page");
            return Ok(RotateDecision::Ignored);
        };
        let committed = CommittedRotation {
            basis: entry.upright.id(),
            degrees: entry.rotation,
        };
        let decision = debouncer.request_rotate(entry.id, committed, self.clock.now());
        drop(debouncer);

        if let RotateDecision::Accepted { degrees, .. } = decision {
            let slot = SlotRef {
                index,
                entry: entry.id,
            };
            let submitted = self.executor.submit_with(
                slot,
                TransformKind::Rotate { degrees },
                Some(self.settle_rotation(entry.id)),
            );
            match submitted {
                Ok(task) => info!(degrees, %task, "Rotation queued"),
                Err(err) => {
                    self.debouncer().settled(entry.id);
                    return Err(err);
                }
            }
        }
        Ok(decision)
    }

    pub fn apply_filter(&self, index: usize, filter: FilterKind) -> Result<Option<TaskId>> {
        self.pipeline.apply_filter(index, filter)
    }

    /// Ask `prompt` for a filter, seeded with the page's current selection.
    pub fn choose_filter<P: FilterPrompt + ?Sized>(&self, index: usize, prompt: &P) -> Result<Option<TaskId>> {
        let Some(entry) = self.session.entry(index) else {
            return Ok(None);
        };
        match prompt.prompt_for_filter_choice(entry.selected_filter()) {
            Some(choice) => self.apply_filter(index, choice),
            None => {
                debug!(index, "filter chooser dismissed");
                Ok(None)
            }
        }
    }

    /// Crop the page at `index` to `region`.
    #[instrument(skip(self))]
    pub fn crop(&self, index: usize, region: CropRegion) -> Result<Option<TaskId>> {
        if !region.is_big_enough(self.min_crop_extent) {
            return Err(ScanError::CropTooSmall {
                extent: region.width().min(region.height()),
                minimum: self.min_crop_extent,
            });
        }
        let Some(slot) = self.session.slot_at(index) else {
            return Ok(None);
        };
        // The cropped page becomes the new upright basis.
        self.debouncer().rebase(slot.entry);
        let submitted = self.executor.submit_with(
            slot,
            TransformKind::Crop { region },
            Some(self.settle_rotation(slot.entry)),
        );
        match submitted {
            Ok(task) => {
                info!(%task, "Crop queued");
                Ok(Some(task))
            }
            Err(err) => {
                self.debouncer().settled(slot.entry);
                Err(err)
            }
        }
    }

    /// Delete the page at `index`.
    pub fn delete(&self, index: usize) -> bool {
        let Some(slot) = self.session.slot_at(index) else {
            return false;
        };
        if !self.session.remove_at(index) {
            return false;
        }
        self.debouncer().forget(slot.entry);
        true
    }

    pub fn filter_state(&self) -> FilterState {
        self.pipeline.state()
    }

    pub fn is_filter_in_progress(&self) -> bool {
        self.pipeline.is_in_progress()
    }

    pub async fn wait_filters_idle(&self) {
        self.pipeline.wait_idle().await;
    }

    /// Gate for leaving the editor towards saving.
    pub fn proceed_to_save(&self) -> std::result::Result<(), SaveBlocked> {
        if self.pipeline.is_in_progress() {
            return Err(SaveBlocked::FilterInProgress);
        }
        if self.session.is_empty() {
            return Err(SaveBlocked::EmptySession);
        }
        Ok(())
    }

    pub fn reports(&self) -> broadcast::Receiver<TaskReport> {
        self.executor.reports()
    }

    pub async fn flush(&self) {
        self.executor.flush().await;
    }

    /// The view is being recreated: remember where it was, keep every queued
    /// task running and committing. Returns the remembered position.
    pub fn detach_view(&self, position: usize) -> usize {
        self.binder().remember(position);
        debug!(position, "editor view detached");
        position
    }

    /// The user left the editor: late results are dropped.
    pub fn abandon(&self) {
        self.executor.abandon();
    }

    /// Drain and stop the worker.
    pub async fn close(self) {
        self.executor.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use scanflow_bridge::FileBridge;
    use scanflow_core::DebouncePolicy;

    use crate::debounce::ManualClock;
    use crate::testing::{FakeKernel, Step, page};

    fn editor(pages: usize, policy: DebouncePolicy) -> (EditorController, Arc<FakeKernel>, Arc<ManualClock>) {
        let session = Arc::new(DocumentSession::default());
        for _ in 0..pages {
            session.add(Some(page(8, 4)));
        }
        let kernel = FakeKernel::new();
        let clock = Arc::new(ManualClock::new());
        let config = ScanConfig {
            debounce_policy: policy,
            ..ScanConfig::default()
        };
        let editor = EditorController::new(session, kernel.clone(), &config, clock.clone());
        (editor, kernel, clock)
    }

    #[tokio::test]
    async fn debounced_taps_submit_two_rotations() {
        let (editor, _kernel, clock) = editor(1, DebouncePolicy::Discard);
        let mut reports = editor.reports();
        for ms in [0, 100, 200, 400] {
            clock.set(Duration::from_millis(ms));
            editor.rotate(0).expect("rotate");
        }
        editor.flush().await;

        let mut rotations = Vec::new();
        while let Ok(report) = reports.try_recv() {
            if let TransformKind::Rotate { degrees } = report.task().kind {
                rotations.push(degrees);
            }
        }
        assert_eq!(rotations, vec![90, 180]);
        assert_eq!(editor.session().entry(0).expect("entry").rotation, 180);
    }

    #[tokio::test]
    async fn accumulated_taps_rotate_back_to_upright() {
        let (editor, _kernel, clock) = editor(1, DebouncePolicy::Accumulate);
        let mut last = RotateDecision::Ignored;
        for ms in [0, 100, 200, 400] {
            clock.set(Duration::from_millis(ms));
            last = editor.rotate(0).expect("rotate");
        }
        editor.flush().await;
        assert_eq!(last, RotateDecision::Accepted { degrees: 0, delta: 270 });
        let entry = editor.session().entry(0).expect("entry");
        assert_eq!(entry.rotation, 0);
        assert_eq!(entry.original, entry.upright);
    }

    #[tokio::test]
    async fn save_blocked_while_filter_runs() {
        let (editor, kernel, _clock) = editor(1, DebouncePolicy::Discard);
        kernel.pause();
        editor.apply_filter(0, FilterKind::Grayscale).expect("filter");
        assert_eq!(editor.proceed_to_save(), Err(SaveBlocked::FilterInProgress));
        kernel.resume();
        editor.wait_filters_idle().await;
        assert_eq!(editor.proceed_to_save(), Ok(()));
    }

    #[tokio::test]
    async fn save_blocked_on_empty_session() {
        let (editor, _kernel, _clock) = editor(1, DebouncePolicy::Discard);
        assert!(editor.delete(0));
        assert_eq!(editor.proceed_to_save(), Err(SaveBlocked::EmptySession));
        assert_eq!(editor.bind(None), BindOutcome::CaptureMore);
    }

    #[tokio::test]
    async fn small_crop_is_refused() {
        let (editor, kernel, _clock) = editor(1, DebouncePolicy::Discard);
        let result = editor.crop(0, CropRegion::new(0.0, 0.0, 0.05, 0.5));
        assert!(matches!(result, Err(ScanError::CropTooSmall { .. })));
        editor.flush().await;
        assert_eq!(kernel.entered(), 0);
    }

    #[tokio::test]
    async fn crop_then_rotate_starts_from_cropped_page() {
        let (editor, kernel, clock) = editor(1, DebouncePolicy::Discard);
        clock.set(Duration::from_millis(0));
        editor.rotate(0).expect("rotate");
        editor
            .crop(0, CropRegion::new(0.0, 0.0, 0.5, 1.0))
            .expect("crop")
            .expect("task");
        clock.set(Duration::from_millis(500));
        assert_eq!(
            editor.rotate(0).expect("rotate"),
            RotateDecision::Accepted { degrees: 90, delta: 90 }
        );
        editor.flush().await;

        let entry = editor.session().entry(0).expect("entry");
        assert_eq!(entry.rotation, 90);
        assert!(matches!(kernel.source_of(&entry.upright), Some((Step::Crop, _))));
        assert_eq!(
            kernel.source_of(&entry.original),
            Some((Step::Rotate(90), entry.upright.id()))
        );
    }

    #[tokio::test]
    async fn delete_keeps_rotation_state_with_the_page() {
        let (editor, _kernel, clock) = editor(2, DebouncePolicy::Discard);
        clock.set(Duration::from_millis(0));
        editor.rotate(1).expect("rotate");
        editor.flush().await;
        assert!(editor.delete(0));

        // The page that moved to 0 keeps its rotation and its debounce window.
        assert_eq!(editor.rotate(0).expect("rotate"), RotateDecision::Ignored);
        clock.set(Duration::from_millis(400));
        assert_eq!(
            editor.rotate(0).expect("rotate"),
            RotateDecision::Accepted { degrees: 180, delta: 90 }
        );
        editor.flush().await;
        assert_eq!(editor.session().entry(0).expect("entry").rotation, 180);
    }

    #[tokio::test]
    async fn replaced_page_rotates_from_its_new_upright() {
        let (editor, kernel, clock) = editor(1, DebouncePolicy::Discard);
        clock.set(Duration::from_millis(0));
        editor.rotate(0).expect("rotate");
        editor.flush().await;
        assert_eq!(editor.session().entry(0).expect("entry").rotation, 90);

        let fresh = page(6, 2);
        assert!(editor.session().replace_displayed(0, fresh.clone(), false));
        clock.set(Duration::from_millis(1000));
        assert_eq!(
            editor.rotate(0).expect("rotate"),
            RotateDecision::Accepted { degrees: 90, delta: 90 }
        );
        editor.flush().await;

        let entry = editor.session().entry(0).expect("entry");
        assert_eq!(entry.rotation, 90);
        assert_eq!(kernel.source_of(&entry.original), Some((Step::Rotate(90), fresh.id())));
    }

    #[tokio::test]
    async fn page_shifted_by_session_removal_has_no_rotation_history() {
        let (editor, _kernel, clock) = editor(2, DebouncePolicy::Discard);
        clock.set(Duration::from_millis(0));
        editor.rotate(0).expect("rotate");
        editor.flush().await;
        assert!(editor.session().remove_at(0));

        // Same instant: the untouched page is not inside anyone's window.
        assert_eq!(
            editor.rotate(0).expect("rotate"),
            RotateDecision::Accepted { degrees: 90, delta: 90 }
        );
        editor.flush().await;
        assert_eq!(editor.session().entry(0).expect("entry").rotation, 90);
    }

    #[tokio::test]
    async fn failed_rotation_does_not_advance_next_tap() {
        let (editor, kernel, clock) = editor(1, DebouncePolicy::Discard);
        let mut reports = editor.reports();
        kernel.fail_rotations(true);
        clock.set(Duration::from_millis(0));
        editor.rotate(0).expect("rotate");
        editor.flush().await;
        assert!(matches!(reports.try_recv(), Ok(TaskReport::Failed { .. })));
        assert_eq!(editor.session().entry(0).expect("entry").rotation, 0);

        kernel.fail_rotations(false);
        clock.set(Duration::from_millis(400));
        assert_eq!(
            editor.rotate(0).expect("rotate"),
            RotateDecision::Accepted { degrees: 90, delta: 90 }
        );
        editor.flush().await;
        assert_eq!(editor.session().entry(0).expect("entry").rotation, 90);
    }

    #[tokio::test]
    async fn discarded_rotation_does_not_advance_next_tap() {
        let (editor, kernel, clock) = editor(1, DebouncePolicy::Discard);
        kernel.pause();
        clock.set(Duration::from_millis(0));
        editor.rotate(0).expect("rotate");
        kernel.wait_entered(1).await;
        // The rotation basis changes under the running task.
        assert!(editor.session().replace_displayed(0, page(6, 2), false));
        kernel.resume();
        editor.flush().await;
        assert_eq!(editor.session().entry(0).expect("entry").rotation, 0);

        clock.set(Duration::from_millis(400));
        assert_eq!(
            editor.rotate(0).expect("rotate"),
            RotateDecision::Accepted { degrees: 90, delta: 90 }
        );
    }

    #[tokio::test]
    async fn chooser_is_seeded_and_applied() {
        let (editor, _kernel, _clock) = editor(1, DebouncePolicy::Discard);
        let prompt = FileBridge::new(Vec::new()).with_filter_choice(FilterKind::ColorEnhanced);
        editor.choose_filter(0, &prompt).expect("choose").expect("task");
        editor.wait_filters_idle().await;
        let entry = editor.session().entry(0).expect("entry");
        assert_eq!(entry.selected_filter(), FilterKind::ColorEnhanced);
        assert_eq!(entry.applied_filter, FilterKind::ColorEnhanced);
    }

    #[tokio::test]
    async fn detached_view_keeps_committing() {
        let (editor, kernel, _clock) = editor(3, DebouncePolicy::Discard);
        kernel.pause();
        editor.apply_filter(2, FilterKind::Grayscale).expect("filter");
        let remembered = editor.detach_view(2);
        kernel.resume();
        editor.wait_filters_idle().await;

        assert_eq!(
            editor.session().entry(2).expect("entry").applied_filter,
            FilterKind::Grayscale
        );
        let BindOutcome::Editor(view) = editor.bind(None) else {
            panic!("expected editor");
        };
        assert_eq!(view.position, remembered);
    }

    #[tokio::test]
    async fn abandoned_editor_drops_late_results() {
        let (editor, kernel, _clock) = editor(1, DebouncePolicy::Discard);
        kernel.pause();
        editor.apply_filter(0, FilterKind::Grayscale).expect("filter");
        editor.abandon();
        kernel.resume();
        editor.wait_filters_idle().await;
        let session = Arc::clone(editor.session());
        editor.close().await;
        assert_eq!(session.entry(0).expect("entry").applied_filter, FilterKind::None);
    }
}
