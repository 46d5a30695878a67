// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted scan: capture every input file, apply the same edits to each page
// through an editor, then export the displayed pages.
//
// Rotate taps are spaced one debounce window apart on a manual clock, so each
// scripted tap counts as a deliberate tap rather than a double-press.

use std::path::PathBuf;
use std::sync::Arc;

use scanflow_bridge::platform_bridge;
use scanflow_core::error::{Result, ScanError};
use scanflow_core::human_errors::humanize_error;
use scanflow_core::{CropRegion, FilterKind};
use scanflow_document::ImageKernel;
use scanflow_session::{BindOutcome, ManualClock, SaveBlocked, ScanWorkflow, TaskReport, counter_label};
use tracing::{info, warn};

use super::app_services::AppServices;

/// Edits applied to every captured page.
#[derive(Debug, Clone, Default)]
pub struct ScanScript {
    pub images: Vec<PathBuf>,
    pub filter: Option<FilterKind>,
    pub rotate_taps: u32,
    pub crop: Option<CropRegion>,
    pub out_dir: PathBuf,
}

#[derive(Debug)]
pub struct ScanSummary {
    pub exported: Vec<PathBuf>,
    /// Edits the kernel could not perform; those pages keep their last state.
    pub failed_tasks: usize,
}

pub async fn run_scan(svc: &AppServices, script: &ScanScript) -> Result<ScanSummary> {
    let config = svc.config();
    let clock = Arc::new(ManualClock::new());
    let kernel = Arc::new(ImageKernel::new(config.min_crop_extent));
    let mut workflow = ScanWorkflow::with_clock(config.clone(), kernel, clock.clone());
    workflow.start();

    // One capture per queued file; without files a single capture goes to
    // the host camera.
    let bridge = platform_bridge(script.images.clone(), script.filter);
    for _ in 0..script.images.len().max(1) {
        if workflow.capture(bridge.as_ref())?.is_none() {
            warn!("a capture produced no usable page");
        }
    }

    let (editor, outcome) = workflow.open_editor(None);
    let BindOutcome::Editor(view) = outcome else {
        editor.close().await;
        return Err(ScanError::EmptySession);
    };
    info!(pages = view.count, first = %counter_label(&view), "Editor opened");

    let mut reports = editor.reports();
    for index in 0..view.count {
        if let Some(region) = script.crop {
            editor.crop(index, region)?;
        }
        for _ in 0..script.rotate_taps {
            clock.advance(config.rotate_debounce());
            editor.rotate(index)?;
        }
        if script.filter.is_some() {
            editor.choose_filter(index, bridge.as_ref())?;
        }
    }
    editor.flush().await;
    editor.wait_filters_idle().await;

    let mut failed_tasks = 0;
    while let Ok(report) = reports.try_recv() {
        if let TaskReport::Failed { task, error } = report {
            let human = humanize_error(&error);
            warn!(index = task.target.index, error = %error, suggestion = %human.suggestion, "{}", human.message);
            failed_tasks += 1;
        }
    }

    if let Err(SaveBlocked::EmptySession) = editor.proceed_to_save() {
        editor.close().await;
        return Err(ScanError::EmptySession);
    }
    editor.close().await;

    let pages = workflow.complete()?;
    let exported = svc.export_pages(&pages, &script.out_dir)?;
    Ok(ScanSummary {
        exported,
        failed_tasks,
    })
}
