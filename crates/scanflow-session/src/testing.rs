// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Controllable kernel for the async tests: can be paused mid-task, made to
// fail, and remembers which input every output was computed from.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use image::DynamicImage;
use scanflow_core::error::{Result, ScanError};
use scanflow_core::{CropRegion, FilterKind, ImageId, PageImage, TransformKernel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Rotate(u32),
    Filter(FilterKind),
    Crop,
}

#[derive(Default)]
pub(crate) struct FakeKernel {
    paused: Mutex<bool>,
    resumed: Condvar,
    entered: AtomicUsize,
    fail_filters: AtomicBool,
    fail_rotations: AtomicBool,
    lineage: Mutex<HashMap<ImageId, (Step, ImageId)>>,
}

impl FakeKernel {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn pause(&self) {
        *self.paused.lock().unwrap() = true;
    }

    pub(crate) fn resume(&self) {
        *self.paused.lock().unwrap() = false;
        self.resumed.notify_all();
    }

    pub(crate) fn fail_filters(&self, fail: bool) {
        self.fail_filters.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_rotations(&self, fail: bool) {
        self.fail_rotations.store(fail, Ordering::SeqCst);
    }

    /// Kernel calls started so far (including ones blocked by `pause`).
    pub(crate) fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// Wait until at least `calls` kernel calls have started.
    pub(crate) async fn wait_entered(&self, calls: usize) {
        while self.entered() < calls {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Which step produced `output`, and from which input.
    pub(crate) fn source_of(&self, output: &PageImage) -> Option<(Step, ImageId)> {
        self.lineage.lock().unwrap().get(&output.id()).copied()
    }

    fn enter(&self) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let mut paused = self.paused.lock().unwrap();
        while *paused {
            paused = self.resumed.wait(paused).unwrap();
        }
    }

    fn produce(&self, input: &PageImage, step: Step, width: u32, height: u32) -> PageImage {
        let output = PageImage::new(DynamicImage::new_rgb8(width, height));
        self.lineage
            .lock()
            .unwrap()
            .insert(output.id(), (step, input.id()));
        output
    }
}

impl TransformKernel for FakeKernel {
    fn rotate(&self, image: &PageImage, degrees: u32) -> Result<PageImage> {
        self.enter();
        if self.fail_rotations.load(Ordering::SeqCst) {
            return Err(ScanError::Kernel(format!("rotate by {degrees} exploded")));
        }
        let (w, h) = if degrees % 180 == 90 {
            (image.height(), image.width())
        } else {
            (image.width(), image.height())
        };
        Ok(self.produce(image, Step::Rotate(degrees), w, h))
    }

    fn filter(&self, image: &PageImage, filter: FilterKind) -> Result<PageImage> {
        self.enter();
        if self.fail_filters.load(Ordering::SeqCst) {
            return Err(ScanError::Kernel(format!("{filter} exploded")));
        }
        Ok(self.produce(image, Step::Filter(filter), image.width(), image.height()))
    }

    fn crop(&self, image: &PageImage, region: &CropRegion) -> Result<PageImage> {
        self.enter();
        let (_, _, w, h) = region.to_pixels(image.width(), image.height());
        Ok(self.produce(image, Step::Crop, w, h))
    }
}

pub(crate) fn page(width: u32, height: u32) -> PageImage {
    PageImage::new(DynamicImage::new_rgb8(width, height))
}
