// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-worker transform queue.
//
// One tokio task per editing view drains an unbounded FIFO. Each task reads
// its input from the session when it starts, runs the kernel on the blocking
// pool, then commits through `DocumentSession::commit`, which re-validates the
// slot. A result whose slot vanished or whose input was replaced meanwhile is
// discarded rather than written into whatever now sits at that position.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use scanflow_core::error::{Result, ScanError};
use scanflow_core::{CropRegion, FilterKind, PageImage, TransformKernel};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::session::{DocumentSession, SlotRef};

/// Sequential per-executor task number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformKind {
    /// Rotate to `degrees` clockwise from the upright basis.
    Rotate { degrees: u32 },
    Filter { filter: FilterKind },
    Crop { region: CropRegion },
}

#[derive(Debug, Clone)]
pub struct TransformTask {
    pub id: TaskId,
    pub target: SlotRef,
    pub kind: TransformKind,
    pub submitted_at: Instant,
}

/// Outcome of one task, published on [`TransformExecutor::reports`].
#[derive(Debug, Clone)]
pub enum TaskReport {
    /// The result was written into the session.
    Committed { task: TransformTask },
    /// The slot vanished, changed underneath, or the executor was abandoned.
    Discarded { task: TransformTask },
    /// The kernel produced no result; the entry was left unchanged.
    Failed {
        task: TransformTask,
        error: Arc<ScanError>,
    },
}

impl TaskReport {
    pub fn task(&self) -> &TransformTask {
        match self {
            Self::Committed { task } | Self::Discarded { task } | Self::Failed { task, .. } => task,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Called on the worker once a task has settled, before the report is
/// broadcast.
pub(crate) type OnSettled = Box<dyn FnOnce(&TaskReport) + Send + 'static>;

enum Job {
    Run {
        task: TransformTask,
        on_settled: Option<OnSettled>,
    },
    Barrier(oneshot::Sender<()>),
}

/// Input captured when a task starts.
enum Input {
    Rotate {
        upright: PageImage,
        applied: FilterKind,
    },
    Source(PageImage),
}

/// Kernel output ready to commit.
enum Output {
    Rotated {
        original: PageImage,
        displayed: PageImage,
    },
    Filtered(PageImage),
    Cropped(PageImage),
}

struct Worker {
    session: Arc<DocumentSession>,
    kernel: Arc<dyn TransformKernel>,
    abandoned: Arc<AtomicBool>,
    reports: broadcast::Sender<TaskReport>,
}

/// FIFO transform queue bound to one session.
///
/// Must be created inside a tokio runtime.
pub struct TransformExecutor {
    queue: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
    abandoned: Arc<AtomicBool>,
    reports: broadcast::Sender<TaskReport>,
}

const REPORT_CAPACITY: usize = 256;

impl TransformExecutor {
    pub fn new(session: Arc<DocumentSession>, kernel: Arc<dyn TransformKernel>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (reports, _) = broadcast::channel(REPORT_CAPACITY);
        let abandoned = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            session,
            kernel,
            abandoned: Arc::clone(&abandoned),
            reports: reports.clone(),
        };
        let handle = tokio::spawn(worker.run(rx));
        info!("Transform worker started");
        Self {
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
            next_id: AtomicU64::new(1),
            abandoned,
            reports,
        }
    }

    /// Queue a task. Never blocks.
    pub fn submit(&self, target: SlotRef, kind: TransformKind) -> Result<TaskId> {
        self.submit_with(target, kind, None)
    }

    pub(crate) fn submit_with(
        &self,
        target: SlotRef,
        kind: TransformKind,
        on_settled: Option<OnSettled>,
    ) -> Result<TaskId> {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let task = TransformTask {
            id,
            target,
            kind,
            submitted_at: Instant::now(),
        };
        debug!(%id, index = target.index, ?kind, "task queued");
        self.send(Job::Run { task, on_settled })?;
        Ok(id)
    }

    fn send(&self, job: Job) -> Result<()> {
        let queue = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match queue.as_ref() {
            Some(tx) => tx.send(job).map_err(|_| ScanError::WorkerStopped),
            None => Err(ScanError::WorkerStopped),
        }
    }

    /// Subscribe to task outcomes.
    pub fn reports(&self) -> broadcast::Receiver<TaskReport> {
        self.reports.subscribe()
    }

    /// Resolve once every task submitted before this call has settled.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.send(Job::Barrier(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// The owning view is gone for good: queued tasks still run, but nothing
    /// they produce is committed.
    pub fn abandon(&self) {
        info!("Transform executor abandoned");
        self.abandoned.store(true, Ordering::SeqCst);
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Stop accepting work, let the queue drain and join the worker.
    pub async fn shutdown(&self) {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "transform worker ended abnormally");
            }
        }
        info!("Transform worker stopped");
    }
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = rx.recv().await {
            match job {
                Job::Barrier(done) => {
                    let _ = done.send(());
                }
                Job::Run { task, on_settled } => {
                    let report = self.execute(task).await;
                    if let Some(callback) = on_settled {
                        callback(&report);
                    }
                    let _ = self.reports.send(report);
                }
            }
        }
    }

    #[instrument(skip_all, fields(task = %task.id, index = task.target.index))]
    async fn execute(&self, task: TransformTask) -> TaskReport {
        let Some(input) = self.read_input(&task) else {
            debug!("slot gone before the task started");
            return TaskReport::Discarded { task };
        };
        let basis = match &input {
            Input::Rotate { upright, .. } => upright.clone(),
            Input::Source(image) => image.clone(),
        };

        let kernel = Arc::clone(&self.kernel);
        let kind = task.kind;
        let joined = tokio::task::spawn_blocking(move || run_kernel(kernel.as_ref(), kind, input)).await;
        let output = match joined {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!(error = %err, "transform kernel failed");
                return TaskReport::Failed {
                    task,
                    error: Arc::new(err),
                };
            }
            Err(join_err) => {
                warn!(error = %join_err, "transform kernel panicked");
                return TaskReport::Failed {
                    task,
                    error: Arc::new(ScanError::Kernel(join_err.to_string())),
                };
            }
        };

        if self.abandoned.load(Ordering::SeqCst) {
            debug!("executor abandoned, result dropped");
            return TaskReport::Discarded { task };
        }

        let committed = match (task.kind, output) {
            (TransformKind::Rotate { degrees }, Output::Rotated { original, displayed }) => {
                self.session.commit(
                    task.target,
                    |entry| entry.upright.same_as(&basis),
                    |entry| {
                        entry.original = original;
                        entry.displayed = displayed;
                        entry.rotation = degrees % 360;
                    },
                )
            }
            (TransformKind::Filter { filter }, Output::Filtered(displayed)) => self.session.commit(
                task.target,
                |entry| entry.original.same_as(&basis),
                |entry| {
                    entry.displayed = displayed;
                    entry.applied_filter = filter;
                    entry.filter_index = filter.index();
                },
            ),
            (TransformKind::Crop { .. }, Output::Cropped(image)) => self.session.commit(
                task.target,
                |entry| entry.original.same_as(&basis),
                |entry| {
                    entry.original = image.clone();
                    entry.displayed = image.clone();
                    entry.upright = image;
                    entry.rotation = 0;
                    entry.applied_filter = FilterKind::None;
                },
            ),
            _ => false,
        };

        if committed {
            debug!(elapsed_ms = task.submitted_at.elapsed().as_millis() as u64, "task committed");
            TaskReport::Committed { task }
        } else {
            debug!("slot changed while the task ran, result discarded");
            TaskReport::Discarded { task }
        }
    }

    fn read_input(&self, task: &TransformTask) -> Option<Input> {
        self.session.read(task.target, |entry| match task.kind {
            TransformKind::Rotate { .. } => Input::Rotate {
                upright: entry.upright.clone(),
                applied: entry.applied_filter,
            },
            TransformKind::Filter { .. } | TransformKind::Crop { .. } => {
                Input::Source(entry.original.clone())
            }
        })
    }
}

fn run_kernel(kernel: &dyn TransformKernel, kind: TransformKind, input: Input) -> Result<Output> {
    match (kind, input) {
        (TransformKind::Rotate { degrees }, Input::Rotate { upright, applied }) => {
            let original = if degrees % 360 == 0 {
                upright
            } else {
                kernel.rotate(&upright, degrees % 360)?
            };
            // Keep the applied filter on the rotated page.
            let displayed = if applied.is_none() {
                original.clone()
            } else {
                kernel.filter(&original, applied)?
            };
            Ok(Output::Rotated { original, displayed })
        }
        (TransformKind::Filter { filter }, Input::Source(original)) => {
            if filter.is_none() {
                Ok(Output::Filtered(original))
            } else {
                Ok(Output::Filtered(kernel.filter(&original, filter)?))
            }
        }
        (TransformKind::Crop { region }, Input::Source(original)) => {
            Ok(Output::Cropped(kernel.crop(&original, &region)?))
        }
        _ => Err(ScanError::Kernel("task input does not match its kind".into())),
    }
}
