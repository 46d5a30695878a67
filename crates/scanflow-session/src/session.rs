// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The document session: an ordered list of scanned pages shared between the
// interactive context and the transform worker.
//
// All state lives in a single `Vec<DocumentEntry>` behind one mutex. Every
// operation takes the lock for its whole duration, so a removal can never
// interleave with a completion writing into the same position, and the
// per-entry attributes move together on structural changes.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use scanflow_core::{EntryId, FilterKind, PageImage, ScanConfig};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// One scanned page.
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    /// Stable identity; survives position shifts.
    pub id: EntryId,
    /// As captured, or the last non-filter replacement (crop, rotation).
    pub original: PageImage,
    /// What is shown and exported: `original` or a filter output of it.
    pub displayed: PageImage,
    /// Selected catalog position. Set on selection, before the filter runs.
    pub filter_index: usize,
    /// Filter whose output `displayed` currently holds.
    pub applied_filter: FilterKind,
    /// Un-rotated basis that rotations are computed from.
    pub upright: PageImage,
    /// Clockwise rotation of `original` relative to `upright`.
    pub rotation: u32,
    pub captured_at: DateTime<Utc>,
}

impl DocumentEntry {
    fn new(image: PageImage) -> Self {
        Self {
            id: EntryId::new(),
            original: image.clone(),
            displayed: image.clone(),
            filter_index: 0,
            applied_filter: FilterKind::None,
            upright: image,
            rotation: 0,
            captured_at: Utc::now(),
        }
    }

    /// `displayed` is `original` exactly when no filter is applied.
    pub fn is_consistent(&self) -> bool {
        self.applied_filter.is_none() == self.displayed.same_as(&self.original)
    }

    /// Catalog entry for the selected filter.
    pub fn selected_filter(&self) -> FilterKind {
        FilterKind::from_index(self.filter_index).unwrap_or_default()
    }
}

/// Position plus identity of an entry, as captured when a task was queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRef {
    pub index: usize,
    pub entry: EntryId,
}

/// Published after every committed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// Contents of one entry changed in place.
    Entry(usize),
    /// A new entry was appended at this position.
    Inserted(usize),
    /// The entry at this position was removed; later entries shifted down.
    Removed(usize),
    /// The whole session was cleared.
    All,
}

/// Immutable copy of the session taken under the lock.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    entries: Vec<DocumentEntry>,
}

impl SessionSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DocumentEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentEntry> {
        self.entries.iter()
    }

    /// The pages to hand to persistence, in order.
    pub fn displayed_images(&self) -> Vec<PageImage> {
        self.entries.iter().map(|e| e.displayed.clone()).collect()
    }
}

/// Ordered collection of scanned pages for one scanning workflow.
///
/// Shared as `Arc<DocumentSession>` between the workflow, every editing view
/// and their transform workers.
pub struct DocumentSession {
    entries: Mutex<Vec<DocumentEntry>>,
    changes: broadcast::Sender<SessionChange>,
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new(ScanConfig::default().change_channel_capacity)
    }
}

impl DocumentSession {
    /// Create an empty session. `change_capacity` bounds how far a slow
    /// change subscriber may lag before it starts missing notifications.
    pub fn new(change_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(change_capacity.max(1));
        Self {
            entries: Mutex::new(Vec::new()),
            changes,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.change_channel_capacity)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DocumentEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, change: SessionChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }

    /// Append a captured page. Returns its position, or `None` when there is
    /// no image or the image has no pixels.
    pub fn add(&self, image: Option<PageImage>) -> Option<usize> {
        let image = image.filter(|img| !img.is_empty())?;
        let mut entries = self.lock();
        entries.push(DocumentEntry::new(image));
        let index = entries.len() - 1;
        info!(index, entry = %entries[index].id, "Page added to session");
        self.publish(SessionChange::Inserted(index));
        Some(index)
    }

    /// Remove the entry at `index`; later entries shift down.
    pub fn remove_at(&self, index: usize) -> bool {
        let mut entries = self.lock();
        if index >= entries.len() {
            debug!(index, len = entries.len(), "remove_at out of range");
            return false;
        }
        let removed = entries.remove(index);
        info!(index, entry = %removed.id, "Page removed from session");
        self.publish(SessionChange::Removed(index));
        true
    }

    /// Overwrite the displayed image. A non-filter replacement (crop, manual
    /// edit) also becomes the new original and rotation basis.
    ///
    /// A filter result is recorded as the output of the selected filter, and
    /// is refused while no filter is selected.
    pub fn replace_displayed(&self, index: usize, image: PageImage, is_filter_result: bool) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(index) else {
            debug!(index, "replace_displayed out of range");
            return false;
        };
        if is_filter_result {
            let filter = entry.selected_filter();
            if filter.is_none() {
                debug!(index, "filter result without a selected filter");
                return false;
            }
            entry.displayed = image;
            entry.applied_filter = filter;
        } else {
            entry.original = image.clone();
            entry.displayed = image.clone();
            entry.upright = image;
            entry.rotation = 0;
            entry.applied_filter = FilterKind::None;
        }
        debug!(index, is_filter_result, "displayed image replaced");
        self.publish(SessionChange::Entry(index));
        true
    }

    /// Record the selected filter for an entry.
    pub fn set_filter_index(&self, index: usize, filter_index: usize) -> bool {
        if FilterKind::from_index(filter_index).is_none() {
            debug!(filter_index, "filter index outside the catalog");
            return false;
        }
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(index) else {
            debug!(index, "set_filter_index out of range");
            return false;
        };
        entry.filter_index = filter_index;
        self.publish(SessionChange::Entry(index));
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            entries: self.lock().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<DocumentEntry> {
        self.lock().get(index).cloned()
    }

    /// Handle for the entry currently at `index`.
    pub fn slot_at(&self, index: usize) -> Option<SlotRef> {
        self.lock().get(index).map(|entry| SlotRef {
            index,
            entry: entry.id,
        })
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.lock();
        let dropped = entries.len();
        entries.clear();
        info!(dropped, "Session cleared");
        self.publish(SessionChange::All);
    }

    /// Read from the entry `slot` refers to, if it still holds that entry.
    pub(crate) fn read<T>(&self, slot: SlotRef, f: impl FnOnce(&DocumentEntry) -> T) -> Option<T> {
        let entries = self.lock();
        entries
            .get(slot.index)
            .filter(|entry| entry.id == slot.entry)
            .map(f)
    }

    /// Atomic check-and-write used by task completions. Applies `apply` only
    /// if the position still holds the same entry and `check` accepts it.
    pub(crate) fn commit(
        &self,
        slot: SlotRef,
        check: impl FnOnce(&DocumentEntry) -> bool,
        apply: impl FnOnce(&mut DocumentEntry),
    ) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(slot.index) else {
            return false;
        };
        if entry.id != slot.entry || !check(entry) {
            return false;
        }
        apply(entry);
        self.publish(SessionChange::Entry(slot.index));
        true
    }
}
