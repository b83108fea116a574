//! Pending synchronization index.
//!
//! Maps `(owner, path)` to the work waiting for (or undergoing) execution and
//! remembers which key the worker is executing. Both live behind a single
//! mutex so the pending → executing handoff and cancel's decision between
//! "still queued" and "already running" can never interleave.
//!
//! Paths are normalized on the way in; callers may pass `/docs/` or `docs`.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};

use crate::model::{SyncKey, SyncState};
use crate::path;

/// What `take_for_cancel` found for a cancel target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelTarget<W> {
    /// Exact key was queued; it has been removed from the index.
    Pending(W),
    /// The executing entry is the target or nested under it. Left in place:
    /// the worker removes it when execution returns.
    Executing(W),
}

#[derive(Debug)]
struct Inner<W> {
    /// owner → (normalized path → work)
    entries: HashMap<String, BTreeMap<String, W>>,
    current: Option<SyncKey>,
}

impl<W> Inner<W> {
    fn owner_entries(&self, owner: &str) -> Option<&BTreeMap<String, W>> {
        self.entries.get(owner)
    }

    fn remove(&mut self, owner: &str, path: &str) -> Option<W> {
        let paths = self.entries.get_mut(owner)?;
        let removed = paths.remove(path);
        if paths.is_empty() {
            self.entries.remove(owner);
        }
        removed
    }

    fn is_current(&self, owner: &str, path: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| c.owner == owner && c.path == path)
    }
}

/// Thread-safe index of pending synchronizations.
#[derive(Debug)]
pub struct PendingIndex<W> {
    inner: Mutex<Inner<W>>,
}

impl<W> Default for PendingIndex<W> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                current: None,
            }),
        }
    }
}

impl<W: Clone> PendingIndex<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `work` unless the key is already present. Returns whether the
    /// insert happened; a rejected insert leaves the index untouched.
    pub fn put_if_absent(&self, owner: &str, path: &str, work: W) -> bool {
        let path = path::normalize(path);
        let mut inner = self.lock();
        let paths = inner.entries.entry(owner.to_string()).or_default();
        if paths.contains_key(&path) {
            return false;
        }
        paths.insert(path, work);
        true
    }

    /// Is `path`, or any folder nested under it, pending or executing for
    /// `owner`?
    pub fn contains(&self, owner: &str, path: &str) -> bool {
        let path = path::normalize(path);
        let inner = self.lock();
        let Some(paths) = inner.owner_entries(owner) else {
            return false;
        };
        if paths.contains_key(&path) {
            return true;
        }
        // Descendants sort contiguously right after "<path>/".
        let prefix = path::descendant_prefix(&path);
        paths
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .next()
            .is_some_and(|(p, _)| p.starts_with(&prefix))
    }

    /// Exact-key lookup.
    pub fn get(&self, owner: &str, path: &str) -> Option<W> {
        let path = path::normalize(path);
        self.lock()
            .owner_entries(owner)
            .and_then(|paths| paths.get(&path))
            .cloned()
    }

    /// Exact-key removal.
    pub fn remove(&self, owner: &str, path: &str) -> Option<W> {
        let path = path::normalize(path);
        self.lock().remove(owner, &path)
    }

    /// Exact-key removal, only if `pred` agrees about the stored entry.
    pub fn remove_if(&self, owner: &str, path: &str, pred: impl FnOnce(&W) -> bool) -> Option<W> {
        let path = path::normalize(path);
        let mut inner = self.lock();
        let matches = inner
            .owner_entries(owner)
            .and_then(|paths| paths.get(&path))
            .is_some_and(pred);
        if matches {
            inner.remove(owner, &path)
        } else {
            None
        }
    }

    /// Exact-key removal, discarding the payload.
    pub fn remove_payload(&self, owner: &str, path: &str) {
        let _ = self.remove(owner, path);
    }

    /// Look up the entry for `(owner, path)` and, if `accept` agrees, mark it
    /// as the current execution. Both steps happen under one lock.
    pub fn begin_execution(
        &self,
        owner: &str,
        path: &str,
        accept: impl FnOnce(&W) -> bool,
    ) -> Option<W> {
        let path = path::normalize(path);
        let mut inner = self.lock();
        let work = inner
            .owner_entries(owner)
            .and_then(|paths| paths.get(&path))
            .filter(|w| accept(w))
            .cloned()?;
        inner.current = Some(SyncKey {
            owner: owner.to_string(),
            path,
        });
        Some(work)
    }

    /// Remove the entry for `(owner, path)` and clear the current execution
    /// marker if it names that key.
    pub fn finish_execution(&self, owner: &str, path: &str) -> Option<W> {
        let path = path::normalize(path);
        let mut inner = self.lock();
        if inner.is_current(owner, &path) {
            inner.current = None;
        }
        inner.remove(owner, &path)
    }

    /// Decide what a cancel of `(owner, target)` hits.
    ///
    /// An exact, not-yet-executing entry is removed and returned as
    /// [`CancelTarget::Pending`]. Otherwise, if the executing key belongs to
    /// `owner` and sits at or below `target`, its work is returned as
    /// [`CancelTarget::Executing`]. Queued descendants of `target` other than
    /// the exact key are left alone.
    pub fn take_for_cancel(&self, owner: &str, target: &str) -> Option<CancelTarget<W>> {
        let target = path::normalize(target);
        let mut inner = self.lock();

        if !inner.is_current(owner, &target) {
            if let Some(work) = inner.remove(owner, &target) {
                return Some(CancelTarget::Pending(work));
            }
        }

        let current = inner.current.clone()?;
        if !current.is_under(owner, &target) {
            return None;
        }
        inner
            .owner_entries(&current.owner)
            .and_then(|paths| paths.get(&current.path))
            .cloned()
            .map(CancelTarget::Executing)
    }

    /// Key currently executing, if any.
    pub fn current(&self) -> Option<SyncKey> {
        self.lock().current.clone()
    }

    /// Lifecycle state of an exact key.
    pub fn state(&self, owner: &str, path: &str) -> SyncState {
        let path = path::normalize(path);
        let inner = self.lock();
        if inner.is_current(owner, &path) {
            SyncState::Executing
        } else if inner
            .owner_entries(owner)
            .is_some_and(|paths| paths.contains_key(&path))
        {
            SyncState::Pending
        } else {
            SyncState::Absent
        }
    }

    /// Number of entries, executing one included.
    pub fn len(&self) -> usize {
        self.lock().entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Forget every entry, the executing one included. Returns how many were
    /// dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        inner.current = None;
        std::mem::take(&mut inner.entries)
            .values()
            .map(BTreeMap::len)
            .sum()
    }

    /// Remove every entry that is not executing and return them.
    pub fn drain_pending(&self) -> Vec<(SyncKey, W)> {
        let mut inner = self.lock();
        let current = inner.current.clone();
        let entries = std::mem::take(&mut inner.entries);
        let mut drained = Vec::new();
        for (owner, paths) in entries {
            for (path, work) in paths {
                let key = SyncKey {
                    owner: owner.clone(),
                    path,
                };
                if current.as_ref() == Some(&key) {
                    inner
                        .entries
                        .entry(key.owner)
                        .or_default()
                        .insert(key.path, work);
                } else {
                    drained.push((key, work));
                }
            }
        }
        drained
    }

    fn lock(&self) -> MutexGuard<'_, Inner<W>> {
        // Every critical section leaves the maps consistent, so a panic while
        // holding the lock does not invalidate the data.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
