//! Bounded concurrent tile fetching.
//!
//! Ids wait in a FIFO until one of `max_concurrent` semaphore permits is
//! free, then move to the in-flight set and get their own local task.  The
//! task's `InFlightSlot` owns the permit, so the slot is given back on every
//! exit path, including a failed fetch.
//!
//! Completions go through `TileState::commit`, which only accepts a tile
//! whose cache entry is still pending.  That re-check is what keeps a late
//! result for an evicted tile out of the cache; in-flight requests are never
//! cancelled.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

use crate::render::TileRenderer;
use crate::service::TileService;
use crate::state::TileState;
use crate::types::TileId;

/// Running totals for one queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub started: usize,
    pub loaded: usize,
    pub failed: usize,
    /// Fetched fine, but the tile was no longer wanted.
    pub discarded: usize,
    pub peak_in_flight: usize,
}

struct QueueInner<S, R> {
    service: Rc<S>,
    state: Rc<TileState<R>>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    pending: RefCell<VecDeque<TileId>>,
    in_flight: RefCell<HashSet<TileId>>,
    stats: Cell<QueueStats>,
    idle: Notify,
    closed: Cell<bool>,
}

impl<S, R> QueueInner<S, R> {
    fn bump(&self, f: impl FnOnce(&mut QueueStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn is_idle(&self) -> bool {
        self.pending.borrow().is_empty() && self.in_flight.borrow().is_empty()
    }

    fn notify_if_idle(&self) {
        if self.is_idle() {
            self.idle.notify_waiters();
        }
    }
}

/// Holds one permit for the life of a fetch.
struct InFlightSlot<'a, S, R> {
    queue: &'a QueueInner<S, R>,
    id: TileId,
    _permit: OwnedSemaphorePermit,
}

impl<S, R> Drop for InFlightSlot<'_, S, R> {
    fn drop(&mut self) {
        self.queue.in_flight.borrow_mut().remove(&self.id);
        // Also runs when the task is dropped before reaching its pump.
        self.queue.notify_if_idle();
    }
}

pub struct FetchQueue<S, R> {
    inner: Rc<QueueInner<S, R>>,
}

impl<S, R> Clone for FetchQueue<S, R> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<S, R> FetchQueue<S, R>
where
    S: TileService + 'static,
    R: TileRenderer + 'static,
{
    pub fn new(service: Rc<S>, state: Rc<TileState<R>>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            inner: Rc::new(QueueInner {
                service,
                state,
                permits: Arc::new(Semaphore::new(max_concurrent)),
                max_concurrent,
                pending: RefCell::new(VecDeque::new()),
                in_flight: RefCell::new(HashSet::new()),
                stats: Cell::new(QueueStats::default()),
                idle: Notify::new(),
                closed: Cell::new(false),
            }),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Queue ids for fetching and start as many as the bound allows.
    /// Ids already pending or in flight are skipped.  Returns how many were
    /// queued.
    ///
    /// Fetch tasks are spawned with `spawn_local`, so this must run inside a
    /// `tokio::task::LocalSet`.
    pub fn enqueue<I: IntoIterator<Item = TileId>>(&self, ids: I) -> usize {
        if self.inner.closed.get() {
            return 0;
        }
        let mut added = 0;
        {
            let in_flight = self.inner.in_flight.borrow();
            let mut pending = self.inner.pending.borrow_mut();
            for id in ids {
                if in_flight.contains(&id) || pending.contains(&id) {
                    log::debug!("Tile {id} already queued");
                    continue;
                }
                pending.push_back(id);
                added += 1;
            }
        }
        self.pump();
        added
    }

    /// Drop a not-yet-started id from the FIFO.
    pub fn cancel_pending(&self, id: &TileId) -> bool {
        let removed = {
            let mut pending = self.inner.pending.borrow_mut();
            let before = pending.len();
            pending.retain(|p| p != id);
            pending.len() != before
        };
        self.inner.notify_if_idle();
        removed
    }

    pub fn clear_pending(&self) -> usize {
        let n = {
            let mut pending = self.inner.pending.borrow_mut();
            let n = pending.len();
            pending.clear();
            n
        };
        self.inner.notify_if_idle();
        n
    }

    /// Stop starting fetches.  Running fetches finish, but their results
    /// are thrown away once the shared state is closed.
    pub fn close(&self) {
        self.inner.closed.set(true);
        self.clear_pending();
    }

    pub fn pending(&self) -> Vec<TileId> {
        self.inner.pending.borrow().iter().cloned().collect()
    }

    /// In-flight ids, sorted.
    pub fn in_flight(&self) -> Vec<TileId> {
        let mut ids: Vec<TileId> = self.inner.in_flight.borrow().iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.inner.is_idle()
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.stats.get()
    }

    /// Resolves once nothing is pending or in flight.
    pub async fn drained(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn pump(&self) {
        while !self.inner.closed.get() {
            let Ok(permit) = self.inner.permits.clone().try_acquire_owned() else {
                break;
            };
            let Some(id) = self.inner.pending.borrow_mut().pop_front() else {
                break;
            };
            self.start(id, permit);
        }
        self.inner.notify_if_idle();
    }

    fn start(&self, id: TileId, permit: OwnedSemaphorePermit) {
        let in_flight = {
            let mut set = self.inner.in_flight.borrow_mut();
            set.insert(id.clone());
            set.len()
        };
        self.inner.bump(|s| {
            s.started += 1;
            s.peak_in_flight = s.peak_in_flight.max(in_flight);
        });

        let queue = self.clone();
        tokio::task::spawn_local(async move {
            {
                let _slot = InFlightSlot { queue: &queue.inner, id: id.clone(), _permit: permit };
                queue.fetch_one(&id).await;
            }
            queue.pump();
        });
    }

    async fn fetch_one(&self, id: &TileId) {
        log::debug!("Loading tile: {id}");
        let inner = &self.inner;
        match inner.service.fetch_tile(id).await {
            Ok(features) => {
                if inner.state.commit(id, features) {
                    log::info!("Rendered tile: {id}");
                    inner.bump(|s| s.loaded += 1);
                } else {
                    log::debug!("Discarding tile {id}: no longer wanted");
                    inner.bump(|s| s.discarded += 1);
                }
            }
            Err(e) => {
                log::warn!("Error loading tile {id}: {e}");
                inner.state.abandon(id);
                inner.bump(|s| s.failed += 1);
            }
        }
    }
}
