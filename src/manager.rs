//! The tile manager: transform in, tiles out.
//!
//! `handle_transform` runs on every pan/zoom event.  Above the zoom threshold
//! it arms the debounce gate; a background driver task waits on the gate and
//! starts one reconciliation cycle per quiet period.  A cycle asks the
//! service which tiles cover the viewport, evicts what is no longer needed
//! and queues what is missing.  Cycles are not ordered against each other;
//! whatever finishes late is checked against the cache at commit time.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tile_lib::TileClient;
use tileview_core::ZoomTransform;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::{BelowThresholdPolicy, ConfigError, ManagerConfig};
use crate::debounce::DebounceGate;
use crate::render::TileRenderer;
use crate::service::TileService;
use crate::state::TileState;
use crate::tiles::{reconcile, FetchQueue, QueueStats};
use crate::types::{TileEntry, TileId, Viewport};
use crate::viewport::ViewportMonitor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Running,
    Disposed,
}

/// What one reconciliation cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Manager not running, or disposed while the resolver was busy.
    Skipped,
    BelowThreshold,
    /// Resolver failed; cache and render group untouched.
    ResolveFailed,
    Reconciled { evicted: usize, acquired: usize },
}

struct ManagerInner<S, R> {
    config: ManagerConfig,
    monitor: ViewportMonitor,
    gate: DebounceGate<Viewport>,
    service: Rc<S>,
    state: Rc<TileState<R>>,
    queue: FetchQueue<S, R>,
    driver: RefCell<Option<JoinHandle<()>>>,
    lifecycle: Cell<Lifecycle>,
    cycles: Cell<usize>,
    cycle_done: Notify,
    /// Bumped whenever a transform lands below the zoom threshold.
    zoom_outs: Cell<u64>,
}

/// Counts a running cycle for `drained`.
struct CycleGuard<S, R> {
    inner: Rc<ManagerInner<S, R>>,
}

impl<S, R> CycleGuard<S, R> {
    fn enter(inner: &Rc<ManagerInner<S, R>>) -> Self {
        inner.cycles.set(inner.cycles.get() + 1);
        Self { inner: inner.clone() }
    }
}

impl<S, R> Drop for CycleGuard<S, R> {
    fn drop(&mut self) {
        self.inner.cycles.set(self.inner.cycles.get() - 1);
        self.inner.cycle_done.notify_waiters();
    }
}

/// Handle to a tile manager.  Clones share the same manager.
///
/// All tasks are spawned with `spawn_local`, so every async method must run
/// inside a `tokio::task::LocalSet`.  The driver task keeps the manager alive
/// until `dispose` is called.
pub struct TileManager<S, R> {
    inner: Rc<ManagerInner<S, R>>,
}

impl<S, R> Clone for TileManager<S, R> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<R> TileManager<TileClient, R>
where
    R: TileRenderer + 'static,
{
    /// Manager talking HTTP to `config.origin`.
    pub fn connect(config: ManagerConfig, renderer: R) -> Result<Self, ConfigError> {
        let client = TileClient::new(&config.origin)?;
        Self::new(config, client, renderer)
    }
}

impl<S, R> TileManager<S, R>
where
    S: TileService + 'static,
    R: TileRenderer + 'static,
{
    pub fn new(config: ManagerConfig, service: S, renderer: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let service = Rc::new(service);
        let state = Rc::new(TileState::new(renderer));
        let queue = FetchQueue::new(service.clone(), state.clone(), config.max_concurrent);
        Ok(Self {
            inner: Rc::new(ManagerInner {
                monitor: ViewportMonitor::new(&config),
                gate: DebounceGate::new(config.debounce()),
                service,
                state,
                queue,
                driver: RefCell::new(None),
                lifecycle: Cell::new(Lifecycle::Created),
                cycles: Cell::new(0),
                cycle_done: Notify::new(),
                zoom_outs: Cell::new(0),
                config,
            }),
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    pub fn monitor(&self) -> &ViewportMonitor {
        &self.inner.monitor
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle.get()
    }

    fn is_running(&self) -> bool {
        self.inner.lifecycle.get() == Lifecycle::Running
    }

    /// Load the boundary overlay, start the debounce driver and process the
    /// starting (identity) transform.  Does nothing after the first call.
    pub async fn initialize(&self) {
        let inner = &self.inner;
        if inner.lifecycle.get() != Lifecycle::Created {
            return;
        }

        match inner.service.fetch_boundaries().await {
            Ok(boundaries) => {
                log::info!("Loaded {} boundaries", boundaries.len());
                inner.state.renderer.borrow_mut().draw_boundaries(&boundaries);
            }
            Err(e) => log::warn!("Error loading boundaries: {e}"),
        }

        // Disposed, or initialized by a concurrent caller, during the fetch.
        if inner.lifecycle.get() != Lifecycle::Created {
            return;
        }
        inner.lifecycle.set(Lifecycle::Running);
        *inner.driver.borrow_mut() = Some(self.spawn_driver());
        self.handle_transform(ZoomTransform::identity());
    }

    fn spawn_driver(&self) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::task::spawn_local(async move {
            loop {
                let viewport = manager.inner.gate.fired().await;
                let guard = CycleGuard::enter(&manager.inner);
                let m = manager.clone();
                tokio::task::spawn_local(async move {
                    let _guard = guard;
                    m.cycle(viewport).await;
                });
            }
        })
    }

    /// Feed a pan/zoom transform.  Returns the viewport it maps to.
    pub fn handle_transform(&self, transform: ZoomTransform) -> Viewport {
        let inner = &self.inner;
        let transform = inner.monitor.clamp(&transform);
        let viewport = inner.monitor.viewport(&transform);
        if !self.is_running() {
            return viewport;
        }

        inner.state.renderer.borrow_mut().set_transform(&transform);
        log::debug!("Zoom level: {:.2}", viewport.zoom);

        if inner.monitor.is_active(&viewport) {
            inner.gate.schedule(viewport);
            return viewport;
        }

        inner.zoom_outs.set(inner.zoom_outs.get() + 1);
        if inner.gate.cancel().is_some() {
            log::debug!("Dropped pending tile update below zoom threshold");
        }
        if inner.config.below_threshold == BelowThresholdPolicy::Evict {
            inner.queue.clear_pending();
            let removed = inner.state.evict_all();
            if removed > 0 {
                log::info!("Removed {removed} tiles below zoom threshold");
            }
        }
        viewport
    }

    /// Run one reconciliation cycle for `viewport` right away, bypassing the
    /// debounce gate.
    pub async fn run_cycle(&self, viewport: Viewport) -> CycleOutcome {
        let _guard = CycleGuard::enter(&self.inner);
        self.cycle(viewport).await
    }

    async fn cycle(&self, viewport: Viewport) -> CycleOutcome {
        let inner = &self.inner;
        if !self.is_running() {
            return CycleOutcome::Skipped;
        }
        if !inner.monitor.is_active(&viewport) {
            return CycleOutcome::BelowThreshold;
        }

        let zoom_outs = inner.zoom_outs.get();
        let resolved = match inner.service.find_tiles(&viewport.bounds).await {
            Ok(ids) => ids,
            Err(e) => {
                log::warn!("Error finding tiles: {e}");
                return CycleOutcome::ResolveFailed;
            }
        };
        if !self.is_running() {
            return CycleOutcome::Skipped;
        }
        if inner.zoom_outs.get() != zoom_outs {
            log::debug!("Dropped tile update: zoomed out below threshold while resolving");
            return CycleOutcome::BelowThreshold;
        }

        let plan = reconcile(&resolved, &inner.state.cache.borrow().keys());
        for id in &plan.evict {
            inner.queue.cancel_pending(id);
            inner.state.evict(id);
            log::info!("Removed tile: {id}");
        }
        {
            let mut cache = inner.state.cache.borrow_mut();
            for id in &plan.acquire {
                cache.insert_pending(id);
            }
        }
        inner.queue.enqueue(plan.acquire.iter().cloned());

        log::debug!(
            "Reconciled {} tiles: {} evicted, {} acquired",
            resolved.len(),
            plan.evict.len(),
            plan.acquire.len()
        );
        CycleOutcome::Reconciled { evicted: plan.evict.len(), acquired: plan.acquire.len() }
    }

    /// Resolves once no update is armed, no cycle is running and the fetch
    /// queue is empty.
    pub async fn drained(&self) {
        let inner = &self.inner;
        loop {
            if let Some(deadline) = inner.gate.deadline() {
                if !self.is_running() {
                    return;
                }
                tokio::time::sleep_until(deadline).await;
                tokio::task::yield_now().await;
                continue;
            }
            if inner.cycles.get() > 0 {
                let done = inner.cycle_done.notified();
                if inner.cycles.get() > 0 {
                    done.await;
                }
                continue;
            }
            inner.queue.drained().await;
            if inner.gate.deadline().is_none() && inner.cycles.get() == 0 {
                return;
            }
        }
    }

    /// Cached ids, pending or loaded, sorted.
    pub fn cache_keys(&self) -> Vec<TileId> {
        let mut keys: Vec<TileId> = self.inner.state.cache.borrow().keys().into_iter().collect();
        keys.sort();
        keys
    }

    pub fn loaded_ids(&self) -> Vec<TileId> {
        self.inner.state.cache.borrow().loaded_ids()
    }

    pub fn entry(&self, id: &TileId) -> Option<TileEntry> {
        self.inner.state.cache.borrow().get(id).cloned()
    }

    pub fn in_flight(&self) -> Vec<TileId> {
        self.inner.queue.in_flight()
    }

    pub fn pending(&self) -> Vec<TileId> {
        self.inner.queue.pending()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.inner.queue.stats()
    }

    pub fn with_renderer<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(&self.inner.state.renderer.borrow())
    }

    /// Stop the driver, drop anything armed or queued and clear the cache
    /// and render group.  Running fetches finish but are thrown away.
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.lifecycle.get() == Lifecycle::Disposed {
            return;
        }
        inner.lifecycle.set(Lifecycle::Disposed);
        if let Some(driver) = inner.driver.borrow_mut().take() {
            driver.abort();
        }
        inner.gate.cancel();
        inner.queue.close();
        inner.state.close();
        log::info!("Tile manager disposed");
    }
}
