//! Bounded pool of expensive handles (browser processes).
//!
//! Handles move `available -> checked out -> available`; a handle found dead on release
//! is closed and replaced instead of re-queued. The pool never holds more than
//! `max_resources` handles, counting checked-out ones and creations in progress.
//!
//! Checked-out handles should be given back with [`ResourcePool::release`];
//! [`ResourcePool::run_scoped`] does that on every exit path. A handle dropped without
//! being released gives up its slot: the resource is closed and a waiter is woken.

mod browser;
mod manager;

pub use browser::{BrowserInstance, BrowserManager, BrowserSession};
pub use manager::ResourceManager;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::sync::{Arc, Weak};
use std::time::Duration;

use arcadia_types::{PoolConfig, PoolError};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Most handles created by [`ResourcePool::initialize`].
const MAX_WARM: usize = 2;

/// Where an unreleased handle hands its slot back.
trait ReturnSlot: Send + Sync {
    fn reclaim(self: Arc<Self>, id: u64, generation: u64);
}

/// A checked-out resource. Not `Clone`: a lent handle is never duplicated.
pub struct PooledHandle<R> {
    id: u64,
    generation: u64,
    resource: R,
    /// Cleared once the handle is back in the pool's hands.
    slot: Option<Weak<dyn ReturnSlot>>,
}

impl<R> PooledHandle<R> {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<R: Clone> PooledHandle<R> {
    fn disarm(mut self) -> Idle<R> {
        self.slot = None;
        Idle { id: self.id, generation: self.generation, resource: self.resource.clone() }
    }
}

impl<R: fmt::Debug> fmt::Debug for PooledHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledHandle")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

impl<R> Drop for PooledHandle<R> {
    fn drop(&mut self) {
        if let Some(pool) = self.slot.take().and_then(|slot| slot.upgrade()) {
            pool.reclaim(self.id, self.generation);
        }
    }
}

/// A resource owned by the pool and not lent out.
struct Idle<R> {
    id: u64,
    generation: u64,
    resource: R,
}

impl<R> Deref for PooledHandle<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub created: usize,
    pub available: usize,
    pub checked_out: usize,
    pub max_resources: usize,
    pub initialized: bool,
}

struct PoolState<R> {
    available: VecDeque<Idle<R>>,
    /// Every live handle of the current generation, available or checked out.
    tracked: HashMap<u64, R>,
    /// Creations reserved but not yet registered.
    pending: usize,
    initialized: bool,
    /// Bumped by `close_all`; handles from older generations are discarded on release.
    generation: u64,
    next_id: u64,
}

impl<R> PoolState<R> {
    fn occupied(&self) -> usize {
        self.tracked.len() + self.pending
    }
}

enum Checkout<R> {
    Ready(Idle<R>),
    Create,
    /// At capacity, or closed and not yet re-initialized.
    Wait,
}

pub struct ResourcePool<M: ResourceManager> {
    inner: Arc<PoolInner<M>>,
}

impl<M: ResourceManager> Clone for ResourcePool<M> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

struct PoolInner<M: ResourceManager> {
    manager: M,
    config: PoolConfig,
    state: Mutex<PoolState<M::Resource>>,
    returned: Notify,
    me: Weak<PoolInner<M>>,
    /// Serializes initialize and close_all.
    lifecycle: tokio::sync::Mutex<()>,
}

/// Frees a reserved creation slot unless the creation was registered.
struct Reservation<'a, M: ResourceManager> {
    inner: &'a PoolInner<M>,
}

impl<M: ResourceManager> Drop for Reservation<'_, M> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        state.pending = state.pending.saturating_sub(1);
        drop(state);
        self.inner.returned.notify_one();
    }
}

impl<M: ResourceManager> PoolInner<M> {
    fn reserve(&self) -> Option<Reservation<'_, M>> {
        let mut state = self.state.lock();
        if state.occupied() < self.config.max_resources {
            state.pending += 1;
            Some(Reservation { inner: self })
        } else {
            None
        }
    }

    fn checkout(&self) -> Checkout<M::Resource> {
        let mut state = self.state.lock();
        if !state.initialized {
            return Checkout::Wait;
        }
        if let Some(idle) = state.available.pop_front() {
            return Checkout::Ready(idle);
        }
        if state.occupied() < self.config.max_resources {
            state.pending += 1;
            return Checkout::Create;
        }
        Checkout::Wait
    }

    fn lend(&self, idle: Idle<M::Resource>) -> PooledHandle<M::Resource> {
        let slot: Weak<dyn ReturnSlot> = self.me.clone();
        PooledHandle { id: idle.id, generation: idle.generation, resource: idle.resource, slot: Some(slot) }
    }

    /// Create a resource in a slot that has already been reserved.
    async fn create_reserved(&self, reservation: Reservation<'_, M>) -> Result<Idle<M::Resource>, PoolError> {
        let result = self.manager.create().await;
        let handle = match result {
            Ok(resource) => {
                let mut state = self.state.lock();
                let id = state.next_id;
                state.next_id += 1;
                state.tracked.insert(id, resource.clone());
                debug!(id, total = state.tracked.len(), "Created pooled resource");
                Ok(Idle { id, generation: state.generation, resource })
            },
            Err(e) => {
                error!(error = %e, "Failed to create pooled resource");
                Err(e)
            },
        };
        drop(reservation);
        handle
    }

    fn make_available(&self, idle: Idle<M::Resource>) {
        self.state.lock().available.push_back(idle);
        self.returned.notify_one();
    }
}

impl<M: ResourceManager> ReturnSlot for PoolInner<M> {
    fn reclaim(self: Arc<Self>, id: u64, generation: u64) {
        let resource = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.tracked.remove(&id)
        };
        self.returned.notify_one();

        let Some(resource) = resource else {
            return;
        };
        warn!(id, "Pooled handle dropped without release, retiring it");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    self.manager.close(resource).await;
                });
            },
            Err(_) => error!(id, "Pooled handle dropped outside a runtime, resource not closed"),
        }
    }
}

impl<M: ResourceManager> ResourcePool<M> {
    pub fn new(manager: M, config: PoolConfig) -> Self {
        let config = PoolConfig { max_resources: config.max_resources.max(1), ..config };
        Self {
            inner: Arc::new_cyclic(|me| PoolInner {
                manager,
                config,
                state: Mutex::new(PoolState {
                    available: VecDeque::new(),
                    tracked: HashMap::new(),
                    pending: 0,
                    initialized: false,
                    generation: 0,
                    next_id: 1,
                }),
                returned: Notify::new(),
                me: me.clone(),
                lifecycle: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn manager(&self) -> &M {
        &self.inner.manager
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            created: state.tracked.len(),
            available: state.available.len(),
            checked_out: state.tracked.len().saturating_sub(state.available.len()),
            max_resources: self.inner.config.max_resources,
            initialized: state.initialized,
        }
    }

    /// Start the manager and pre-create up to two handles. Idempotent.
    ///
    /// A failed pre-warm creation is logged and skipped; only a failed manager
    /// startup is an error.
    pub async fn initialize(&self) -> Result<(), PoolError> {
        if self.inner.state.lock().initialized {
            return Ok(());
        }

        let _lifecycle = self.inner.lifecycle.lock().await;
        if self.inner.state.lock().initialized {
            return Ok(());
        }

        self.inner.manager.startup().await?;

        let warm = self.inner.config.warm_count.min(MAX_WARM).min(self.inner.config.max_resources);
        for _ in 0..warm {
            let Some(reservation) = self.inner.reserve() else {
                break;
            };
            if let Ok(idle) = self.inner.create_reserved(reservation).await {
                self.inner.make_available(idle);
            }
        }

        let mut state = self.inner.state.lock();
        state.initialized = true;
        info!(available = state.available.len(), max = self.inner.config.max_resources, "Resource pool initialized");
        Ok(())
    }

    /// Check out a handle, creating one while under capacity.
    ///
    /// At capacity this waits up to `timeout` for a release, then keeps waiting without
    /// a bound. Fails only when creating a handle fails.
    pub async fn acquire(&self, timeout: Duration) -> Result<PooledHandle<M::Resource>, PoolError> {
        if let Some(result) = self.acquire_within(timeout).await? {
            return Ok(result);
        }

        warn!(timeout_ms = timeout.as_millis() as u64, "No pooled resource available, waiting");
        loop {
            let notified = self.inner.returned.notified();
            if let Some(handle) = self.try_checkout().await? {
                return Ok(handle);
            }
            notified.await;
        }
    }

    /// Like [`ResourcePool::acquire`] but gives up after `timeout`.
    pub async fn acquire_strict(&self, timeout: Duration) -> Result<PooledHandle<M::Resource>, PoolError> {
        self.acquire_within(timeout).await?.ok_or(PoolError::Timeout { timeout_ms: timeout.as_millis() as u64 })
    }

    /// Acquire with the configured timeout and strictness.
    pub async fn acquire_default(&self) -> Result<PooledHandle<M::Resource>, PoolError> {
        let timeout = self.inner.config.acquire_timeout();
        if self.inner.config.strict_timeout {
            self.acquire_strict(timeout).await
        } else {
            self.acquire(timeout).await
        }
    }

    /// `Ok(None)` when `timeout` passed with the pool at capacity.
    async fn acquire_within(&self, timeout: Duration) -> Result<Option<PooledHandle<M::Resource>>, PoolError> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.inner.returned.notified();
            if let Some(handle) = self.try_checkout().await? {
                return Ok(Some(handle));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    /// Re-initializes first, so a waiter that sleeps across `close_all` never creates
    /// on a stopped manager.
    async fn try_checkout(&self) -> Result<Option<PooledHandle<M::Resource>>, PoolError> {
        self.initialize().await?;
        match self.inner.checkout() {
            Checkout::Ready(idle) => Ok(Some(self.inner.lend(idle))),
            Checkout::Create => {
                let reservation = Reservation { inner: &*self.inner };
                let idle = self.inner.create_reserved(reservation).await?;
                Ok(Some(self.inner.lend(idle)))
            },
            Checkout::Wait => Ok(None),
        }
    }

    /// Return a handle. A dead handle is closed and replaced.
    pub async fn release(&self, handle: PooledHandle<M::Resource>) {
        let idle = handle.disarm();
        let current = self.inner.state.lock().generation;
        if idle.generation != current {
            debug!(id = idle.id, "Dropping handle from a closed pool generation");
            return;
        }

        if self.inner.manager.is_alive(&idle.resource) {
            self.inner.make_available(idle);
            return;
        }

        warn!(id = idle.id, "Pooled resource died, creating replacement");
        self.inner.state.lock().tracked.remove(&idle.id);
        self.inner.manager.close(idle.resource).await;

        match self.inner.reserve() {
            Some(reservation) => {
                if let Ok(replacement) = self.inner.create_reserved(reservation).await {
                    self.inner.make_available(replacement);
                }
            },
            None => self.inner.returned.notify_one(),
        }
    }

    /// Check out a handle (unless one is supplied) and derive an isolated session.
    ///
    /// When the session cannot be created the handle goes back to the pool.
    pub async fn create_scoped_session(
        &self,
        handle: Option<PooledHandle<M::Resource>>,
    ) -> Result<ScopedSession<M>, PoolError> {
        let handle = match handle {
            Some(handle) => handle,
            None => self.acquire_default().await?,
        };

        match self.inner.manager.new_session(&handle.resource).await {
            Ok(session) => Ok(ScopedSession { pool: self.clone(), session, handle: Some(handle) }),
            Err(e) => {
                warn!(id = handle.id, error = %e, "Session creation failed, releasing handle");
                self.release(handle).await;
                Err(e)
            },
        }
    }

    /// Acquire, open a session, run `f`, then close the session and release the handle.
    pub async fn run_scoped<T, F, Fut>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(M::Session) -> Fut,
        Fut: Future<Output = T>,
    {
        let scoped = self.create_scoped_session(None).await?;
        let session = scoped.session().clone();
        // Dropping `scoped` cleans up if `f` panics or the future is cancelled.
        let output = f(session).await;
        scoped.finish().await;
        Ok(output)
    }

    /// Close every tracked handle, drain the queue and stop the manager.
    ///
    /// Handles still checked out are closed too and discarded when released. The pool
    /// re-initializes on the next acquire. Safe to call repeatedly.
    pub async fn close_all(&self) {
        let _lifecycle = self.inner.lifecycle.lock().await;

        let tracked = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.initialized = false;
            state.available.clear();
            std::mem::take(&mut state.tracked)
        };

        let count = tracked.len();
        for (_, resource) in tracked {
            self.inner.manager.close(resource).await;
        }
        self.inner.manager.shutdown().await;
        self.inner.returned.notify_waiters();

        info!(closed = count, "Resource pool closed");
    }
}

/// A session plus the handle it came from.
///
/// Call [`ScopedSession::finish`]. Dropping it unfinished schedules the cleanup on the
/// current runtime.
pub struct ScopedSession<M: ResourceManager> {
    pool: ResourcePool<M>,
    session: M::Session,
    handle: Option<PooledHandle<M::Resource>>,
}

impl<M: ResourceManager> ScopedSession<M> {
    pub fn session(&self) -> &M::Session {
        &self.session
    }

    pub fn handle(&self) -> Option<&PooledHandle<M::Resource>> {
        self.handle.as_ref()
    }

    /// Close the session and release the handle.
    pub async fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.inner.manager.close_session(self.session.clone()).await;
            self.pool.release(handle).await;
        }
    }
}

impl<M: ResourceManager> Drop for ScopedSession<M> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let pool = self.pool.clone();
        let session = self.session.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    pool.inner.manager.close_session(session).await;
                    pool.release(handle).await;
                });
            },
            // The handle's own drop retires its slot.
            Err(_) => error!(id = handle.id, "Scoped session dropped outside a runtime, session not closed"),
        }
    }
}
