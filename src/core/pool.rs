//! Bounded asynchronous resource pool
//!
//! Resources are built on demand by a [`ResourceFactory`] up to
//! `max_resources`. Once the pool is exhausted, callers queue in FIFO order
//! and are resumed by `release`, which hands the resource straight to the
//! longest-waiting caller instead of parking it in the idle set.
//!
//! Accounting: `outstanding` counts checked-out resources plus creations in
//! flight, and `outstanding + idle <= max_resources` holds after every
//! operation. A waiter is only queued when `outstanding == max_resources`
//! and nothing is idle.
//!
//! A waiter receives a [`Grant`]: either a released resource, or the slot of
//! a resource that failed to build or was destroyed, which it then fills by
//! calling the factory itself. This keeps a failed creation from stranding
//! queued callers.

use crate::infrastructure::metrics::{PoolCounters, PoolStats};
use crate::log_pool;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::Level;

/// Boxed error returned by resource factories
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pool errors
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The factory failed while building a resource for this caller
    #[error("resource creation failed: {0}")]
    AcquireFailed(#[source] BoxError),

    #[error("no resource available within {0:?}")]
    Timeout(Duration),

    #[error("pool is closed")]
    Closed,
}

/// Builds and tears down pooled resources
pub trait ResourceFactory: Send + Sync + 'static {
    type Resource: Send + 'static;

    /// Build a fresh resource. May suspend and may fail.
    fn create(&self) -> BoxFuture<'_, Result<Self::Resource, BoxError>>;

    /// Tear a resource down. Defaults to dropping it.
    fn close(&self, resource: Self::Resource) -> BoxFuture<'_, ()> {
        drop(resource);
        Box::pin(std::future::ready(()))
    }
}

/// Factory backed by an async closure
pub struct FnFactory<F> {
    create: F,
}

impl<F, Fut, R, E> ResourceFactory for FnFactory<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Into<BoxError>,
{
    type Resource = R;

    fn create(&self) -> BoxFuture<'_, Result<R, BoxError>> {
        let fut = (self.create)();
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

/// What a queued caller is woken with
enum Grant<R> {
    /// A released resource, handed over directly
    Resource(R),
    /// A free slot; the receiver builds the resource itself
    Slot,
}

struct Waiter<R> {
    id: u64,
    tx: oneshot::Sender<Grant<R>>,
}

/// Where a grant ended up
enum Dispatched<R> {
    HandedOff,
    Idled,
    Freed,
    /// No room or pool closed; caller drops it outside the lock
    Discard(R),
}

struct PoolState<R> {
    idle: VecDeque<R>,
    outstanding: usize,
    waiters: VecDeque<Waiter<R>>,
    next_waiter_id: u64,
    closed: bool,
}

impl<R> PoolState<R> {
    /// Pass a grant to the longest-waiting live caller, or settle it locally
    ///
    /// A handed-off grant keeps its slot counted in `outstanding`; otherwise
    /// the slot is returned.
    fn dispatch(&mut self, mut grant: Grant<R>, max: usize) -> Dispatched<R> {
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.tx.send(grant) {
                Ok(()) => return Dispatched::HandedOff,
                Err(back) => grant = back,
            }
        }

        self.outstanding = self.outstanding.saturating_sub(1);
        match grant {
            Grant::Slot => Dispatched::Freed,
            Grant::Resource(resource)
                if !self.closed && self.outstanding + self.idle.len() < max =>
            {
                self.idle.push_back(resource);
                Dispatched::Idled
            }
            Grant::Resource(resource) => Dispatched::Discard(resource),
        }
    }

    fn remove_waiter(&mut self, id: u64) -> bool {
        match self.waiters.iter().position(|w| w.id == id) {
            Some(pos) => {
                self.waiters.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Point-in-time view of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub max_resources: usize,
    pub idle: usize,
    pub outstanding: usize,
    pub waiting: usize,
    pub closed: bool,
}

/// Bounded pool with fair asynchronous acquisition
///
/// # Example
/// ```
/// use resource_core::core::ResourcePool;
/// use std::num::NonZeroUsize;
///
/// # tokio_test::block_on(async {
/// let pool = ResourcePool::from_fn(NonZeroUsize::new(2).unwrap(), || async {
///     Ok::<_, std::io::Error>(String::from("connection"))
/// });
///
/// let conn = pool.acquire().await.unwrap();
/// pool.release(conn);
/// assert_eq!(pool.status().idle, 1);
/// # });
/// ```
pub struct ResourcePool<F: ResourceFactory> {
    max: NonZeroUsize,
    factory: F,
    state: Mutex<PoolState<F::Resource>>,
    counters: PoolCounters,
}

impl<C, Fut, R, E> ResourcePool<FnFactory<C>>
where
    C: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Into<BoxError>,
{
    /// Pool whose resources come from an async closure
    pub fn from_fn(max_resources: NonZeroUsize, create: C) -> Self {
        Self::new(max_resources, FnFactory { create })
    }
}

impl<F: ResourceFactory> ResourcePool<F> {
    pub fn new(max_resources: NonZeroUsize, factory: F) -> Self {
        Self {
            max: max_resources,
            factory,
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(max_resources.get()),
                outstanding: 0,
                waiters: VecDeque::new(),
                next_waiter_id: 0,
                closed: false,
            }),
            counters: PoolCounters::default(),
        }
    }

    /// Check out a resource, suspending while the pool is exhausted
    ///
    /// Idle resources are reused first, then new ones are built while under
    /// capacity; otherwise the caller queues behind earlier waiters. Dropping
    /// the returned future withdraws the caller from the queue.
    pub async fn acquire(&self) -> Result<F::Resource, PoolError> {
        let pending = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(PoolError::Closed);
            }

            if let Some(resource) = state.idle.pop_front() {
                state.outstanding += 1;
                drop(state);
                self.counters.record_acquired();
                return Ok(resource);
            }

            if state.outstanding < self.max.get() {
                state.outstanding += 1;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                let id = state.next_waiter_id;
                state.next_waiter_id += 1;
                state.waiters.push_back(Waiter { id, tx });
                log_pool!(
                    Level::DEBUG,
                    waiter = id,
                    queued = state.waiters.len(),
                    "pool exhausted, caller queued"
                );
                Some(PendingAcquire {
                    pool: self,
                    id,
                    rx,
                    settled: false,
                })
            }
        };

        let Some(pending) = pending else {
            return self.create_in_slot().await;
        };

        self.counters.record_wait();
        match pending.wait().await? {
            Grant::Resource(resource) => {
                self.counters.record_acquired();
                Ok(resource)
            }
            Grant::Slot => self.create_in_slot().await,
        }
    }

    /// `acquire` bounded by `timeout`
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<F::Resource, PoolError> {
        match tokio::time::timeout(timeout, self.acquire()).await {
            Ok(result) => result,
            Err(_) => {
                self.counters.record_timeout();
                log_pool!(Level::DEBUG, ?timeout, "acquire timed out");
                Err(PoolError::Timeout(timeout))
            }
        }
    }

    /// Take an idle resource if one is ready. Never suspends or creates.
    pub fn try_acquire(&self) -> Result<Option<F::Resource>, PoolError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PoolError::Closed);
        }
        let resource = state.idle.pop_front();
        if resource.is_some() {
            state.outstanding += 1;
            drop(state);
            self.counters.record_acquired();
        }
        Ok(resource)
    }

    /// Return a checked-out resource
    ///
    /// The longest-waiting caller receives it directly; with nobody waiting
    /// it becomes idle. After `close_all` it is dropped instead.
    ///
    /// Only resources issued by this pool may be released, once each. The
    /// pool does not track resource identity: a release while nothing is
    /// checked out is dropped, but a foreign resource released while others
    /// are out takes one of their slots.
    pub fn release(&self, resource: F::Resource) {
        let mut state = self.state.lock();
        if state.outstanding == 0 {
            drop(state);
            log_pool!(Level::WARN, "release with nothing checked out, resource dropped");
            drop(resource);
            return;
        }
        let dispatched = state.dispatch(Grant::Resource(resource), self.max.get());
        drop(state);

        match dispatched {
            Dispatched::HandedOff => {
                self.counters.record_handoff();
                log_pool!(Level::DEBUG, "released resource handed to waiter");
            }
            Dispatched::Discard(resource) => {
                log_pool!(Level::DEBUG, "released resource discarded");
                drop(resource);
            }
            Dispatched::Idled | Dispatched::Freed => {}
        }
    }

    /// Close a broken resource and give its slot to the next waiter
    ///
    /// Same ownership rule as [`release`](Self::release).
    pub async fn destroy(&self, resource: F::Resource) {
        self.factory.close(resource).await;
        self.counters.record_closed();

        let mut state = self.state.lock();
        if state.outstanding == 0 {
            return;
        }
        let dispatched = state.dispatch(Grant::Slot, self.max.get());
        drop(state);
        if let Dispatched::HandedOff = dispatched {
            log_pool!(Level::DEBUG, "destroyed resource slot handed to waiter");
        }
    }

    /// Shut the pool down
    ///
    /// Closes every idle resource, rejects queued callers with
    /// [`PoolError::Closed`] and refuses later acquisitions. Checked-out
    /// resources stay with their holders; releasing one afterwards drops it.
    /// Returns the number of idle resources closed.
    pub async fn close_all(&self) -> usize {
        let (idle, waiters) = {
            let mut state = self.state.lock();
            state.closed = true;
            (
                std::mem::take(&mut state.idle),
                std::mem::take(&mut state.waiters),
            )
        };

        let rejected = waiters.len();
        // Dropping the senders wakes each waiter with `Closed`
        drop(waiters);

        let closed = idle.len();
        for resource in idle {
            self.factory.close(resource).await;
            self.counters.record_closed();
        }

        log_pool!(Level::INFO, closed, rejected, "pool closed");
        closed
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.state.lock();
        PoolStatus {
            max_resources: self.max.get(),
            idle: state.idle.len(),
            outstanding: state.outstanding,
            waiting: state.waiters.len(),
            closed: state.closed,
        }
    }

    #[inline]
    pub fn max_resources(&self) -> NonZeroUsize {
        self.max
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot()
    }

    /// Build a resource in a slot already counted in `outstanding`
    async fn create_in_slot(&self) -> Result<F::Resource, PoolError> {
        let mut slot = SlotGuard {
            pool: self,
            armed: true,
        };

        match self.factory.create().await {
            Ok(resource) => {
                slot.armed = false;
                self.counters.record_created();
                self.counters.record_acquired();
                Ok(resource)
            }
            Err(e) => {
                self.counters.record_create_failure();
                log_pool!(Level::WARN, error = %e, "resource factory failed");
                // `slot` drops here and gives the slot back
                Err(PoolError::AcquireFailed(e))
            }
        }
    }
}

impl<F: ResourceFactory> fmt::Debug for ResourcePool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("status", &self.status())
            .finish()
    }
}

/// Returns a reserved slot if creation fails or is abandoned
struct SlotGuard<'a, F: ResourceFactory> {
    pool: &'a ResourcePool<F>,
    armed: bool,
}

impl<F: ResourceFactory> Drop for SlotGuard<'_, F> {
    fn drop(&mut self) {
        if self.armed {
            let max = self.pool.max.get();
            self.pool.state.lock().dispatch(Grant::Slot, max);
        }
    }
}

/// A queued caller; withdraws itself from the queue when dropped early
struct PendingAcquire<'a, F: ResourceFactory> {
    pool: &'a ResourcePool<F>,
    id: u64,
    rx: oneshot::Receiver<Grant<F::Resource>>,
    settled: bool,
}

impl<F: ResourceFactory> PendingAcquire<'_, F> {
    async fn wait(mut self) -> Result<Grant<F::Resource>, PoolError> {
        let grant = (&mut self.rx).await;
        self.settled = true;
        grant.map_err(|_| PoolError::Closed)
    }
}

impl<F: ResourceFactory> Drop for PendingAcquire<'_, F> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let max = self.pool.max.get();
        let mut state = self.pool.state.lock();
        if state.remove_waiter(self.id) {
            return;
        }

        // Granted under the lock before we got here: pass it on
        if let Ok(grant) = self.rx.try_recv() {
            let dispatched = state.dispatch(grant, max);
            drop(state);
            if let Dispatched::Discard(resource) = dispatched {
                drop(resource);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;
    use tokio_test::{assert_pending, assert_ready, assert_ready_err, assert_ready_ok, block_on, task};

    #[derive(Default)]
    struct FactoryState {
        next: AtomicUsize,
        failing: AtomicBool,
        blocked: AtomicBool,
        gate: Notify,
        closed: parking_lot::Mutex<Vec<usize>>,
    }

    /// Hands out sequential ids; can be made to fail or to stall
    #[derive(Clone, Default)]
    struct TestFactory {
        inner: Arc<FactoryState>,
    }

    impl TestFactory {
        fn fail(&self, on: bool) {
            self.inner.failing.store(on, Ordering::SeqCst);
        }

        fn block(&self) {
            self.inner.blocked.store(true, Ordering::SeqCst);
        }

        fn unblock(&self) {
            self.inner.blocked.store(false, Ordering::SeqCst);
            self.inner.gate.notify_one();
        }

        fn closed(&self) -> Vec<usize> {
            self.inner.closed.lock().clone()
        }
    }

    impl ResourceFactory for TestFactory {
        type Resource = usize;

        fn create(&self) -> BoxFuture<'_, Result<usize, BoxError>> {
            Box::pin(async move {
                while self.inner.blocked.load(Ordering::SeqCst) {
                    self.inner.gate.notified().await;
                }
                if self.inner.failing.load(Ordering::SeqCst) {
                    return Err("backend unavailable".into());
                }
                Ok(self.inner.next.fetch_add(1, Ordering::SeqCst))
            })
        }

        fn close(&self, resource: usize) -> BoxFuture<'_, ()> {
            self.inner.closed.lock().push(resource);
            Box::pin(async {})
        }
    }

    fn pool(max: usize) -> (ResourcePool<TestFactory>, TestFactory) {
        let factory = TestFactory::default();
        let pool = ResourcePool::new(NonZeroUsize::new(max).unwrap(), factory.clone());
        (pool, factory)
    }

    fn assert_bounded<F: ResourceFactory>(pool: &ResourcePool<F>) {
        let status = pool.status();
        assert!(status.outstanding + status.idle <= status.max_resources);
        if status.waiting > 0 {
            assert_eq!(status.outstanding, status.max_resources);
            assert_eq!(status.idle, 0);
        }
    }

    #[test]
    fn test_reuses_idle_before_creating() {
        let (pool, _factory) = pool(2);

        let a = block_on(pool.acquire()).unwrap();
        pool.release(a);
        let b = block_on(pool.acquire()).unwrap();

        assert_eq!(a, b);
        assert_eq!(pool.stats().created, 1);
        assert_eq!(pool.status().outstanding, 1);
    }

    #[test]
    fn test_waiters_served_in_fifo_order() {
        let (pool, _factory) = pool(1);
        let x = block_on(pool.acquire()).unwrap();

        let mut y = task::spawn(pool.acquire());
        let mut z = task::spawn(pool.acquire());
        assert_pending!(y.poll());
        assert_pending!(z.poll());
        assert_eq!(pool.status().waiting, 2);

        pool.release(x);
        assert!(y.is_woken());
        assert!(!z.is_woken());
        let from_x = assert_ready_ok!(y.poll());
        assert_eq!(from_x, x);
        assert_pending!(z.poll());
        assert_eq!(pool.status().idle, 0);

        pool.release(from_x);
        let from_y = assert_ready_ok!(z.poll());
        assert_eq!(from_y, x);
        assert_eq!(pool.stats().handoffs, 2);
        assert_eq!(pool.stats().waits, 2);
        assert_bounded(&pool);
    }

    #[test]
    fn test_factory_failure_does_not_consume_slot() {
        let (pool, factory) = pool(1);
        factory.fail(true);

        let err = block_on(pool.acquire()).unwrap_err();
        assert!(matches!(err, PoolError::AcquireFailed(_)));
        assert_eq!(pool.status().outstanding, 0);

        factory.fail(false);
        assert_eq!(block_on(pool.acquire()).unwrap(), 0);
        assert_eq!(pool.stats().create_failures, 1);
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_failed_creation_passes_slot_to_waiter() {
        let (pool, factory) = pool(1);
        factory.block();
        factory.fail(true);

        let mut creator = task::spawn(pool.acquire());
        let mut waiter = task::spawn(pool.acquire());
        assert_pending!(creator.poll());
        assert_pending!(waiter.poll());
        assert_eq!(pool.status().waiting, 1);

        factory.unblock();
        assert_ready_err!(creator.poll());
        assert!(waiter.is_woken());
        assert_eq!(pool.status().outstanding, 1);
        assert_eq!(pool.status().waiting, 0);

        factory.fail(false);
        assert_eq!(assert_ready_ok!(waiter.poll()), 0);
        assert_bounded(&pool);
    }

    #[test]
    fn test_cancelled_waiter_leaves_queue() {
        let (pool, _factory) = pool(1);
        let x = block_on(pool.acquire()).unwrap();

        let mut y = task::spawn(pool.acquire());
        assert_pending!(y.poll());
        assert_eq!(pool.status().waiting, 1);
        drop(y);
        assert_eq!(pool.status().waiting, 0);

        pool.release(x);
        let status = pool.status();
        assert_eq!(status.idle, 1);
        assert_eq!(status.outstanding, 0);
    }

    #[test]
    fn test_grant_to_cancelled_waiter_is_recovered() {
        let (pool, _factory) = pool(1);
        let x = block_on(pool.acquire()).unwrap();

        let mut y = task::spawn(pool.acquire());
        let mut z = task::spawn(pool.acquire());
        assert_pending!(y.poll());
        assert_pending!(z.poll());

        // y is granted x but goes away before observing it
        pool.release(x);
        drop(y);

        assert!(z.is_woken());
        assert_eq!(assert_ready_ok!(z.poll()), x);
        let status = pool.status();
        assert_eq!(status.outstanding, 1);
        assert_eq!(status.idle, 0);
    }

    #[test]
    fn test_cancelled_creation_returns_slot() {
        let (pool, factory) = pool(1);
        factory.block();

        let mut creator = task::spawn(pool.acquire());
        assert_pending!(creator.poll());
        assert_eq!(pool.status().outstanding, 1);

        drop(creator);
        assert_eq!(pool.status().outstanding, 0);
    }

    #[tokio::test]
    async fn test_acquire_timeout() {
        let (pool, _factory) = pool(1);
        let _held = pool.acquire().await.unwrap();

        let err = pool
            .acquire_timeout(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::Timeout(_)));
        assert_eq!(pool.status().waiting, 0);
        assert_eq!(pool.stats().timeouts, 1);
    }

    #[test]
    fn test_try_acquire_never_creates() {
        let (pool, _factory) = pool(1);
        assert!(pool.try_acquire().unwrap().is_none());

        let a = block_on(pool.acquire()).unwrap();
        pool.release(a);
        assert_eq!(pool.try_acquire().unwrap(), Some(a));
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_close_all_closes_idle_and_refuses_acquire() {
        let (pool, factory) = pool(2);
        let a = block_on(pool.acquire()).unwrap();
        let b = block_on(pool.acquire()).unwrap();
        pool.release(a);
        pool.release(b);

        assert_eq!(block_on(pool.close_all()), 2);
        assert_eq!(factory.closed(), vec![0, 1]);
        assert_eq!(pool.status().idle, 0);
        assert!(pool.is_closed());
        assert!(matches!(block_on(pool.acquire()), Err(PoolError::Closed)));
        assert!(matches!(pool.try_acquire(), Err(PoolError::Closed)));
    }

    #[test]
    fn test_close_all_rejects_waiters() {
        let (pool, _factory) = pool(1);
        let x = block_on(pool.acquire()).unwrap();

        let mut y = task::spawn(pool.acquire());
        assert_pending!(y.poll());

        assert_eq!(block_on(pool.close_all()), 0);
        assert!(y.is_woken());
        assert!(matches!(assert_ready!(y.poll()), Err(PoolError::Closed)));

        // Outstanding resource is dropped on release, not idled
        pool.release(x);
        let status = pool.status();
        assert_eq!(status.outstanding, 0);
        assert_eq!(status.idle, 0);
    }

    #[test]
    fn test_destroy_gives_slot_to_waiter() {
        let (pool, factory) = pool(1);
        let x = block_on(pool.acquire()).unwrap();

        let mut y = task::spawn(pool.acquire());
        assert_pending!(y.poll());

        block_on(pool.destroy(x));
        assert_eq!(factory.closed(), vec![x]);
        assert_eq!(assert_ready_ok!(y.poll()), 1);
        assert_eq!(pool.status().outstanding, 1);
    }

    #[test]
    fn test_release_with_nothing_checked_out_is_dropped() {
        let (pool, factory) = pool(1);
        pool.release(100);
        block_on(pool.destroy(200));

        let status = pool.status();
        assert_eq!(status.idle, 0);
        assert_eq!(status.outstanding, 0);

        // The stray resources never become available
        let a = block_on(pool.acquire()).unwrap();
        assert_eq!(a, 0);
        assert_eq!(pool.status().outstanding, 1);
        assert_eq!(factory.closed(), vec![200]);

        pool.release(a);
        pool.release(a);
        let status = pool.status();
        assert_eq!(status.idle, 1);
        assert_eq!(status.outstanding, 0);
        assert_bounded(&pool);
    }

    #[test]
    fn test_from_fn() {
        let pool = ResourcePool::from_fn(NonZeroUsize::new(1).unwrap(), || async {
            Err::<String, _>(std::io::Error::new(std::io::ErrorKind::Other, "refused"))
        });

        let err = block_on(pool.acquire()).unwrap_err();
        assert_eq!(err.to_string(), "resource creation failed: refused");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_share_bounded_resources() {
        let factory = TestFactory::default();
        let pool = Arc::new(ResourcePool::new(NonZeroUsize::new(3).unwrap(), factory));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    for _ in 0..50 {
                        let resource = pool.acquire().await.unwrap();
                        assert!(pool.status().outstanding <= 3);
                        tokio::task::yield_now().await;
                        pool.release(resource);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let status = pool.status();
        assert_eq!(status.outstanding, 0);
        assert_eq!(status.waiting, 0);
        assert!(status.idle <= 3);
        assert!(pool.stats().created <= 3);
        assert_eq!(pool.stats().acquired, 16 * 50);
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResourcePool<TestFactory>>();
    }

    #[derive(Debug, Clone)]
    enum Op {
        Acquire,
        Release(usize),
        Cancel(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Acquire),
            2 => (0usize..8).prop_map(Op::Release),
            1 => (0usize..8).prop_map(Op::Cancel),
        ]
    }

    proptest! {
        #[test]
        fn prop_capacity_invariant_under_interleaving(
            ops in proptest::collection::vec(op(), 1..80),
        ) {
            let (pool, _factory) = pool(3);
            let mut pending = Vec::new();
            let mut held: Vec<usize> = Vec::new();

            for op in ops {
                match op {
                    Op::Acquire => pending.push(task::spawn(pool.acquire())),
                    Op::Release(i) if !held.is_empty() => {
                        let resource = held.remove(i % held.len());
                        pool.release(resource);
                    }
                    Op::Cancel(i) if !pending.is_empty() => {
                        let idx = i % pending.len();
                        drop(pending.remove(idx));
                    }
                    _ => {}
                }

                let mut still_pending = Vec::new();
                for mut acquire in pending.drain(..) {
                    match acquire.poll() {
                        std::task::Poll::Ready(result) => {
                            let resource = result.unwrap();
                            prop_assert!(!held.contains(&resource));
                            held.push(resource);
                        }
                        std::task::Poll::Pending => still_pending.push(acquire),
                    }
                }
                pending = still_pending;

                let status = pool.status();
                prop_assert!(status.outstanding + status.idle <= 3);
                prop_assert_eq!(status.outstanding, held.len());
                prop_assert_eq!(status.waiting, pending.len());
            }
        }
    }
}
