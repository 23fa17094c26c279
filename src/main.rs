//! Resource-management demo
//!
//! Runs a simulated request workload through the three components the way a
//! request handler would use them:
//! - **rate limiter**: admit or reject per caller address
//! - **cache**: memoize responses by path
//! - **pool**: borrow a backend connection on cache miss
//!
//! Prints a JSON metrics report when done.

use anyhow::Context;
use futures_util::future::BoxFuture;
use resource_core::core::{
    BoundedCache, BoxError, ResourceFactory, ResourcePool, WindowRateLimiter,
};
use resource_core::infrastructure::{logging::init_logging, metrics::MetricsReport};
use resource_core::Config;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Simulated clients
const CLIENTS: usize = 16;
/// Requests issued by each client
const REQUESTS_PER_CLIENT: usize = 40;
/// Distinct paths requested
const PATHS: usize = 64;

/// Stand-in for a backing-store connection
#[derive(Debug)]
struct BackendConnection {
    id: usize,
    queries: u64,
}

impl BackendConnection {
    async fn query(&mut self, path: &str) -> String {
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.queries += 1;
        format!("{} served by connection {}", path, self.id)
    }
}

/// Opens simulated connections; every 7th attempt is refused
#[derive(Default)]
struct BackendFactory {
    attempts: AtomicUsize,
}

impl ResourceFactory for BackendFactory {
    type Resource = BackendConnection;

    fn create(&self) -> BoxFuture<'_, Result<BackendConnection, BoxError>> {
        Box::pin(async move {
            let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(Duration::from_millis(5)).await;
            if attempt % 7 == 6 {
                return Err(format!("connection attempt {} refused", attempt).into());
            }
            Ok(BackendConnection {
                id: attempt,
                queries: 0,
            })
        })
    }

    fn close(&self, resource: BackendConnection) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            tracing::debug!(
                "Closing connection {} after {} queries",
                resource.id,
                resource.queries
            );
        })
    }
}

/// Shared components, explicitly constructed and passed to each client
struct App {
    cache: BoundedCache<String, Arc<str>>,
    pool: ResourcePool<BackendFactory>,
    limiter: WindowRateLimiter,
    acquire_timeout: Option<Duration>,
}

impl App {
    fn new(config: &Config) -> resource_core::Result<Self> {
        Ok(Self {
            cache: BoundedCache::new(config.cache_capacity()?),
            pool: ResourcePool::new(config.max_resources()?, BackendFactory::default()),
            limiter: WindowRateLimiter::new(config.rate_window(), config.rate_limit.max_requests),
            acquire_timeout: config.acquire_timeout(),
        })
    }

    /// Handle one request; `None` means the caller was rate limited
    async fn handle(&self, caller: &str, path: &str) -> Option<resource_core::Result<Arc<str>>> {
        if !self.limiter.allow(caller) {
            return None;
        }

        if let Some(body) = self.cache.get(path) {
            return Some(Ok(body));
        }

        let acquired = match self.acquire_timeout {
            Some(timeout) => self.pool.acquire_timeout(timeout).await,
            None => self.pool.acquire().await,
        };
        let mut conn = match acquired {
            Ok(conn) => conn,
            Err(e) => return Some(Err(e.into())),
        };

        let body: Arc<str> = conn.query(path).await.into();
        self.pool.release(conn);
        self.cache.set(path.to_string(), Arc::clone(&body));
        Some(Ok(body))
    }
}

async fn run_client(app: Arc<App>, client: usize) -> (usize, usize, usize) {
    let caller = format!("10.0.0.{}", client % 4);
    let (mut served, mut limited, mut failed) = (0, 0, 0);

    for i in 0..REQUESTS_PER_CLIENT {
        let path = format!("/items/{}", (client * 31 + i * 7) % PATHS);
        match app.handle(&caller, &path).await {
            Some(Ok(_)) => served += 1,
            Some(Err(e)) => {
                tracing::warn!("Request {} from {} failed: {}", path, caller, e);
                failed += 1;
            }
            None => limited += 1,
        }
    }

    (served, limited, failed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    let _guards = init_logging(&config.logging).context("initializing logging")?;

    tracing::info!("Starting workload: {} clients x {} requests", CLIENTS, REQUESTS_PER_CLIENT);
    let started = Instant::now();
    let app = Arc::new(App::new(&config)?);

    let handles: Vec<_> = (0..CLIENTS)
        .map(|client| tokio::spawn(run_client(Arc::clone(&app), client)))
        .collect();

    let (mut served, mut limited, mut failed) = (0, 0, 0);
    for handle in handles {
        let (s, l, f) = handle.await.context("client task panicked")?;
        served += s;
        limited += l;
        failed += f;
    }
    tracing::info!(served, limited, failed, "Workload finished");

    let closed = app.pool.close_all().await;
    tracing::info!("Closed {} idle connections", closed);

    let report = MetricsReport::new(
        started,
        app.cache.stats(),
        app.pool.stats(),
        app.limiter.stats(),
    );
    println!("{}", report.to_json()?);

    Ok(())
}
