//! Process Supervisor: wires every component together in the strict
//! bring-up order the architecture requires, and tears them down in
//! reverse with a per-component deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::auth::Signer;
use crate::config::Config;
use crate::connmgr::{ConnectionManager, DataFrame};
use crate::error::Result;
use crate::health::{self, AppState};
use crate::poller::SnapshotPoller;
use crate::registry::{self, Registry};
use crate::rest::RestClient;
use crate::router::Router;
use crate::storage::{self, Store};
use crate::writers::Writers;

/// A component is given this long to stop before the Supervisor abandons it
/// and moves on to the next one in the shutdown sequence.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);

/// Capacity of the channel carrying raw `market_lifecycle` frames from the
/// Connection Manager's lifecycle connections to the Registry.
const LIFECYCLE_CHANNEL_CAPACITY: usize = 1000;

pub struct Supervisor {
    registry: Arc<Registry>,
    router: Arc<Router>,
    writers: Arc<Writers>,
    connmgr: Arc<ConnectionManager>,
    poller: Arc<SnapshotPoller>,
    health_bind: String,
    health_state: AppState,
    data_rx: mpsc::UnboundedReceiver<DataFrame>,
    lifecycle_rx: mpsc::Receiver<String>,
}

impl Supervisor {
    /// Builds every component without starting any of them. `config.auth`
    /// and `config.database` must already validate (see `Config::load`).
    pub async fn build(config: Config) -> Result<Self> {
        // (1) store connection pool.
        let pool = storage::create_pool(&config.database.url, config.database.max_pool_size)?;
        storage::run_migrations(&pool)?;
        let store = Store::new(pool);

        // (3) REST client, shared by the Registry and the Snapshot Poller.
        let rest = Arc::new(RestClient::new(
            config.network.rest_base_url.clone(),
            Duration::from_secs(config.poller.request_timeout_secs),
        ));

        let registry = Arc::new(Registry::new(rest.clone(), config.registry.clone()));

        // (4) Message Router — constructed now so its queues exist before
        // the Connection Manager or Writers can touch them.
        let router = Arc::new(Router::new(&config.router));

        // (5) Writers, built against the Router's queues.
        let writers = Arc::new(Writers::new(&router, store, config.writers.clone()));

        // (6) Connection Manager, constructed (not started) so `data_tx`/
        // `lifecycle_tx` exist for the Router and Registry to consume from.
        let signer = Arc::new(Signer::load(config.auth.key_id.clone(), &config.auth.private_key_path)?);
        let (data_tx, data_rx) = mpsc::unbounded_channel();
        let (lifecycle_tx, lifecycle_rx) = mpsc::channel(LIFECYCLE_CHANNEL_CAPACITY);
        let connmgr = Arc::new(ConnectionManager::new(
            signer,
            config.network.ws_url.clone(),
            config.connection_manager.clone(),
            data_tx,
            lifecycle_tx,
        ));

        let poller = Arc::new(SnapshotPoller::new(
            rest,
            registry.clone(),
            writers.orderbook.clone(),
            config.poller.clone(),
        ));

        let health_state = AppState {
            registry: registry.clone(),
            connmgr: connmgr.clone(),
        };

        Ok(Self {
            registry,
            router,
            writers,
            connmgr,
            poller,
            health_bind: config.health.bind.clone(),
            health_state,
            data_rx,
            lifecycle_rx,
        })
    }

    /// Brings every component up in order, runs until `shutdown` resolves,
    /// then tears everything down in reverse.
    pub async fn run(self, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
        let Self {
            registry,
            router,
            writers,
            connmgr,
            poller,
            health_bind,
            health_state,
            data_rx,
            lifecycle_rx,
        } = self;

        // (2) Market Registry: blocks for initial sync before anything else
        // depends on `get_active_markets` returning real data.
        info!("starting market registry (blocking for initial sync)");
        registry.start().await?;
        info!(markets = registry.market_count(), "initial sync complete");
        tokio::spawn(registry::run_background(registry.clone(), lifecycle_rx));

        // (4)/(5): start routing and draining now that the queues they
        // share are wired up.
        router.start(data_rx);
        writers.start();

        // (6) Connection Manager: connections, global subscriptions, and
        // the MarketChange consumer loop.
        info!("starting connection manager");
        connmgr.start(registry.subscribe_changes()).await?;

        // (7) Snapshot Poller.
        poller.start();

        // (8) Health/debug HTTP server, last up, first abandoned.
        tokio::spawn(async move {
            if let Err(e) = health::serve(&health_bind, health_state).await {
                warn!(error = %e, "health server exited");
            }
        });

        info!("all components started");
        shutdown.await;
        info!("shutdown signal received, stopping components");

        poller.stop();
        connmgr.stop();
        with_deadline("writers", writers.stop()).await;
        router.stop();
        registry.stop();

        Ok(())
    }
}

async fn with_deadline(name: &str, fut: impl std::future::Future<Output = ()>) {
    if tokio::time::timeout(SHUTDOWN_DEADLINE, fut).await.is_err() {
        warn!(component = name, "did not stop within deadline, abandoning");
    }
}
