//! Background watermark maintenance.
//!
//! One scheduler task runs per pool for the process lifetime, topping
//! the store up whenever the available count falls below the configured
//! target. Searches happen in bounded batches so the loop re-checks the
//! watermark and the stop signal between batches instead of grinding
//! open-endedly.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle, time};
use tracing::{debug, error, info, instrument, warn};

use crate::store::AddressPool;

/// Control handle for a spawned scheduler task.
///
/// Dropping the handle without calling [`SchedulerHandle::shutdown`]
/// also stops the loop at its next suspension point.
pub struct SchedulerHandle {
    stop: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request a stop and wait for the loop to wind down.
    ///
    /// An in-flight search notices the stop flag within one of its
    /// check intervals and an idle sleep is interrupted immediately, so
    /// shutdown completes within seconds.
    pub async fn shutdown(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.shutdown_tx.send(true);

        if let Err(err) = self.task.await {
            error!(%err, "scheduler task aborted");
        }
    }
}

/// Spawn the background producer that keeps `pool` at its configured
/// watermark. Intended to run as the single producer for its store.
pub fn spawn(pool: AddressPool) -> SchedulerHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(run(pool, stop.clone(), shutdown_rx));

    SchedulerHandle {
        stop,
        shutdown_tx,
        task,
    }
}

#[instrument(skip_all)]
async fn run(pool: AddressPool, stop: Arc<AtomicBool>, mut shutdown_rx: watch::Receiver<bool>) {
    let settings = pool.settings().clone();

    info!(
        suffix = %settings.suffix,
        target_size = settings.target_size,
        "pool scheduler started"
    );

    while !stop.load(Ordering::Relaxed) {
        let sleep_for = match pool.count_available(&settings.suffix).await {
            Ok(available) if available < settings.target_size => {
                let deficit = settings.target_size - available;
                let batch = deficit.min(settings.batch_size);

                info!(
                    available,
                    target_size = settings.target_size,
                    batch,
                    "pool below watermark, generating"
                );

                let generated = pool.generate_batch(batch, stop.clone()).await;

                if generated == 0 && !stop.load(Ordering::Relaxed) {
                    warn!("generation batch produced nothing, backing off");
                    Duration::from_secs(settings.error_backoff)
                } else {
                    debug!(generated, "generation batch finished");
                    Duration::ZERO
                }
            }
            Ok(available) => {
                debug!(available, "pool at watermark");
                Duration::from_secs(settings.check_interval)
            }
            Err(err) => {
                error!(%err, "could not read pool availability");
                Duration::from_secs(settings.error_backoff)
            }
        };

        if sleep_for > Duration::ZERO {
            tokio::select! {
                _ = time::sleep(sleep_for) => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    }

    info!("pool scheduler stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::config::{self, Config};
    use db::{ConnectOptions, Database};
    use migration::{Migrator, MigratorTrait};

    use super::*;

    fn settings(suffix: &str, case_insensitive: bool, target_size: u64) -> config::Pool {
        config::Pool {
            suffix: suffix.to_owned(),
            case_insensitive,
            target_size,
            batch_size: target_size,
            check_interval: 1,
            error_backoff: 1,
            search_deadline: 60,
            search_attempt_limit: 5_000_000,
        }
    }

    async fn create_pool(settings: config::Pool) -> AddressPool {
        let mut options = ConnectOptions::new(Config::for_tests().database.url);
        options.max_connections(1);

        let database = Database::connect(options)
            .await
            .expect("unable to create test database");

        Migrator::up(&database, None)
            .await
            .expect("unable to run migrations");

        AddressPool::new(std::sync::Arc::new(database), settings)
            .expect("pool settings are valid")
    }

    #[tokio::test]
    async fn fills_pool_to_watermark() {
        let pool = create_pool(settings("a", true, 3)).await;
        let handle = spawn(pool.clone());

        let mut available = 0;
        for _ in 0..100 {
            available = pool.count_available("a").await.unwrap();
            if available >= 3 {
                break;
            }
            time::sleep(Duration::from_millis(100)).await;
        }

        handle.shutdown().await;

        assert!(available >= 3, "scheduler never reached the watermark");
    }

    #[tokio::test]
    async fn shutdown_interrupts_hopeless_generation() {
        // Four fixed-case characters cannot be found inside the test
        // timeout, so shutdown must cut a search short.
        let mut hopeless = settings("QQQQ", false, 1);
        hopeless.search_deadline = 120;
        hopeless.search_attempt_limit = u64::MAX;

        let pool = create_pool(hopeless).await;
        let handle = spawn(pool);

        time::sleep(Duration::from_millis(300)).await;

        time::timeout(Duration::from_secs(10), handle.shutdown())
            .await
            .expect("shutdown must complete within seconds");
    }

    #[tokio::test]
    async fn survives_exhausted_batches() {
        // A one-attempt budget exhausts every search instantly; the
        // loop must keep running and still shut down cleanly.
        let mut unreachable = settings("QQQQ", false, 1);
        unreachable.search_attempt_limit = 1;

        let pool = create_pool(unreachable).await;
        let handle = spawn(pool.clone());

        time::sleep(Duration::from_millis(500)).await;

        assert_eq!(pool.count_available("QQQQ").await.unwrap(), 0);

        time::timeout(Duration::from_secs(10), handle.shutdown())
            .await
            .expect("shutdown must complete within seconds");
    }
}
