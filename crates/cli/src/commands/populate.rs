use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use pool::{engine, AddressPool};
use tokio::signal;
use tracing::{info, warn};

/// Pre-populate the pool with `count` addresses, stopping gracefully on
/// ctrl-c.
pub(crate) async fn populate(address_pool: AddressPool, count: u64) -> Result<(), anyhow::Error> {
    let settings = address_pool.settings().clone();

    info!(
        count,
        suffix = %settings.suffix,
        expected_attempts_each = engine::estimate_attempts(&settings.suffix, settings.case_insensitive),
        "starting bulk generation"
    );

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("stop requested, finishing the in-flight search");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    let generated = address_pool.generate_batch(count, stop.clone()).await;
    let available = address_pool.count_available(&settings.suffix).await?;

    if generated < count && !stop.load(Ordering::Relaxed) {
        warn!(generated, count, "some searches gave up before a match");
    }

    info!(generated, available, "bulk generation finished");

    Ok(())
}
