use pool::{scheduler, AddressPool};
use tokio::signal;
use tracing::info;

/// Run the background scheduler until ctrl-c.
pub(crate) async fn serve(address_pool: AddressPool) -> Result<(), anyhow::Error> {
    let suffix = address_pool.settings().suffix.clone();
    let available = address_pool.count_available(&suffix).await?;

    info!(
        available,
        target_size = address_pool.settings().target_size,
        "starting pool maintenance"
    );

    let handle = scheduler::spawn(address_pool);

    info!("scheduler running, press ctrl-c to stop");
    signal::ctrl_c().await?;

    info!("shutting down");
    handle.shutdown().await;

    Ok(())
}
