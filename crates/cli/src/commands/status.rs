use pool::AddressPool;

/// Print pool statistics for the configured suffix.
pub(crate) async fn status(address_pool: AddressPool) -> Result<(), anyhow::Error> {
    let stats = address_pool.stats().await?;

    println!("suffix:      {}", address_pool.settings().suffix);
    println!("available:   {}", stats.available);
    println!("used:        {}", stats.used);
    println!("total:       {}", stats.total);
    println!("target size: {}", stats.target_size);
    println!("health:      {}", stats.health);

    if let Some(performance) = stats.performance {
        println!("avg attempts:     {:.0}", performance.avg_attempts);
        println!("avg search time:  {:.2}s", performance.avg_time_seconds);
        println!(
            "min/max attempts: {}/{}",
            performance.min_attempts, performance.max_attempts
        );
    }

    Ok(())
}
