use std::time::Instant;

use pool::AddressPool;
use tracing::warn;

/// Claim a single address and print it. The claimed row is consumed,
/// exactly as it would be by a real launch.
pub(crate) async fn claim(address_pool: AddressPool) -> Result<(), anyhow::Error> {
    let suffix = address_pool.settings().suffix.clone();

    let started = Instant::now();
    match address_pool.get_next_address(&suffix).await {
        Some(address) => {
            println!(
                "claimed {} in {:.3}s",
                address.public_key,
                started.elapsed().as_secs_f64()
            );
            println!("ends with:           {}", address.suffix_actual);
            println!("generated at:        {}", address.created_at);
            println!("generation attempts: {}", address.generation_attempts);
            println!(
                "generation time:     {:.2}s",
                address.generation_time_seconds
            );
        }
        None => {
            warn!(
                %suffix,
                "no address available, the caller would fall back to a live search"
            );
        }
    }

    Ok(())
}
