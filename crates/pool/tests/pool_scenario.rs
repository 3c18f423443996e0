//! End-to-end pool behavior: a scheduler round filling an empty pool,
//! followed by concurrent claims draining it.

use std::{sync::Arc, time::Duration};

use common::config;
use db::{ConnectOptions, Database};
use futures_util::future::join_all;
use migration::{Migrator, MigratorTrait};
use pool::{scheduler, AddressPool, ClaimError};

fn settings() -> config::Pool {
    config::Pool {
        suffix: "ab".to_owned(),
        case_insensitive: true,
        target_size: 5,
        batch_size: 5,
        check_interval: 1,
        error_backoff: 1,
        search_deadline: 60,
        search_attempt_limit: 5_000_000,
    }
}

async fn create_pool() -> AddressPool {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    // A single connection keeps every task on the same in-memory
    // database.
    options.max_connections(1);

    let database = Database::connect(options)
        .await
        .expect("unable to create test database");

    Migrator::up(&database, None)
        .await
        .expect("unable to run migrations");

    AddressPool::new(Arc::new(database), settings()).expect("pool settings are valid")
}

#[tokio::test(flavor = "multi_thread")]
async fn scheduler_fills_pool_and_claims_are_exclusive() {
    let pool = create_pool().await;
    let handle = scheduler::spawn(pool.clone());

    let mut available = 0;
    for _ in 0..600 {
        available = pool.count_available("ab").await.expect("count");
        if available >= 5 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    handle.shutdown().await;
    assert!(available >= 5, "scheduler never reached the watermark");

    let outcomes = join_all((0..6).map(|_| pool.claim_next("ab"))).await;

    let mut claimed: Vec<String> = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().ok())
        .map(|address| address.public_key.clone())
        .collect();
    let unavailable = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(ClaimError::PoolUnavailable)))
        .count();

    assert_eq!(claimed.len(), 5);
    assert_eq!(unavailable, 1);

    claimed.sort();
    claimed.dedup();
    assert_eq!(claimed.len(), 5, "a row was delivered twice");

    for public_key in &claimed {
        let tail = &public_key[public_key.len() - 2..];
        assert!(tail.eq_ignore_ascii_case("ab"), "bad suffix on {public_key}");
    }
}
