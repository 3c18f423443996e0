//! Durable store of generated vanity addresses.
//!
//! The store owns the single shared mutable resource of the crate, the
//! `vanity_addresses` table. A background producer inserts search
//! results; foreground consumers claim rows with at-most-once
//! delivery. The claim path is the correctness core: a row must never
//! be handed to two callers, and a row that leaves the available state
//! never returns to it.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use common::config;
use db::{
    sea_query::OnConflict, vanity_address, ActiveValue, ColumnTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, OffsetDateTime, PaginatorTrait, PrimitiveDateTime,
    QueryFilter, QueryOrder, QuerySelect, TransactionErrorExt, TransactionTrait,
};
use derive_more::{Display, Error, From};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    engine::{self, FoundKeypair, InvalidSuffix, SearchParams, SearchProgress},
    keypair::{InvalidKeypairBytes, VanityKeypair},
    stats::{GenerationPerformance, PoolHealth, PoolStats},
};

/// Retries of a failing storage operation before the error surfaces.
const STORAGE_RETRIES: u32 = 2;

/// Delay between storage retries.
const RETRY_DELAY: Duration = Duration::from_millis(250);

/// `insert` errors.
#[derive(Debug, Display, Error, From)]
pub enum InsertError {
    /// Database-related error.
    DatabaseError(DbErr),

    /// Another row already carries this public key.
    #[display(fmt = "public key {} already stored", _0)]
    DuplicateKey(#[error(not(source))] String),
}

/// `claim_next` errors.
#[derive(Debug, Display, Error, From)]
pub enum ClaimError {
    /// Database-related error.
    DatabaseError(DbErr),

    /// No available row matches the requested suffix.
    #[display(fmt = "no claimable address in the pool")]
    PoolUnavailable,
}

/// A row handed out by [`AddressPool::claim_next`], with its keypair
/// reconstructed from stored key material.
#[derive(Debug)]
pub struct ClaimedAddress {
    /// Store row identifier.
    pub id: i64,

    /// Base58 public key.
    pub public_key: String,

    /// Reconstructed keypair.
    pub keypair: VanityKeypair,

    /// Literal trailing characters of the public key.
    pub suffix_actual: String,

    /// When the row was generated.
    pub created_at: PrimitiveDateTime,

    /// Search attempts that produced this address.
    pub generation_attempts: i64,

    /// Search seconds that produced this address.
    pub generation_time_seconds: f64,
}

/// Handle to the durable address pool.
///
/// Owned and injectable: every instance wraps the connection it is
/// given, so tests run against isolated databases and the process can
/// host several pools if it ever needs to.
#[derive(Clone)]
pub struct AddressPool {
    db: Arc<DatabaseConnection>,
    settings: config::Pool,
}

impl AddressPool {
    /// Create a pool over an established database connection.
    ///
    /// The configured suffix is validated once here so that neither the
    /// scheduler nor bulk generation ever starts an unreachable search.
    pub fn new(
        db: Arc<DatabaseConnection>,
        settings: config::Pool,
    ) -> Result<Self, InvalidSuffix> {
        engine::validate_suffix(&settings.suffix, settings.case_insensitive)?;

        Ok(Self { db, settings })
    }

    /// Pool settings this instance was constructed with.
    pub fn settings(&self) -> &config::Pool {
        &self.settings
    }

    /// Search parameters matching the pool settings.
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            suffix: self.settings.suffix.clone(),
            case_insensitive: self.settings.case_insensitive,
            deadline: Duration::from_secs(self.settings.search_deadline),
            attempt_limit: self.settings.search_attempt_limit,
        }
    }

    /// Persist a freshly found keypair as an available row.
    ///
    /// A duplicate public key is reported as [`InsertError::DuplicateKey`]
    /// without touching existing rows; the caller drops the candidate.
    #[instrument(skip_all, fields(public_key = %found.public_key))]
    pub async fn insert(&self, found: &FoundKeypair) -> Result<(), InsertError> {
        let now = now_timestamp();

        let model = vanity_address::ActiveModel {
            public_key: ActiveValue::Set(found.public_key.clone()),
            private_key: ActiveValue::Set(found.keypair.to_bytes().to_vec()),
            suffix_requested: ActiveValue::Set(self.settings.suffix.clone()),
            suffix_actual: ActiveValue::Set(found.suffix_actual.clone()),
            available: ActiveValue::Set(true),
            created_at: ActiveValue::Set(now),
            claimed_at: ActiveValue::Set(None),
            generation_attempts: ActiveValue::Set(found.attempts as i64),
            generation_time_seconds: ActiveValue::Set(found.elapsed.as_secs_f64()),
            ..Default::default()
        };

        let mut attempt = 0;
        let inserted = loop {
            let outcome = vanity_address::Entity::insert(model.clone())
                .on_conflict(
                    OnConflict::column(vanity_address::Column::PublicKey)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&*self.db)
                .await;

            match outcome {
                Ok(rows) => break rows,
                Err(err) if attempt < STORAGE_RETRIES => {
                    attempt += 1;
                    warn!(%err, attempt, "address insert failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(err) => return Err(err.into()),
            }
        };

        if inserted == 0 {
            return Err(InsertError::DuplicateKey(found.public_key.clone()));
        }

        debug!(attempts = found.attempts, "stored vanity address");

        Ok(())
    }

    /// Claim the oldest available address for `suffix`.
    ///
    /// The selected row is re-validated and flipped to unavailable with
    /// a compare-and-set update, so under concurrent claimants each row
    /// is returned to exactly one caller; losers move on to the next
    /// candidate. Rows failing validation are retired in place and the
    /// claim continues. The filter matches `suffix_requested` exactly
    /// as stored.
    #[instrument(skip(self))]
    pub async fn claim_next(&self, suffix: &str) -> Result<ClaimedAddress, ClaimError> {
        let mut attempt = 0;

        loop {
            match self.try_claim(suffix).await {
                Ok(Some(claimed)) => return Ok(claimed),
                Ok(None) => return Err(ClaimError::PoolUnavailable),
                Err(err) if attempt < STORAGE_RETRIES => {
                    attempt += 1;
                    warn!(%err, attempt, "claim failed on storage error, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Bot-facing claim that degrades storage failures to `None`, so
    /// callers fall through to live generation instead of erroring out.
    pub async fn get_next_address(&self, suffix: &str) -> Option<ClaimedAddress> {
        match self.claim_next(suffix).await {
            Ok(claimed) => Some(claimed),
            Err(ClaimError::PoolUnavailable) => None,
            Err(ClaimError::DatabaseError(err)) => {
                error!(%err, "address pool unreachable, reporting empty");
                None
            }
        }
    }

    /// Rows currently claimable for `suffix`. Advisory: the count can
    /// be stale by the time the caller acts on it.
    pub async fn count_available(&self, suffix: &str) -> Result<u64, DbErr> {
        let count = vanity_address::Entity::find()
            .filter(vanity_address::Column::Available.eq(true))
            .filter(vanity_address::Column::SuffixRequested.eq(suffix))
            .count(&*self.db)
            .await?;

        Ok(count as u64)
    }

    /// All rows ever stored for `suffix`, claimed included.
    pub async fn count_total(&self, suffix: &str) -> Result<u64, DbErr> {
        let count = vanity_address::Entity::find()
            .filter(vanity_address::Column::SuffixRequested.eq(suffix))
            .count(&*self.db)
            .await?;

        Ok(count as u64)
    }

    /// Aggregate view of the pool for the configured suffix.
    pub async fn stats(&self) -> Result<PoolStats, DbErr> {
        let rows = vanity_address::Entity::find()
            .filter(vanity_address::Column::SuffixRequested.eq(&*self.settings.suffix))
            .select_only()
            .column(vanity_address::Column::Available)
            .column(vanity_address::Column::GenerationAttempts)
            .column(vanity_address::Column::GenerationTimeSeconds)
            .into_model::<vanity_address::GenerationMetrics>()
            .all(&*self.db)
            .await?;

        let total = rows.len() as u64;
        let available = rows.iter().filter(|row| row.available).count() as u64;

        let performance = (total > 0).then(|| {
            let attempts_sum: i64 = rows.iter().map(|row| row.generation_attempts).sum();
            let time_sum: f64 = rows.iter().map(|row| row.generation_time_seconds).sum();

            GenerationPerformance {
                avg_attempts: attempts_sum as f64 / total as f64,
                avg_time_seconds: time_sum / total as f64,
                min_attempts: rows.iter().map(|row| row.generation_attempts).min().unwrap_or(0),
                max_attempts: rows.iter().map(|row| row.generation_attempts).max().unwrap_or(0),
            }
        });

        Ok(PoolStats {
            total,
            available,
            used: total - available,
            target_size: self.settings.target_size,
            health: PoolHealth::classify(available, self.settings.target_size),
            performance,
        })
    }

    /// Generate and store up to `count` addresses, reporting how many
    /// made it into the pool.
    ///
    /// Each search runs on a blocking thread with the pool's configured
    /// deadline. Exhausted searches and storage failures are logged and
    /// skipped; raising `stop` ends the batch after the in-flight
    /// search notices it.
    #[instrument(skip(self, stop))]
    pub async fn generate_batch(&self, count: u64, stop: Arc<AtomicBool>) -> u64 {
        let params = self.search_params();
        let mut generated = 0;

        for index in 0..count {
            if stop.load(Ordering::Relaxed) {
                break;
            }

            let search_params = params.clone();
            let search_stop = stop.clone();

            let outcome = tokio::task::spawn_blocking(move || {
                let mut report = |progress: SearchProgress| -> anyhow::Result<()> {
                    debug!(
                        attempts = progress.attempts,
                        attempts_per_second = progress.attempts_per_second,
                        "batch search progress"
                    );
                    Ok(())
                };

                engine::search(&search_params, &search_stop, Some(&mut report))
            })
            .await;

            let found = match outcome {
                Ok(Ok(found)) => found,
                Ok(Err(exhausted)) => {
                    warn!(%exhausted, index, "search gave up without a match");
                    continue;
                }
                Err(join_error) => {
                    error!(%join_error, "search task failed");
                    break;
                }
            };

            info!(
                public_key = %found.public_key,
                attempts = found.attempts,
                seconds = found.elapsed.as_secs_f64(),
                "generated vanity address"
            );

            match self.insert(&found).await {
                Ok(()) => generated += 1,
                Err(InsertError::DuplicateKey(public_key)) => {
                    // Astronomically unlikely; the candidate is simply dropped.
                    warn!(%public_key, "duplicate public key generated, dropping candidate");
                }
                Err(InsertError::DatabaseError(err)) => {
                    error!(%err, "failed to store generated address");
                }
            }
        }

        generated
    }

    /// One claim pass: select the oldest candidate, validate it, and
    /// compare-and-set it unavailable. `None` means the pool is empty
    /// for this suffix.
    async fn try_claim(&self, suffix: &str) -> Result<Option<ClaimedAddress>, DbErr> {
        let settings = self.settings.clone();
        let suffix = suffix.to_owned();

        self.db
            .transaction::<_, Option<ClaimedAddress>, DbErr>(|txn| {
                Box::pin(async move {
                    loop {
                        let Some(row) = vanity_address::Entity::find()
                            .filter(vanity_address::Column::Available.eq(true))
                            .filter(vanity_address::Column::SuffixRequested.eq(&suffix))
                            .order_by_asc(vanity_address::Column::CreatedAt)
                            .order_by_asc(vanity_address::Column::Id)
                            .one(txn)
                            .await?
                        else {
                            return Ok(None);
                        };

                        let keypair = match validate_row(&row, &settings) {
                            Ok(keypair) => keypair,
                            Err(defect) => {
                                error!(
                                    public_key = %row.public_key,
                                    %defect,
                                    "stored row failed claim-time validation, retiring it"
                                );

                                // Retired rows keep claimed_at empty, so they stay
                                // distinguishable from genuinely claimed ones.
                                mark_unavailable(txn, row.id, None).await?;
                                continue;
                            }
                        };

                        if mark_unavailable(txn, row.id, Some(now_timestamp())).await? {
                            info!(public_key = %row.public_key, "claimed vanity address");

                            return Ok(Some(ClaimedAddress {
                                id: row.id,
                                public_key: row.public_key,
                                keypair,
                                suffix_actual: row.suffix_actual,
                                created_at: row.created_at,
                                generation_attempts: row.generation_attempts,
                                generation_time_seconds: row.generation_time_seconds,
                            }));
                        }

                        // Lost the compare-and-set race; another claimant took
                        // this row. Try the next candidate.
                    }
                })
            })
            .await
            .into_raw_result()
    }
}

/// Why a stored row was rejected at claim time.
#[derive(Debug, Display)]
enum RowDefect {
    #[display(fmt = "public key does not end with recorded suffix '{}'", _0)]
    SuffixMismatch(String),

    #[display(fmt = "suffix rule violated for requested '{}'", _0)]
    RuleMismatch(String),

    #[display(fmt = "stored key material is unusable: {}", _0)]
    BadKeyMaterial(InvalidKeypairBytes),

    #[display(fmt = "key material does not reproduce the stored public key")]
    KeyMismatch,
}

/// Defensive re-validation of a row before it is handed out. Guards
/// against rows written under older validation rules or corrupted key
/// material.
fn validate_row(
    row: &vanity_address::Model,
    settings: &config::Pool,
) -> Result<VanityKeypair, RowDefect> {
    if !row.public_key.ends_with(&row.suffix_actual) {
        return Err(RowDefect::SuffixMismatch(row.suffix_actual.clone()));
    }

    let rule_holds = if settings.case_insensitive {
        row.suffix_actual.eq_ignore_ascii_case(&row.suffix_requested)
    } else {
        row.suffix_actual == row.suffix_requested
    };
    if !rule_holds {
        return Err(RowDefect::RuleMismatch(row.suffix_requested.clone()));
    }

    let keypair =
        VanityKeypair::from_bytes(&row.private_key).map_err(RowDefect::BadKeyMaterial)?;

    if keypair.public_key_base58() != row.public_key {
        return Err(RowDefect::KeyMismatch);
    }

    Ok(keypair)
}

/// Compare-and-set a row out of the available state. Returns whether
/// this caller won the transition.
async fn mark_unavailable(
    txn: &DatabaseTransaction,
    id: i64,
    claimed_at: Option<PrimitiveDateTime>,
) -> Result<bool, DbErr> {
    let update = vanity_address::Entity::update_many()
        .col_expr(vanity_address::Column::Available, false.into())
        .col_expr(vanity_address::Column::ClaimedAt, claimed_at.into())
        .filter(vanity_address::Column::Id.eq(id))
        .filter(vanity_address::Column::Available.eq(true))
        .exec(txn)
        .await?;

    Ok(update.rows_affected == 1)
}

fn now_timestamp() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();

    PrimitiveDateTime::new(now.date(), now.time())
}
