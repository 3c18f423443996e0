//! Brute-force search for keypairs whose base58 public key ends with a
//! chosen suffix.
//!
//! The search is a pure CPU loop: generate a random keypair, encode the
//! public key, test the suffix, repeat. Expected cost grows as
//! `58^len(suffix)`, so anything beyond a few characters needs the
//! background pool rather than an interactive search.
//!
//! Two entry points share the same loop: [`search`] blocks the calling
//! thread and is meant to run under `spawn_blocking`, while
//! [`search_yielding`] hands control back to the async runtime between
//! check intervals so a foreground fallback search cannot starve other
//! tasks.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use derive_more::{Display, Error};
use tracing::{debug, info, warn};

use crate::keypair::VanityKeypair;

/// Alphabet produced by base58 encoding.
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Longest suffix accepted by [`validate_suffix`]. Expected attempts for
/// six case-sensitive characters already exceed 3.8e10.
pub const MAX_SUFFIX_LENGTH: usize = 6;

/// Attempts between stop-flag, deadline and progress checks.
const CHECK_INTERVAL_ATTEMPTS: u64 = 25_000;

/// Attempt count multiple that triggers a progress report.
const PROGRESS_INTERVAL_ATTEMPTS: u64 = 100_000;

/// Wall-clock gap that triggers a progress report even when the attempt
/// interval has not been reached.
const PROGRESS_INTERVAL_WALL: Duration = Duration::from_secs(30);

/// Parameters of a single suffix search.
#[derive(Clone, Debug)]
pub struct SearchParams {
    /// Suffix the encoded public key must end with.
    pub suffix: String,

    /// Accept any ASCII case permutation of the suffix.
    pub case_insensitive: bool,

    /// Wall-clock budget before the search gives up.
    pub deadline: Duration,

    /// Attempt ceiling before the search gives up.
    pub attempt_limit: u64,
}

/// A keypair that matched the requested suffix.
#[derive(Debug)]
pub struct FoundKeypair {
    /// The matching keypair.
    pub keypair: VanityKeypair,

    /// Base58 public key of the keypair.
    pub public_key: String,

    /// Literal trailing characters of the public key, which may differ
    /// in case from the requested suffix.
    pub suffix_actual: String,

    /// Attempts spent up to and including the match.
    pub attempts: u64,

    /// Wall-clock time spent searching.
    pub elapsed: Duration,
}

/// The search gave up without a match: deadline elapsed, attempt limit
/// reached or an external stop request.
#[derive(Debug, Display, Error)]
#[display(fmt = "search exhausted after {} attempts", attempts)]
pub struct Exhausted {
    /// Attempts made before giving up.
    pub attempts: u64,
}

/// A suffix no search should be started for.
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum InvalidSuffix {
    #[display(fmt = "suffix must not be empty")]
    Empty,

    #[display(fmt = "suffix of {} characters is beyond practical search range", _0)]
    TooLong(#[error(not(source))] usize),

    #[display(fmt = "'{}' never appears in base58 output", _0)]
    NotBase58(#[error(not(source))] char),
}

/// Progress snapshot passed to a [`ProgressSink`].
#[derive(Clone, Copy, Debug)]
pub struct SearchProgress {
    /// Attempts made so far.
    pub attempts: u64,

    /// Wall-clock time spent so far.
    pub elapsed: Duration,

    /// Measured search throughput.
    pub attempts_per_second: f64,
}

/// Periodic progress callback. Errors returned by the sink are logged
/// and swallowed; they never fail the search itself.
pub type ProgressSink<'a> = &'a mut (dyn FnMut(SearchProgress) -> anyhow::Result<()> + Send);

/// Check that a suffix is worth searching for.
///
/// Rejects empty and impractically long suffixes, and characters that
/// can never appear in base58 output (under case-insensitive matching a
/// character only needs one of its case variants in the alphabet).
pub fn validate_suffix(suffix: &str, case_insensitive: bool) -> Result<(), InvalidSuffix> {
    if suffix.is_empty() {
        return Err(InvalidSuffix::Empty);
    }

    if suffix.len() > MAX_SUFFIX_LENGTH {
        return Err(InvalidSuffix::TooLong(suffix.len()));
    }

    for c in suffix.chars() {
        let reachable = if case_insensitive {
            BASE58_ALPHABET.contains(c.to_ascii_lowercase())
                || BASE58_ALPHABET.contains(c.to_ascii_uppercase())
        } else {
            BASE58_ALPHABET.contains(c)
        };

        if !reachable {
            return Err(InvalidSuffix::NotBase58(c));
        }
    }

    Ok(())
}

/// Expected attempts for one match: `58^len`, reduced by the accepted
/// case permutations when matching is case-insensitive. An estimate,
/// used for operator-facing ETAs only.
pub fn estimate_attempts(suffix: &str, case_insensitive: bool) -> u64 {
    let space = 58f64.powi(suffix.len() as i32);

    if case_insensitive {
        let letters = suffix.chars().filter(char::is_ascii_alphabetic).count();
        (space / 2f64.powi(letters as i32)) as u64
    } else {
        space as u64
    }
}

/// Search for a keypair whose base58 public key ends with the target
/// suffix.
///
/// Blocks until a match is found or the search is exhausted: deadline
/// elapsed, attempt limit reached or `stop` raised. All three report
/// [`Exhausted`] with the attempts made so far. The stop flag, the
/// deadline and the progress sink are consulted between fixed-size
/// attempt chunks, so cancellation takes effect within one check
/// interval rather than instantly.
///
/// Suffix sanity is the caller's job; see [`validate_suffix`].
pub fn search(
    params: &SearchParams,
    stop: &AtomicBool,
    mut progress: Option<ProgressSink<'_>>,
) -> Result<FoundKeypair, Exhausted> {
    let started = Instant::now();
    let mut last_report = started;
    let mut attempts = 0;

    loop {
        if let Some(found) = run_chunk(params, &mut attempts) {
            return Ok(finish(found, params, attempts, started));
        }

        if let Some(exhausted) =
            checkpoint(params, stop, &mut progress, attempts, started, &mut last_report)
        {
            return Err(exhausted);
        }
    }
}

/// Asynchronous variant of [`search`] for foreground use, e.g. serving
/// a launch request when the pool has run dry.
///
/// Identical semantics, but the task yields back to the runtime after
/// every check interval so a multi-minute search shares the executor.
pub async fn search_yielding(
    params: &SearchParams,
    stop: &AtomicBool,
    mut progress: Option<ProgressSink<'_>>,
) -> Result<FoundKeypair, Exhausted> {
    let started = Instant::now();
    let mut last_report = started;
    let mut attempts = 0;

    loop {
        if let Some(found) = run_chunk(params, &mut attempts) {
            return Ok(finish(found, params, attempts, started));
        }

        if let Some(exhausted) =
            checkpoint(params, stop, &mut progress, attempts, started, &mut last_report)
        {
            return Err(exhausted);
        }

        tokio::task::yield_now().await;
    }
}

/// Run up to one check interval of attempts.
fn run_chunk(params: &SearchParams, attempts: &mut u64) -> Option<(VanityKeypair, String)> {
    for _ in 0..CHECK_INTERVAL_ATTEMPTS {
        if *attempts >= params.attempt_limit {
            return None;
        }
        *attempts += 1;

        let keypair = VanityKeypair::generate();
        let public_key = keypair.public_key_base58();

        if !ends_with_suffix(&public_key, &params.suffix, params.case_insensitive) {
            continue;
        }

        // Re-derive the key from its raw bytes before trusting the
        // match; a candidate that fails this is dropped, never returned.
        let verified = VanityKeypair::from_bytes(&keypair.to_bytes())
            .map(|rebuilt| rebuilt.public_key_base58() == public_key)
            .unwrap_or(false);
        if !verified {
            warn!(%public_key, "match failed re-verification, discarding candidate");
            continue;
        }

        return Some((keypair, public_key));
    }

    None
}

/// Evaluate the give-up conditions and emit progress between chunks.
fn checkpoint(
    params: &SearchParams,
    stop: &AtomicBool,
    progress: &mut Option<ProgressSink<'_>>,
    attempts: u64,
    started: Instant,
    last_report: &mut Instant,
) -> Option<Exhausted> {
    if attempts >= params.attempt_limit {
        debug!(attempts, "attempt limit reached");
        return Some(Exhausted { attempts });
    }

    if stop.load(Ordering::Relaxed) {
        debug!(attempts, "search stopped by request");
        return Some(Exhausted { attempts });
    }

    let elapsed = started.elapsed();
    if elapsed >= params.deadline {
        debug!(attempts, "search deadline reached");
        return Some(Exhausted { attempts });
    }

    if attempts % PROGRESS_INTERVAL_ATTEMPTS == 0 || last_report.elapsed() >= PROGRESS_INTERVAL_WALL
    {
        let attempts_per_second = attempts as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        debug!(attempts, attempts_per_second, "vanity search progress");

        if let Some(sink) = progress.as_mut() {
            if let Err(error) = sink(SearchProgress {
                attempts,
                elapsed,
                attempts_per_second,
            }) {
                warn!(%error, "progress sink failed, continuing search");
            }
        }

        *last_report = Instant::now();
    }

    None
}

fn finish(
    (keypair, public_key): (VanityKeypair, String),
    params: &SearchParams,
    attempts: u64,
    started: Instant,
) -> FoundKeypair {
    let suffix_actual = public_key[public_key.len() - params.suffix.len()..].to_owned();

    info!(%public_key, attempts, "vanity match found");

    FoundKeypair {
        keypair,
        public_key,
        suffix_actual,
        attempts,
        elapsed: started.elapsed(),
    }
}

fn ends_with_suffix(public_key: &str, suffix: &str, case_insensitive: bool) -> bool {
    if public_key.len() < suffix.len() {
        return false;
    }

    // base58 output is pure ASCII, so byte indexing and ASCII folding
    // are both safe here.
    let tail = &public_key[public_key.len() - suffix.len()..];

    if case_insensitive {
        tail.eq_ignore_ascii_case(suffix)
    } else {
        tail == suffix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(suffix: &str, case_insensitive: bool) -> SearchParams {
        SearchParams {
            suffix: suffix.to_owned(),
            case_insensitive,
            deadline: Duration::from_secs(60),
            attempt_limit: 5_000_000,
        }
    }

    #[test]
    fn finds_single_character_suffix() {
        let stop = AtomicBool::new(false);

        let found = search(&params("a", true), &stop, None)
            .expect("single character suffix is cheap to reach");

        assert!(found.attempts >= 1);
        assert_eq!(found.suffix_actual.len(), 1);
        assert!(found.suffix_actual.eq_ignore_ascii_case("a"));
        assert!(found.public_key.ends_with(&found.suffix_actual));
    }

    #[test]
    fn case_sensitive_match_has_exact_suffix() {
        let stop = AtomicBool::new(false);

        let found = search(&params("a", false), &stop, None)
            .expect("single character suffix is cheap to reach");

        assert!(found.public_key.ends_with('a'));
        assert_eq!(found.suffix_actual, "a");
    }

    #[test]
    fn zero_attempt_budget_is_always_exhausted() {
        let stop = AtomicBool::new(false);
        let mut search_params = params("a", true);
        search_params.attempt_limit = 0;

        let exhausted = search(&search_params, &stop, None).unwrap_err();

        assert_eq!(exhausted.attempts, 0);
    }

    #[test]
    fn zero_deadline_is_exhausted_within_one_interval() {
        let stop = AtomicBool::new(false);
        let mut search_params = params("111111", false);
        search_params.deadline = Duration::ZERO;

        let exhausted = search(&search_params, &stop, None).unwrap_err();

        assert!(exhausted.attempts <= CHECK_INTERVAL_ATTEMPTS);
    }

    #[test]
    fn stop_request_halts_within_one_interval() {
        let stop = AtomicBool::new(true);

        let exhausted = search(&params("111111", false), &stop, None).unwrap_err();

        assert!(exhausted.attempts <= CHECK_INTERVAL_ATTEMPTS);
    }

    #[test]
    fn progress_sink_failure_is_swallowed() {
        let stop = AtomicBool::new(false);
        let mut search_params = params("111111", false);
        search_params.attempt_limit = PROGRESS_INTERVAL_ATTEMPTS + 1;

        let mut calls = 0;
        let mut sink = |_progress: SearchProgress| -> anyhow::Result<()> {
            calls += 1;
            anyhow::bail!("sink is down")
        };

        let exhausted = search(&search_params, &stop, Some(&mut sink)).unwrap_err();

        assert_eq!(exhausted.attempts, PROGRESS_INTERVAL_ATTEMPTS + 1);
        assert!(calls >= 1, "sink was never invoked");
    }

    #[tokio::test]
    async fn yielding_search_finds_match() {
        let stop = AtomicBool::new(false);
        let search_params = params("a", true);

        let found = search_yielding(&search_params, &stop, None)
            .await
            .expect("single character suffix is cheap to reach");

        assert!(found
            .public_key
            .to_ascii_lowercase()
            .ends_with(&search_params.suffix));
    }

    #[test]
    fn suffix_validation() {
        assert_eq!(validate_suffix("", true), Err(InvalidSuffix::Empty));
        assert_eq!(
            validate_suffix("abcdefg", true),
            Err(InvalidSuffix::TooLong(7))
        );
        assert_eq!(
            validate_suffix("0k", true),
            Err(InvalidSuffix::NotBase58('0'))
        );

        // 'O' is absent from base58, but 'o' stands in for it when
        // matching is case-insensitive.
        assert_eq!(validate_suffix("O", false), Err(InvalidSuffix::NotBase58('O')));
        assert_eq!(validate_suffix("O", true), Ok(()));

        assert_eq!(validate_suffix("LOCK", false), Ok(()));
        assert_eq!(validate_suffix("lock", true), Ok(()));
    }

    #[test]
    fn attempt_estimates() {
        assert_eq!(estimate_attempts("a", false), 58);
        assert_eq!(estimate_attempts("a", true), 29);
        assert_eq!(estimate_attempts("LOCK", false), 11_316_496);
        assert_eq!(estimate_attempts("LOCK", true), 11_316_496 / 16);
    }
}
