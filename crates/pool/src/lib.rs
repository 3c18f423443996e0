//! # Vanity address pool
//!
//! Maintains a stock of pre-generated Ed25519 keypairs whose base58
//! public keys end with a configured suffix, so that consumers get a
//! branded address instantly instead of waiting minutes for a live
//! brute-force search.
//!
//! # Components
//!
//! The [`engine`] module is the CPU-bound search itself: random
//! keypairs are generated and tested until one matches, with periodic
//! progress reporting and cooperative cancellation. Expected cost is
//! `58^len(suffix)` attempts, which is exactly why searches are done
//! ahead of time.
//!
//! The [`store`] module owns the durable address table. Search results
//! are inserted as available rows; [`store::AddressPool::claim_next`]
//! hands each row to exactly one caller, oldest first, re-validating
//! the stored material before trusting it.
//!
//! The [`scheduler`] module runs the background producer: whenever the
//! available count drops below the configured watermark it generates a
//! bounded batch of new addresses, and it shuts down cooperatively
//! within seconds of being asked.
//!
//! When the pool runs dry, callers degrade to
//! [`engine::search_yielding`], the foreground search variant that
//! yields to the async runtime while it grinds.

pub mod engine;
pub mod keypair;
pub mod scheduler;
pub mod stats;
pub mod store;

pub use engine::{Exhausted, FoundKeypair, InvalidSuffix, SearchParams, SearchProgress};
pub use keypair::VanityKeypair;
pub use scheduler::SchedulerHandle;
pub use stats::{GenerationPerformance, PoolHealth, PoolStats};
pub use store::{AddressPool, ClaimError, ClaimedAddress, InsertError};
