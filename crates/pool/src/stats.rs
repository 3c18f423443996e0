//! Aggregate pool observability types.

use derive_more::Display;
use serde::Serialize;

/// Coarse pool health, classified against the configured watermark.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolHealth {
    /// Nothing left to claim.
    #[display(fmt = "critical")]
    Critical,

    /// Below a quarter of the watermark.
    #[display(fmt = "low")]
    Low,

    /// Below the watermark but serviceable.
    #[display(fmt = "good")]
    Good,

    /// At or above the watermark.
    #[display(fmt = "excellent")]
    Excellent,
}

impl PoolHealth {
    /// Classify an available count against the target watermark.
    pub fn classify(available: u64, target_size: u64) -> Self {
        if available == 0 {
            Self::Critical
        } else if available >= target_size {
            Self::Excellent
        } else if available * 4 < target_size {
            Self::Low
        } else {
            Self::Good
        }
    }
}

/// Aggregated generation cost of the rows in the store.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct GenerationPerformance {
    /// Mean attempts per stored address.
    pub avg_attempts: f64,

    /// Mean search time per stored address, in seconds.
    pub avg_time_seconds: f64,

    /// Cheapest stored address, in attempts.
    pub min_attempts: i64,

    /// Most expensive stored address, in attempts.
    pub max_attempts: i64,
}

/// Point-in-time view of the pool, derived entirely from stored rows.
#[derive(Clone, Debug, Serialize)]
pub struct PoolStats {
    /// All rows for the configured suffix, claimed included.
    pub total: u64,

    /// Rows still claimable.
    pub available: u64,

    /// Rows already claimed or retired.
    pub used: u64,

    /// Watermark the scheduler maintains.
    pub target_size: u64,

    /// Health classification of the available count.
    pub health: PoolHealth,

    /// Generation cost aggregates; absent while the store is empty.
    pub performance: Option<GenerationPerformance>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_thresholds() {
        assert_eq!(PoolHealth::classify(0, 10), PoolHealth::Critical);
        assert_eq!(PoolHealth::classify(2, 10), PoolHealth::Low);
        assert_eq!(PoolHealth::classify(3, 10), PoolHealth::Good);
        assert_eq!(PoolHealth::classify(9, 10), PoolHealth::Good);
        assert_eq!(PoolHealth::classify(10, 10), PoolHealth::Excellent);
        assert_eq!(PoolHealth::classify(25, 10), PoolHealth::Excellent);
    }

    #[test]
    fn health_with_zero_target() {
        // A zero watermark means any stock at all is a surplus.
        assert_eq!(PoolHealth::classify(0, 0), PoolHealth::Critical);
        assert_eq!(PoolHealth::classify(1, 0), PoolHealth::Excellent);
    }
}
