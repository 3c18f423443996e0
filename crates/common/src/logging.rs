use tracing_core::Level;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Initialize the global tracing subscriber.
///
/// `sqlx` query logs are capped at warnings since the scheduler polls
/// the database continuously.
pub fn init(config: &Config) {
    let format = fmt::format().with_target(false).compact();

    let filter = Targets::new()
        .with_target("sqlx", Level::WARN)
        .with_default(config.logging.level);

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
