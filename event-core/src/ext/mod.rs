use anyhow::anyhow;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

/// Installs a pretty printing subscriber at `level`. Fails if a global
/// subscriber is already set.
pub fn init_logger(level: tracing::Level) -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::format()
        .with_timer(LocalTime::rfc_3339())
        .pretty();
    tracing_subscriber::FmtSubscriber::builder()
        .event_format(format)
        .with_max_level(level)
        .try_init()
        .map_err(|error| anyhow!(error))
}

/// Same as [`init_logger`] with a directive filter, e.g.
/// `"event_core::bus=trace,event_core::registry=debug"`.
pub fn init_logger_with_filter(filter: impl Into<EnvFilter>) -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::format()
        .with_timer(LocalTime::rfc_3339())
        .pretty()
        .with_file(false);
    tracing_subscriber::FmtSubscriber::builder()
        .event_format(format)
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow!(error))
}
