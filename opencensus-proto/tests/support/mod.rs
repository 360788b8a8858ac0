use tracing_subscriber::EnvFilter;

/// By default, log everything this crate emits and only warnings elsewhere.
pub const DEFAULT_LOG: &str = "warn,opencensus_proto=trace";

pub fn trace_init() -> tracing::subscriber::DefaultGuard {
    let log_level = std::env::var("OPENCENSUS_PROTO_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_LOG.to_string());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_test_writer()
        .finish();
    tracing::subscriber::set_default(subscriber)
}
