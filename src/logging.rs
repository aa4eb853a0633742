use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Send diagnostics to stderr when `debug` is set. Without it no subscriber
/// is installed and every `tracing` macro is a no-op.
pub fn init(debug: bool) {
    if !debug {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scat=debug"));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);
    tracing_subscriber::registry().with(filter).with(layer).init();
}
