use tracing::{subscriber::set_global_default, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

/// Subscriber for the application
///
/// It's filtered based off the standard environment filter, falling back to
/// `env_filter` when `RUST_LOG` is unset. Bunyan formatted JSON is written
/// to `sink`, which lets tests swallow output with `std::io::sink`.
pub fn generate_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: MakeWriter + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);
    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Initialises the subscriber globally and also sets it to include log statements
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    LogTracer::init().expect("failed to attach logs to tracing");
    set_global_default(subscriber).expect("failed to set global subscriber");
}
