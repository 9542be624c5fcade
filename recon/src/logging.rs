use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Route tracing events to an append-only `recon.log` in the working
/// directory. The terminal stays reserved for status lines and echoed
/// subdomains.
pub fn init() {
    let file_appender = RollingFileAppender::new(Rotation::NEVER, ".", "recon.log");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_file(false)
        .with_target(false)
        .with_writer(file_appender)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("unable to set the global tracing subscriber");
}
