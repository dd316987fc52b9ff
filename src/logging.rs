use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the fmt subscriber. `RUST_LOG` directives apply on top of
/// `level`; an unparseable level falls back to `info`.
pub fn init(level: &str) {
    let directive = level
        .parse::<Directive>()
        .unwrap_or_else(|_| Level::INFO.into());
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .try_init();
}
