//! Tracing subscriber setup for the binary

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::Config;

const DEFAULT_FILTER: &str = "warn";

/// Filter directive: `--verbose`, then `FLATBOM_LOG`/`log_level`, then warnings only
pub fn filter_directive(config: &Config, verbose: bool) -> String {
    if verbose {
        return "debug".to_string();
    }
    config
        .log_level
        .as_deref()
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Install the global subscriber; logs always go to stderr
pub fn init_logging(config: &Config, verbose: bool) {
    let directive = filter_directive(config, verbose);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format.as_deref() {
        Some("json") => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };

    if result.is_ok() && directive != DEFAULT_FILTER {
        tracing::debug!(filter = %directive, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        let mut config = Config::default();
        assert_eq!(filter_directive(&config, false), "warn");
        assert_eq!(filter_directive(&config, true), "debug");

        config.log_level = Some("flatbom=info".to_string());
        assert_eq!(filter_directive(&config, false), "flatbom=info");
        assert_eq!(filter_directive(&config, true), "debug");

        config.log_level = Some("  ".to_string());
        assert_eq!(filter_directive(&config, false), "warn");
    }
}
