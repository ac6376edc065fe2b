//! Development-time tracing for the folio CLI.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG` or `-v`, output
//!   to stderr. Not persisted, not part of product output.
//!
//! - **Chat snapshots (`io/store`)**: Product artifacts under `.folio/`.
//!   Always written, unaffected by logging settings.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive for a `-v` count when `RUST_LOG` is unset.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,folio=info",
        2 => "warn,folio=debug",
        _ => "trace",
    }
}

/// Initialize tracing subscriber for development logging.
///
/// `RUST_LOG` wins when set; otherwise `verbosity` picks the filter.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=folio=debug cargo run -p folio -- chat
/// ```
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_folio_level() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(2), "warn,folio=debug");
        assert_eq!(default_directive(9), "trace");
    }
}
