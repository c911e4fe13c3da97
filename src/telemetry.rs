//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset
pub fn default_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "error"
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise everything is logged in debug mode
/// and only errors are logged in production. Calling this twice is harmless.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(debug)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_mode_selects_verbose_level() {
        assert_eq!(default_level(true), "debug");
        assert_eq!(default_level(false), "error");
    }

    #[test]
    fn repeated_init_does_not_panic() {
        init(false);
        init(true);
    }
}
