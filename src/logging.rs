//! Logging setup.
//!
//! plume emits [`tracing`] events and leaves the choice of subscriber to the
//! application. [`init_logging`] is the batteries-included default that
//! [`App::listen`](crate::App::listen) installs when `verbose` is `true`.
//!
//! The level is read from `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=debug cargo run
//! RUST_LOG=plume=info,warn cargo run
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a formatted stdout subscriber filtered by `RUST_LOG`
/// (default `info`).
///
/// Does nothing if a global subscriber is already set, so it is safe to
/// call more than once or after the application installed its own.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_logging();
        init_logging();
        tracing::info!("still logging");
    }
}
