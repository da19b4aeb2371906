//! Tracing subscriber setup

use crate::config::Environment;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global fmt subscriber
///
/// `RUST_LOG` wins when set; otherwise the environment's default level is
/// used. Calling this more than once is harmless.
pub fn init_tracing(env: &Environment) {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(env.default_log_level())),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
