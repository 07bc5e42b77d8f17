// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory host and pluggable providers for tests.
mod host;
mod pluggable;

pub use host::{Lookup, TestHost};
pub use pluggable::TestPluggable;

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}
