//! Logging setup for the binary and tests

use env_logger::Env;

/// `RUST_LOG` wins over the built-in filter
pub fn setup_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("foodgram=info,warp=info,sqlx=warn"))
        .init();
}

/// Safe to call from every test; only the first call installs a logger
pub fn setup_test_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}
