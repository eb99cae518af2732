//! Logging setup.

/// Initializes the global logger, writing to stderr.
///
/// `RUST_LOG` wins over `level` when set. Calling this more than once is
/// harmless; later calls are ignored.
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
