//! Logging setup
//!
//! Logs go to stderr, or to `log_file` from config when set. `RUST_LOG`
//! overrides the default filter.

use std::fs::File;
use std::io;
use std::sync::Mutex;

use themesync_core::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for the process (no-op if already initialized)
pub fn init(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("themesync_core={},themesync_cli={}", level, level))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    let Some(log_path) = &config.log_file else {
        let _ = builder.with_writer(io::stderr).try_init();
        return;
    };

    match File::create(log_path) {
        Ok(file) => {
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
            debug!("Logging to {:?}", log_path);
        }
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            let _ = builder.with_writer(io::stderr).try_init();
        }
    }
}
