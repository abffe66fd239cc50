//! `tracing` subscriber setup.
//!
//! The chat UI owns the terminal, so interactive runs only log when a log file
//! is given. One-shot commands log to stderr.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// HTTP plumbing crates clamped to `warn` unless `RUST_LOG` says otherwise.
pub const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

pub enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
    Off,
}

pub fn build_filter(default_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut directives = String::from(default_level);
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{module}=warn"));
    }
    EnvFilter::new(directives)
}

pub fn init_tracing(target: LogTarget<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let builder = tracing_subscriber::fmt().with_target(true);
    // An already-installed subscriber stays in place.
    let _ = match target {
        LogTarget::Off => return Ok(()),
        LogTarget::Stderr => builder
            .with_env_filter(build_filter("warn"))
            .with_writer(std::io::stderr)
            .try_init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_env_filter(build_filter("debug"))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };
    Ok(())
}
