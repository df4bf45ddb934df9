//! Host bootstrap: layered configuration, structured logging, shutdown
//! signals. Everything the binary needs before the registry takes over.

pub mod config;
pub mod config_provider;
pub mod logging;
pub mod paths;
pub mod signals;

pub use config::*;
pub use config_provider::*;
pub use logging::*;
pub use signals::*;

// Serializes tests that mutate or read process-wide environment variables;
// cargo runs tests in parallel threads within one process.
#[cfg(test)]
pub(crate) fn env_guard() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}
