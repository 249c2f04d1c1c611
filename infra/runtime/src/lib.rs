//! # Runtime
//!
//! Tokio runtime presets for the veil binaries.
//!
//! * [`RuntimeConfig::server`]: multi-threaded scheduler sized to the host, used by the
//!   HTTP proxy where many requests wait on the store concurrently.
//! * [`RuntimeConfig::cli`]: current-thread scheduler for the interactive shell, which
//!   issues one command at a time.
//!
//! ```rust,ignore
//! #[veil_runtime::main(server)]
//! async fn main() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```

pub use anyhow::Result;
pub use veil_derive::main;

use anyhow::Context;
use std::{sync::OnceLock, thread::available_parallelism, time::Duration};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

const DEFAULT_WORKER_THREADS: usize = 4;
const MAX_WORKER_THREADS: usize = 1024;
/// 2 `MiB`, Tokio's own default.
const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
const MIN_STACK_SIZE: usize = 1024 * 1024;
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
const THREAD_KEEP_ALIVE: Duration = Duration::from_secs(60);

static WORKER_THREADS: OnceLock<usize> = OnceLock::new();

/// `TOKIO_WORKER_THREADS` wins over detected parallelism.
fn detected_worker_threads() -> usize {
    *WORKER_THREADS.get_or_init(|| {
        std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0 && n <= MAX_WORKER_THREADS)
            .unwrap_or_else(|| {
                available_parallelism().map(std::num::NonZero::get).unwrap_or(DEFAULT_WORKER_THREADS)
            })
    })
}

/// Scheduler flavor for a [`RuntimeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    MultiThread,
    CurrentThread,
}

/// Configuration for a Tokio runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub flavor: Flavor,
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flavor: Flavor::MultiThread,
            worker_threads: detected_worker_threads(),
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: "veil-worker".to_owned(),
            thread_keep_alive: THREAD_KEEP_ALIVE,
        }
    }
}

impl RuntimeConfig {
    /// Preset for the HTTP proxy.
    #[must_use]
    pub fn server() -> Self {
        Self {
            thread_name: "veil-server".to_owned(),
            thread_keep_alive: Duration::from_secs(300),
            ..Self::default()
        }
    }

    /// Preset for the interactive shell.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            flavor: Flavor::CurrentThread,
            worker_threads: 1,
            thread_name: "veil-cli".to_owned(),
            thread_keep_alive: Duration::from_secs(10),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.clamp(1, MAX_WORKER_THREADS);
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE);
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.thread_name = name;
        }
        self
    }

    fn normalized(&self) -> Self {
        let mut config = self.clone();
        config.worker_threads = config.worker_threads.clamp(1, MAX_WORKER_THREADS);
        config.stack_size = config.stack_size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE);
        if config.thread_name.trim().is_empty() {
            "veil-worker".clone_into(&mut config.thread_name);
        }
        config
    }
}

/// Builds a Tokio runtime with I/O and timers enabled.
///
/// # Errors
///
/// Returns an error if the OS refuses to create the runtime threads.
pub fn build_runtime(config: &RuntimeConfig) -> Result<Runtime> {
    let config = config.normalized();
    debug!(config = ?config, "Building tokio runtime");

    let mut builder = match config.flavor {
        Flavor::MultiThread => {
            let mut builder = Builder::new_multi_thread();
            builder.worker_threads(config.worker_threads);
            builder
        },
        Flavor::CurrentThread => Builder::new_current_thread(),
    };

    builder
        .thread_name(&config.thread_name)
        .thread_stack_size(config.stack_size)
        .thread_keep_alive(config.thread_keep_alive)
        .enable_all()
        .build()
        .context("Failed to initialize tokio runtime")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_threads_are_clamped() {
        assert_eq!(RuntimeConfig::default().with_worker_threads(0).worker_threads, 1);
        assert_eq!(RuntimeConfig::default().with_worker_threads(5000).worker_threads, 1024);
    }

    #[test]
    fn test_stack_size_is_clamped() {
        assert_eq!(RuntimeConfig::default().with_stack_size(100).stack_size, MIN_STACK_SIZE);
        assert_eq!(
            RuntimeConfig::default().with_stack_size(usize::MAX).stack_size,
            MAX_STACK_SIZE
        );
    }

    #[test]
    fn test_blank_thread_name_is_ignored() {
        let config = RuntimeConfig::server().with_thread_name("   ");
        assert_eq!(config.thread_name, "veil-server");
    }

    #[test]
    fn test_cli_preset_is_current_thread() {
        let config = RuntimeConfig::cli();
        assert_eq!(config.flavor, Flavor::CurrentThread);
        assert_eq!(config.worker_threads, 1);
    }

    #[test]
    fn test_runtime_executes_futures() -> Result<()> {
        for config in [RuntimeConfig::server().with_worker_threads(2), RuntimeConfig::cli()] {
            let rt = build_runtime(&config)?;
            let answer = rt.block_on(async { tokio::task::spawn(async { 21 * 2 }).await })?;
            assert_eq!(answer, 42);
        }
        Ok(())
    }
}
