//! Shared context handed to every operation.
use std::sync::Arc;

use crate::config::Config;
use crate::exec::Executor;
use crate::logging::Log;
use crate::ntfs::usage::ResourceUsageProbe;
use crate::prompt::Prompt;

/// Configuration plus the injectable collaborators of one run.
pub struct Context {
    /// Run configuration.
    pub config: Config,
    /// Logger for output and volume recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Busy-check implementation.
    pub usage: Arc<dyn ResourceUsageProbe>,
    /// Source of operator confirmations.
    pub prompt: Arc<dyn Prompt>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("log", &"<dyn Log>")
            .field("executor", &"<dyn Executor>")
            .field("usage", &"<dyn ResourceUsageProbe>")
            .field("prompt", &"<dyn Prompt>")
            .finish()
    }
}

impl Context {
    /// Bundle a configuration with its collaborators.
    #[must_use]
    pub fn new(
        config: Config,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        usage: Arc<dyn ResourceUsageProbe>,
        prompt: Arc<dyn Prompt>,
    ) -> Self {
        Self {
            config,
            log,
            executor,
            usage,
            prompt,
        }
    }

    /// Whether a spinner may draw (never alongside debug output).
    #[must_use]
    pub const fn spinner_enabled(&self) -> bool {
        !self.config.debug
    }
}
