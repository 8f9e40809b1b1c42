//! Compiler configuration
//!
//! Tuning knobs for the expression cache, registry locking and the
//! function-extraction fixpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`crate::Compiler`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Longest wait for the cache or a registry lock before reporting contention
    pub lock_timeout: Duration,

    /// Maximum number of cached compiled expressions (0 = unbounded)
    pub cache_capacity: usize,

    /// Upper bound on function-extraction rounds per expression
    pub max_extraction_passes: usize,

    /// Log the rewritten text and resolution order of each compilation at debug level
    pub trace_steps: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            cache_capacity: 1024,
            max_extraction_passes: 10_000,
            trace_steps: false,
        }
    }
}

impl CompilerConfig {
    /// Fail fast on contention instead of waiting
    pub fn low_latency() -> Self {
        Self {
            lock_timeout: Duration::from_millis(50),
            ..Default::default()
        }
    }

    /// Small cache and step tracing, for inspecting the pipeline
    pub fn debug() -> Self {
        Self {
            cache_capacity: 16,
            max_extraction_passes: 1_000,
            trace_steps: true,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.lock_timeout.is_zero() {
            return Err("Lock timeout must be > 0".to_string());
        }

        if self.max_extraction_passes == 0 {
            return Err("Max extraction passes must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        assert!(CompilerConfig::default().validate().is_ok());
        assert!(CompilerConfig::low_latency().validate().is_ok());
        assert!(CompilerConfig::debug().validate().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = CompilerConfig {
            lock_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
