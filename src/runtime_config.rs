//! # Runtime Configuration Module
//!
//! Settings that change how the engine behaves at call time. They are fixed
//! when the [`crate::dispatcher::Engine`] is built.
//!
//! ## Environment Variables
//!
//! ### `BRRTR_MAX_CALL_DEPTH`
//!
//! Maximum number of nested calls on one request (route dispatch counts as
//! the first). A call beyond it fails with
//! [`crate::CallError::CallDepthExceeded`]. Default: `32`.
//!
//! ### `BRRTR_STRIP_JSESSIONID`
//!
//! Remove `;jsessionid=...` path parameters before mount and route matching.
//! Default: `true`.
//!
//! ### `BRRTR_THROW_WHEN_HANDLED`
//!
//! Default for programmatic calls: report a failure an exception handler dealt
//! with as [`crate::CallError::Handled`] instead of `Ok(None)`. Route dispatch
//! always reports `Handled`. Default: `false`.
//!
//! ## Usage
//!
//! ```rust
//! use brrtrouter_mvc::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.max_call_depth > 0);
//!
//! let config = RuntimeConfig::from_yaml_str("max_call_depth: 4\n").unwrap();
//! assert_eq!(config.max_call_depth, 4);
//! assert!(config.strip_jsessionid);
//! ```

use std::env;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_CALL_DEPTH: usize = 32;

/// Runtime configuration, from environment variables or a YAML file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum nested calls per request (default: 32)
    pub max_call_depth: usize,
    /// Strip `;jsessionid=` segments from request paths (default: true)
    pub strip_jsessionid: bool,
    /// Programmatic calls report handled failures as errors (default: false)
    pub throw_when_handled: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            strip_jsessionid: true,
            throw_when_handled: false,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_call_depth = match env::var("BRRTR_MAX_CALL_DEPTH") {
            Ok(val) => match val.trim().parse::<usize>() {
                Ok(0) | Err(_) => defaults.max_call_depth,
                Ok(n) => n,
            },
            Err(_) => defaults.max_call_depth,
        };
        RuntimeConfig {
            max_call_depth,
            strip_jsessionid: env_flag("BRRTR_STRIP_JSESSIONID")
                .unwrap_or(defaults.strip_jsessionid),
            throw_when_handled: env_flag("BRRTR_THROW_WHEN_HANDLED")
                .unwrap_or(defaults.throw_when_handled),
        }
    }

    /// Parse a YAML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML for this struct.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("invalid runtime configuration")?;
        if config.max_call_depth == 0 {
            anyhow::bail!("max_call_depth must be at least 1");
        }
        Ok(config)
    }

    /// Read and parse a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("in {}", path.display()))
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let val = env::var(name).ok()?;
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
