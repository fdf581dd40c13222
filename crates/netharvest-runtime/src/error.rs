//! Runtime error handling

use anyhow;

/// Result alias used across job orchestration and delivery
pub type Result<T> = anyhow::Result<T>;

/// Runtime errors are contextual `anyhow` chains, not a typed enum
pub type Error = anyhow::Error;
