//! Netharvest Runtime
//!
//! This crate provides the execution runtime for netharvest extraction
//! jobs: fetch from the datasource, transform through the engine, deliver
//! to disk or mail.
//!
//! # Usage
//!
//! ```rust,ignore
//! use netharvest_runtime::Runtime;
//!
//! let runtime = Runtime::new(config)?;
//! runtime.run_all().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod delivery;
pub mod engine;
pub mod error;

pub use engine::Runtime;
pub use error::{Error, Result};
