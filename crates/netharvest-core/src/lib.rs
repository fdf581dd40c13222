//! Netharvest Core Library
//!
//! This crate provides the core functionality for netharvest:
//! - Configuration parsing and validation
//! - Transform spec model and the transformation engine
//! - Column resolvers and lookup tables
//! - Calendar arithmetic and timezone-aware date parsing
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Adapter   │────▶│  Transform  │────▶│  Delivery   │
//! │   (lines)   │     │   Engine    │     │ (disk/mail) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use netharvest_core::{engine, Config};
//!
//! let config = Config::load("./netharvest.yaml")?;
//! let engine_config = config.project.engine_config()?;
//! for job in config.load_jobs()? {
//!     let spec = config.resolve_transform(&job)?.unwrap_or_default();
//!     let report = engine::transform(&lines, &job.output_header, &spec, &engine_config)?;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod datasource;
pub mod datetime;
pub mod engine;
pub mod error;
pub mod job;
pub mod resolvers;
pub mod tabular;
pub mod transforms;

pub use config::{Config, EngineConfig, ProjectConfig};
pub use error::{Error, Result};
pub use job::Job;
pub use transforms::TransformSpec;
