//! CLI command implementations

pub mod init;
pub mod job;
pub mod run;
pub mod status;
pub mod validate;
