//! # bockrose
//!
//! Run a stack of local processes the way compose runs containers.
//!
//! bockrose provides:
//! - Declarative project files (`bockrose.yaml`)
//! - Replicas and restart policies
//! - Multiplexed, prefixed log output
//! - Abort-on-exit with a selectable exit code

#![warn(missing_docs)]

pub mod cli;
pub mod runner;
pub mod spec;

pub use runner::Runner;
pub use spec::ProjectSpec;
