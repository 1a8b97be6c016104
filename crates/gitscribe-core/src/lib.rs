//! Core types, configuration, and error handling for gitscribe.
//!
//! This crate provides the shared foundation used by the other gitscribe crates:
//! - [`GitscribeError`]: unified error type using `thiserror` and `miette`
//! - [`GitscribeConfig`]: configuration loaded from `.gitscribe.toml`
//! - Shared types: [`Actor`], [`Blob`], [`ChangeType`], [`FileMode`], [`Hunk`], [`Stats`],
//!   [`FileStats`], [`TotalStats`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{GitscribeConfig, LogConfig, OutputConfig, StatsConfig};
pub use error::GitscribeError;
pub use types::{
    Actor, Blob, ChangeType, FileMode, FileStats, Hunk, OutputFormat, Stats, TotalStats,
};

/// A convenience `Result` type for gitscribe operations.
pub type Result<T> = std::result::Result<T, GitscribeError>;
