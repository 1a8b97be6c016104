//! Diff parsing and stat aggregation.
//!
//! Turns the text of `git diff -M --full-index` into [`Diff`] entries and
//! derives per-file and total insertion/deletion counts from either those
//! entries or `--numstat` output.

pub mod parser;
pub mod stats;

pub use parser::{parse_diff, Diff, Rename};
pub use stats::{parse_numstat, parse_stats, stats_from_diffs};
