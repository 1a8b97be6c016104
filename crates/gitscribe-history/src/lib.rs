//! Commit records and the lazily-baked [`Commit`].
//!
//! Parses `--pretty=raw` logs (including `rev-list --bisect-all` output) into
//! commits, and fills in stubs on demand through a caller-supplied
//! [`TextSource`].

pub mod commit;
pub mod record;
pub mod request;

pub use commit::{BakeState, Commit, CommitDetails};
pub use record::{parse_commit_log, parse_commit_log_with, parse_single_record};
pub use request::{fetch_diffs, fetch_stats, DiffRange, FetchRequest, TextSource};
