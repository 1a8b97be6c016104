use std::path::PathBuf;

/// Errors that can occur across the gitscribe crates.
///
/// Parse failures carry the 1-based line number of the offending input line
/// so callers can point at the exact spot in the text they fed in. Library
/// crates use this type directly; the binary converts to `miette::Report` at
/// the boundary.
///
/// # Examples
///
/// ```
/// use gitscribe_core::GitscribeError;
///
/// let err = GitscribeError::MalformedRecord {
///     line: 3,
///     reason: "author line has no email".into(),
/// };
/// assert!(err.to_string().contains("line 3"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum GitscribeError {
    /// A commit record is missing a required header field or has one that
    /// cannot be parsed.
    #[error("malformed commit record at line {line}: {reason}")]
    #[diagnostic(
        code(gitscribe::malformed_record),
        help("expected `git rev-list --pretty=raw` / `git log --pretty=raw` output")
    )]
    MalformedRecord {
        /// 1-based line number in the input text.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// A diff entry's header or hunk sequence matches no known production.
    #[error("malformed diff at line {line}: {reason}")]
    #[diagnostic(
        code(gitscribe::malformed_diff),
        help("expected `git diff -M --full-index` output")
    )]
    MalformedDiff {
        /// 1-based line number in the input text.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// A numstat or shortstat line could not be parsed.
    #[error("malformed stat line {line}: {reason}")]
    #[diagnostic(
        code(gitscribe::malformed_stat),
        help("expected `<insertions>\\t<deletions>\\t<path>` lines")
    )]
    MalformedStat {
        /// 1-based line number in the input text.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// Per-file counts do not add up to independently supplied totals.
    #[error("stats mismatch for {field}: expected {expected}, summed {actual}")]
    #[diagnostic(code(gitscribe::stats_mismatch))]
    StatsMismatch {
        /// Which total disagreed (`files`, `insertions`, `deletions`, `lines`).
        field: &'static str,
        /// The stated total.
        expected: u64,
        /// The value summed from the per-file entries.
        actual: u64,
    },

    /// The caller-supplied fetch operation failed.
    #[error("fetch failed: {0}")]
    #[diagnostic(code(gitscribe::fetch))]
    Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl GitscribeError {
    /// Wrap an arbitrary error returned by a fetch callback.
    pub fn fetch<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        GitscribeError::Fetch(err.into())
    }

    /// Line number of the offending input line, for parse errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            GitscribeError::MalformedRecord { line, .. }
            | GitscribeError::MalformedDiff { line, .. }
            | GitscribeError::MalformedStat { line, .. } => Some(*line),
            _ => None,
        }
    }
}
