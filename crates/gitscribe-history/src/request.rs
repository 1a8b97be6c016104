//! Requests for raw git text, and the source that answers them.
//!
//! gitscribe never runs git itself. A [`TextSource`] is handed a
//! [`FetchRequest`] and returns whatever text git would print for it.

use std::fmt;

use gitscribe_core::{GitscribeError, Stats};
use gitscribe_difflens::{parse_diff, parse_stats, Diff};
use serde::Serialize;
use tracing::debug;

/// Revision range for a diff.
///
/// `from = None, to = Some(id)` is a root-commit diff (against the empty
/// tree). `to = None` compares `from` with the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffRange {
    /// Older side; `None` for a root commit.
    pub from: Option<String>,
    /// Newer side; `None` for the working tree.
    pub to: Option<String>,
    /// Optional path filter.
    pub paths: Vec<String>,
}

impl DiffRange {
    /// Changes from `from` to `to`.
    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
            paths: Vec::new(),
        }
    }

    /// Everything introduced by a parentless commit.
    pub fn root(id: impl Into<String>) -> Self {
        Self {
            from: None,
            to: Some(id.into()),
            paths: Vec::new(),
        }
    }

    /// Changes from `from` to the working tree.
    pub fn working_tree(from: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: None,
            paths: Vec::new(),
        }
    }

    /// Restrict the range to `paths`.
    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// `true` for the parentless-commit form.
    pub fn is_root(&self) -> bool {
        self.from.is_none() && self.to.is_some()
    }
}

impl fmt::Display for DiffRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => write!(f, "{from}..{to}")?,
            (None, Some(to)) => write!(f, "{to} (root)")?,
            (Some(from), None) => write!(f, "{from}..<worktree>")?,
            (None, None) => write!(f, "<worktree>")?,
        }
        if !self.paths.is_empty() {
            write!(f, " -- {}", self.paths.join(" "))?;
        }
        Ok(())
    }
}

/// What a [`TextSource`] is asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FetchRequest {
    /// A single `--pretty=raw` record, e.g. `git rev-list -n 1 --pretty=raw <id>`.
    Record { id: String },
    /// Full-index patch text, e.g. `git diff --full-index -M <from> <to>`.
    Patch(DiffRange),
    /// Numstat text, e.g. `git diff --numstat <from> <to>`.
    NumStat(DiffRange),
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchRequest::Record { id } => write!(f, "record {id}"),
            FetchRequest::Patch(range) => write!(f, "patch {range}"),
            FetchRequest::NumStat(range) => write!(f, "numstat {range}"),
        }
    }
}

/// Supplies raw git output for a [`FetchRequest`].
///
/// Implemented for any `Fn(&FetchRequest) -> Result<String, GitscribeError>`,
/// so a closure over a process runner or a fixture map works directly.
/// Failures from the underlying command should be wrapped with
/// [`GitscribeError::fetch`].
pub trait TextSource {
    fn fetch(&self, request: &FetchRequest) -> Result<String, GitscribeError>;
}

impl<F> TextSource for F
where
    F: Fn(&FetchRequest) -> Result<String, GitscribeError>,
{
    fn fetch(&self, request: &FetchRequest) -> Result<String, GitscribeError> {
        self(request)
    }
}

/// Fetch and parse the patch for `range`.
pub fn fetch_diffs(source: &impl TextSource, range: &DiffRange) -> Result<Vec<Diff>, GitscribeError> {
    debug!(%range, "fetching patch");
    let text = source.fetch(&FetchRequest::Patch(range.clone()))?;
    parse_diff(&text)
}

/// Fetch and parse numstat output for `range`.
pub fn fetch_stats(source: &impl TextSource, range: &DiffRange) -> Result<Stats, GitscribeError> {
    debug!(%range, "fetching numstat");
    let text = source.fetch(&FetchRequest::NumStat(range.clone()))?;
    parse_stats(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_display() {
        assert_eq!(DiffRange::between("a", "b").to_string(), "a..b");
        assert_eq!(DiffRange::root("c").to_string(), "c (root)");
        assert_eq!(
            DiffRange::working_tree("HEAD")
                .with_paths(["lib", "README"])
                .to_string(),
            "HEAD..<worktree> -- lib README"
        );
    }

    #[test]
    fn root_range() {
        assert!(DiffRange::root("c").is_root());
        assert!(!DiffRange::between("a", "b").is_root());
        assert!(!DiffRange::default().is_root());
    }

    #[test]
    fn closures_are_sources() {
        let source = |req: &FetchRequest| -> Result<String, GitscribeError> {
            match req {
                FetchRequest::NumStat(_) => Ok("3\t1\tlib/grit.rb\n".into()),
                other => Err(GitscribeError::fetch(std::io::Error::other(other.to_string()))),
            }
        };
        let stats = fetch_stats(&source, &DiffRange::between("a", "b")).unwrap();
        assert_eq!(stats.total().lines, 4);

        let err = fetch_diffs(&source, &DiffRange::between("a", "b")).unwrap_err();
        assert!(matches!(err, GitscribeError::Fetch(_)));
    }

    #[test]
    fn request_serializes_with_kind_tag() {
        let json = serde_json::to_value(FetchRequest::Record { id: "abc".into() }).unwrap();
        assert_eq!(json["kind"], "record");
        assert_eq!(json["id"], "abc");
    }
}
