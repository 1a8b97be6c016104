//! The commit entity and its lazy bake.
//!
//! A [`Commit`] starts either fully parsed (from a `--pretty=raw` log) or as a
//! stub holding only its id and, optionally, its parents. Reading any detail
//! of a stub fetches and parses its record exactly once.

use std::fmt;
use std::hash::{Hash, Hasher};

use gitscribe_core::{Actor, GitscribeError, Stats};
use gitscribe_difflens::Diff;
use serde::Serialize;
use tracing::debug;

use crate::record::parse_single_record;
use crate::request::{fetch_diffs, fetch_stats, DiffRange, FetchRequest, TextSource};

/// Everything a record carries beyond id and parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitDetails {
    pub tree: Option<String>,
    pub author: Actor,
    pub committer: Actor,
    /// Full message, de-indented, trailing blank lines removed.
    pub message: String,
}

impl CommitDetails {
    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// Whether a commit's details have been loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum BakeState {
    Stub,
    Baked(CommitDetails),
}

impl BakeState {
    /// Return the details, replacing a stub with the result of `bake` first.
    ///
    /// A failed `bake` leaves the state a stub.
    fn get_or_try_bake(
        &mut self,
        bake: impl FnOnce() -> Result<CommitDetails, GitscribeError>,
    ) -> Result<&CommitDetails, GitscribeError> {
        if let BakeState::Stub = self {
            *self = BakeState::Baked(bake()?);
        }
        match self {
            BakeState::Baked(details) => Ok(details),
            BakeState::Stub => unreachable!("stub replaced above"),
        }
    }
}

/// A commit identified by its id.
///
/// Equality, hashing and display use the id only, so a stub and its baked
/// form compare equal.
///
/// Baking takes `&mut self`; share a commit across threads behind a lock.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    id: String,
    parents: Vec<String>,
    #[serde(flatten)]
    state: BakeState,
}

impl Commit {
    /// A stub for `id` with no known parents.
    pub fn stub(id: impl Into<String>) -> Self {
        Self::with_parents(id, Vec::new())
    }

    /// A stub with known parents.
    pub fn with_parents(id: impl Into<String>, parents: Vec<String>) -> Self {
        Self {
            id: id.into(),
            parents,
            state: BakeState::Stub,
        }
    }

    /// A fully populated commit.
    pub fn baked(id: impl Into<String>, parents: Vec<String>, details: CommitDetails) -> Self {
        Self {
            id: id.into(),
            parents,
            state: BakeState::Baked(details),
        }
    }

    /// Full or abbreviated commit id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parent ids in record order. A stub created without parents reports
    /// none until baked.
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// Current bake state.
    pub fn state(&self) -> &BakeState {
        &self.state
    }

    /// Details have been loaded.
    pub fn is_baked(&self) -> bool {
        matches!(self.state, BakeState::Baked(_))
    }

    /// Details if already baked; never fetches.
    pub fn details(&self) -> Option<&CommitDetails> {
        match &self.state {
            BakeState::Baked(details) => Some(details),
            BakeState::Stub => None,
        }
    }

    /// Load this commit's record from `source` if it is still a stub.
    ///
    /// Idempotent: a baked commit returns its details without touching the
    /// source. Parents supplied when the stub was created are kept; otherwise
    /// they come from the fetched record.
    ///
    /// # Errors
    ///
    /// Returns the source's error, or [`GitscribeError::MalformedRecord`] if
    /// the fetched text is not a complete record for this id. The commit stays
    /// a stub on error.
    pub fn bake(&mut self, source: &impl TextSource) -> Result<&CommitDetails, GitscribeError> {
        let id = &self.id;
        let parents = &mut self.parents;
        self.state.get_or_try_bake(|| {
            debug!(%id, "baking commit");
            let text = source.fetch(&FetchRequest::Record { id: id.clone() })?;
            let fetched = parse_single_record(&text, id)?;
            if parents.is_empty() {
                parents.clone_from(&fetched.parents);
            }
            match fetched.state {
                BakeState::Baked(details) => Ok(details),
                BakeState::Stub => Err(GitscribeError::MalformedRecord {
                    line: 1,
                    reason: format!("record for {id} is incomplete"),
                }),
            }
        })
    }

    /// Root tree id, baking first if needed.
    pub fn tree(&mut self, source: &impl TextSource) -> Result<Option<&str>, GitscribeError> {
        Ok(self.bake(source)?.tree.as_deref())
    }

    /// Author signature, baking first if needed.
    pub fn author(&mut self, source: &impl TextSource) -> Result<&Actor, GitscribeError> {
        Ok(&self.bake(source)?.author)
    }

    /// Committer signature, baking first if needed.
    pub fn committer(&mut self, source: &impl TextSource) -> Result<&Actor, GitscribeError> {
        Ok(&self.bake(source)?.committer)
    }

    /// Full message, baking first if needed.
    pub fn message(&mut self, source: &impl TextSource) -> Result<&str, GitscribeError> {
        Ok(&self.bake(source)?.message)
    }

    /// First message line, baking first if needed.
    pub fn summary(&mut self, source: &impl TextSource) -> Result<&str, GitscribeError> {
        Ok(self.bake(source)?.summary())
    }

    /// Range this commit introduces: first parent to self, or a root diff.
    pub fn diff_range(&self) -> DiffRange {
        match self.parents.first() {
            Some(parent) => DiffRange::between(parent.as_str(), self.id.as_str()),
            None => DiffRange::root(self.id.as_str()),
        }
    }

    /// Changes introduced by this commit.
    pub fn diffs(&self, source: &impl TextSource) -> Result<Vec<Diff>, GitscribeError> {
        fetch_diffs(source, &self.diff_range())
    }

    /// Line statistics for this commit.
    pub fn stats(&self, source: &impl TextSource) -> Result<Stats, GitscribeError> {
        fetch_stats(source, &self.diff_range())
    }
}

impl PartialEq for Commit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Commit {}

impl Hash for Commit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
