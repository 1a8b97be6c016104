//! Commit record parsing for `--pretty=raw` output.
//!
//! A record is a `commit <id>` line, header fields (`tree`, `parent`,
//! `author`, `committer`), a blank line, and an indented message. Lines that
//! belong to no record (bisect annotations, numstat lines, patch text) are
//! skipped between records; header fields outside a record are rejected.

use gitscribe_core::{Actor, GitscribeError, LogConfig};
use tracing::{debug, trace};

use crate::commit::{Commit, CommitDetails};

/// Parse every commit record in `input`, in input order.
///
/// Records with no `tree`, `author` or `committer` line yield stub commits
/// holding only the id and parents.
///
/// # Errors
///
/// Returns [`GitscribeError::MalformedRecord`] with the offending line number
/// when a `commit` line has no valid id, a header field appears outside a
/// record, a signature cannot be parsed, or a record has only one of
/// `author` / `committer`. Parsing stops at the first error.
///
/// # Examples
///
/// ```
/// use gitscribe_history::record::parse_commit_log;
///
/// let text = "\
/// commit 4c8124ffcf4039d292442eeccabdeca5af5c5017
/// tree 672eca9b7f9e09c22dcb128c283e8c3c8d7697a4
/// parent 634396b2f541a9f2d58b00be1a07f0c358b999b3
/// author Tom Preston-Werner <tom@mojombo.com> 1191999972 -0700
/// committer Tom Preston-Werner <tom@mojombo.com> 1191999972 -0700
///
///     implement Grit#heads
/// ";
/// let commits = parse_commit_log(text).unwrap();
/// assert_eq!(commits.len(), 1);
/// assert_eq!(commits[0].id(), "4c8124ffcf4039d292442eeccabdeca5af5c5017");
/// assert_eq!(commits[0].details().unwrap().message, "implement Grit#heads");
/// ```
pub fn parse_commit_log(input: &str) -> Result<Vec<Commit>, GitscribeError> {
    parse_commit_log_with(input, &LogConfig::default())
}

/// [`parse_commit_log`] with explicit configuration.
pub fn parse_commit_log_with(
    input: &str,
    config: &LogConfig,
) -> Result<Vec<Commit>, GitscribeError> {
    let indent = " ".repeat(config.message_indent);
    let mut commits = Vec::new();
    let mut current: Option<RecordBuilder> = None;

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(rest) = line.strip_prefix("commit ") {
            if let Some(record) = current.take() {
                commits.push(record.finish()?);
            }
            current = Some(RecordBuilder::new(rest, line_no)?);
            continue;
        }

        match current.as_mut() {
            Some(record) if record.section != Section::Trailer => {
                record.push(line, line_no, &indent)?;
            }
            _ => skip_outside_record(line, line_no)?,
        }
    }

    if let Some(record) = current.take() {
        commits.push(record.finish()?);
    }

    debug!(commits = commits.len(), "parsed commit log");
    Ok(commits)
}

/// Parse text that must hold exactly one record for `id`.
///
/// Used when baking a stub: the fetched record has to be complete and has to
/// describe the commit that asked for it.
///
/// # Errors
///
/// Returns [`GitscribeError::MalformedRecord`] if the text holds no record,
/// more than one, a record for another id, or a record without signatures.
pub fn parse_single_record(input: &str, id: &str) -> Result<Commit, GitscribeError> {
    let mut commits = parse_commit_log(input)?;
    if commits.len() != 1 {
        return Err(GitscribeError::MalformedRecord {
            line: 1,
            reason: format!("expected one record for {id}, found {}", commits.len()),
        });
    }
    let commit = commits.remove(0);
    if commit.id() != id {
        return Err(GitscribeError::MalformedRecord {
            line: 1,
            reason: format!("expected record for {id}, got {}", commit.id()),
        });
    }
    if !commit.is_baked() {
        return Err(GitscribeError::MalformedRecord {
            line: 1,
            reason: format!("record for {id} has no author or committer"),
        });
    }
    Ok(commit)
}

/// Header keywords; seeing one outside a record means its `commit` line is
/// missing.
const HEADER_FIELDS: [&str; 4] = ["tree ", "parent ", "author ", "committer "];

fn skip_outside_record(line: &str, line_no: usize) -> Result<(), GitscribeError> {
    if HEADER_FIELDS.iter().any(|field| line.starts_with(field)) {
        return Err(GitscribeError::MalformedRecord {
            line: line_no,
            reason: "header field outside a record (missing `commit` line)".into(),
        });
    }
    if !line.trim().is_empty() {
        trace!(line = line_no, "skipping line between records");
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Message,
    /// The message has ended; lines up to the next `commit` belong to no record.
    Trailer,
}

struct RecordBuilder {
    start_line: usize,
    id: String,
    tree: Option<String>,
    parents: Vec<String>,
    author: Option<Actor>,
    committer: Option<Actor>,
    message: Vec<String>,
    section: Section,
}

impl RecordBuilder {
    fn new(rest: &str, line_no: usize) -> Result<Self, GitscribeError> {
        // Anything after the id (`(dist=2)`, decorations) is annotation.
        let id = rest.split_whitespace().next().unwrap_or_default();
        if !is_full_id(id) {
            return Err(GitscribeError::MalformedRecord {
                line: line_no,
                reason: format!("`commit` line without a 40-hex id: `commit {rest}`"),
            });
        }

        Ok(Self {
            start_line: line_no,
            id: id.to_string(),
            tree: None,
            parents: Vec::new(),
            author: None,
            committer: None,
            message: Vec::new(),
            section: Section::Header,
        })
    }

    fn push(&mut self, line: &str, line_no: usize, indent: &str) -> Result<(), GitscribeError> {
        match self.section {
            Section::Header => self.push_header(line, line_no),
            Section::Message => {
                if let Some(text) = line.strip_prefix(indent) {
                    self.message.push(text.to_string());
                } else if line.trim().is_empty() {
                    self.message.push(String::new());
                } else {
                    self.section = Section::Trailer;
                    skip_outside_record(line, line_no)?;
                }
                Ok(())
            }
            Section::Trailer => skip_outside_record(line, line_no),
        }
    }

    fn push_header(&mut self, line: &str, line_no: usize) -> Result<(), GitscribeError> {
        let malformed = |reason: String| GitscribeError::MalformedRecord {
            line: line_no,
            reason,
        };

        if line.is_empty() {
            self.section = Section::Message;
        } else if let Some(tree) = line.strip_prefix("tree ") {
            if !is_full_id(tree) {
                return Err(malformed(format!("invalid tree id `{tree}`")));
            }
            self.tree = Some(tree.to_string());
        } else if let Some(parent) = line.strip_prefix("parent ") {
            if !is_full_id(parent) {
                return Err(malformed(format!("invalid parent id `{parent}`")));
            }
            self.parents.push(parent.to_string());
        } else if let Some(sig) = line.strip_prefix("author ") {
            let actor = Actor::from_signature(sig)
                .ok_or_else(|| malformed(format!("unparseable author `{sig}`")))?;
            self.author = Some(actor);
        } else if let Some(sig) = line.strip_prefix("committer ") {
            let actor = Actor::from_signature(sig)
                .ok_or_else(|| malformed(format!("unparseable committer `{sig}`")))?;
            self.committer = Some(actor);
        } else if line.starts_with(' ') || is_extra_header(line) {
            // encoding, gpgsig, mergetag and their continuation lines
            trace!(line = line_no, "skipping extra header");
        } else if self.is_bare() {
            // A bare `commit <id>` line ends where its annotations begin.
            self.section = Section::Trailer;
            skip_outside_record(line, line_no)?;
        } else {
            return Err(malformed(format!("unexpected line in commit header: `{line}`")));
        }
        Ok(())
    }

    /// Nothing but the id (and perhaps parents) seen so far.
    fn is_bare(&self) -> bool {
        self.tree.is_none() && self.author.is_none() && self.committer.is_none()
    }

    fn finish(mut self) -> Result<Commit, GitscribeError> {
        while self.message.last().is_some_and(|l| l.trim().is_empty()) {
            self.message.pop();
        }

        match (self.author, self.committer) {
            (Some(author), Some(committer)) => Ok(Commit::baked(
                self.id,
                self.parents,
                CommitDetails {
                    tree: self.tree,
                    author,
                    committer,
                    message: self.message.join("\n"),
                },
            )),
            (None, None) if self.tree.is_none() && self.message.is_empty() => {
                Ok(Commit::with_parents(self.id, self.parents))
            }
            (None, _) => Err(GitscribeError::MalformedRecord {
                line: self.start_line,
                reason: format!("record {} has no author line", self.id),
            }),
            (_, None) => Err(GitscribeError::MalformedRecord {
                line: self.start_line,
                reason: format!("record {} has no committer line", self.id),
            }),
        }
    }
}

fn is_full_id(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// `<keyword> <value>` with a lowercase, dash-separated keyword.
fn is_extra_header(line: &str) -> bool {
    line.split_once(' ').is_some_and(|(key, _)| {
        !key.is_empty() && key.bytes().all(|b| b.is_ascii_lowercase() || b == b'-')
    })
}
