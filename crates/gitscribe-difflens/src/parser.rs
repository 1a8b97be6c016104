use std::fmt;

use gitscribe_core::{Blob, ChangeType, FileMode, GitscribeError, Hunk};
use serde::Serialize;
use tracing::{debug, trace};

/// Source and destination paths of a detected rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rename {
    /// Path before the rename.
    pub from: String,
    /// Path after the rename.
    pub to: String,
}

/// One file-level change parsed from `git diff -M --full-index` output.
///
/// Fields are read through accessors; a `Diff` is never modified after
/// [`parse_diff`] builds it.
///
/// # Examples
///
/// ```
/// use gitscribe_difflens::parser::parse_diff;
///
/// let text = "diff --git a/.gitignore b/.gitignore\n\
///             index 4ebc8aea50e0a67e000ba29a30809d0a7b9b2666..2dd02534615434d88c51307beb0f0092f21fd103 100644\n\
///             --- a/.gitignore\n\
///             +++ b/.gitignore\n\
///             @@ -1 +1,2 @@\n \
///             coverage\n\
///             +pkg\n";
/// let diffs = parse_diff(text).unwrap();
/// assert_eq!(diffs.len(), 1);
/// assert_eq!(diffs[0].a_blob().unwrap().path, ".gitignore");
/// assert_eq!(diffs[0].diff(), "--- a/.gitignore\n+++ b/.gitignore\n@@ -1 +1,2 @@\n coverage\n+pkg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    a_path: String,
    b_path: String,
    a_blob: Option<Blob>,
    b_blob: Option<Blob>,
    a_mode: Option<FileMode>,
    b_mode: Option<FileMode>,
    new_file: bool,
    deleted_file: bool,
    rename: Option<Rename>,
    similarity: Option<u8>,
    binary: bool,
    hunks: Vec<Hunk>,
    diff: String,
}

impl Diff {
    /// Path on the old side, from the entry header.
    pub fn a_path(&self) -> &str {
        &self.a_path
    }

    /// Path on the new side, from the entry header.
    pub fn b_path(&self) -> &str {
        &self.b_path
    }

    /// The path this change is best known by: the old path for deletions,
    /// the new path otherwise.
    pub fn path(&self) -> &str {
        if self.deleted_file {
            &self.a_path
        } else {
            &self.b_path
        }
    }

    /// Content before the change. Absent for new files and for entries with
    /// no `index` line (mode-only changes, identical-content renames).
    pub fn a_blob(&self) -> Option<&Blob> {
        self.a_blob.as_ref()
    }

    /// Content after the change. Absent for deletions and for entries with
    /// no `index` line.
    pub fn b_blob(&self) -> Option<&Blob> {
        self.b_blob.as_ref()
    }

    /// Mode before the change.
    pub fn a_mode(&self) -> Option<FileMode> {
        self.a_mode
    }

    /// Mode after the change.
    pub fn b_mode(&self) -> Option<FileMode> {
        self.b_mode
    }

    /// The file did not exist before the change.
    pub fn new_file(&self) -> bool {
        self.new_file
    }

    /// The file does not exist after the change.
    pub fn deleted_file(&self) -> bool {
        self.deleted_file
    }

    /// The change was reported as a rename.
    pub fn renamed(&self) -> bool {
        self.rename.is_some()
    }

    /// Rename details, when [`Diff::renamed`] is `true`.
    pub fn rename(&self) -> Option<&Rename> {
        self.rename.as_ref()
    }

    /// Path before the rename.
    pub fn rename_from(&self) -> Option<&str> {
        self.rename.as_ref().map(|r| r.from.as_str())
    }

    /// Path after the rename.
    pub fn rename_to(&self) -> Option<&str> {
        self.rename.as_ref().map(|r| r.to.as_str())
    }

    /// Similarity percentage reported for renames and copies.
    pub fn similarity(&self) -> Option<u8> {
        self.similarity
    }

    /// The entry carries a binary marker instead of text hunks.
    pub fn binary(&self) -> bool {
        self.binary
    }

    /// Parsed hunk ranges and counts, in order.
    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    /// The raw body from the `---` line onwards, without a trailing newline.
    /// Empty when the entry has no body.
    pub fn diff(&self) -> &str {
        &self.diff
    }

    /// `+` lines across all hunks.
    pub fn insertions(&self) -> u64 {
        self.hunks.iter().map(|h| h.insertions).sum()
    }

    /// `-` lines across all hunks.
    pub fn deletions(&self) -> u64 {
        self.hunks.iter().map(|h| h.deletions).sum()
    }

    /// Classify the change.
    pub fn change_type(&self) -> ChangeType {
        if self.new_file {
            ChangeType::Add
        } else if self.deleted_file {
            ChangeType::Delete
        } else if self.rename.is_some() {
            ChangeType::Rename
        } else if self.diff.is_empty() && self.a_mode != self.b_mode {
            ChangeType::ModeChange
        } else {
            ChangeType::Modify
        }
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.change_type();
        match (&self.rename, kind) {
            (Some(rename), _) => write!(f, "{kind} {} -> {}", rename.from, rename.to)?,
            (None, ChangeType::ModeChange) => {
                let old = self.a_mode.map(|m| m.to_string()).unwrap_or_default();
                let new = self.b_mode.map(|m| m.to_string()).unwrap_or_default();
                write!(f, "{kind} {} {old} -> {new}", self.path())?
            }
            (None, _) => write!(f, "{kind} {}", self.path())?,
        }
        if self.binary {
            write!(f, " (binary)")
        } else if !self.hunks.is_empty() {
            write!(
                f,
                " (+{} -{}, {} hunks)",
                self.insertions(),
                self.deletions(),
                self.hunks.len()
            )
        } else {
            Ok(())
        }
    }
}

/// Parse the output of `git diff -M --full-index` (or `git show` of one
/// commit with the same options) into [`Diff`] entries, in input order.
///
/// Text before the first `diff --git` line is skipped, so a commit header
/// printed by `git show` is accepted and a commit with no changes yields an
/// empty vector.
///
/// # Errors
///
/// Returns [`GitscribeError::MalformedDiff`] with the offending line number if
/// an entry's header or hunk sequence is not recognised. Parsing stops at the
/// first error.
///
/// # Examples
///
/// ```
/// use gitscribe_difflens::parser::parse_diff;
///
/// assert!(parse_diff("").unwrap().is_empty());
/// ```
pub fn parse_diff(input: &str) -> Result<Vec<Diff>, GitscribeError> {
    let mut diffs = Vec::new();
    let mut current: Option<EntryBuilder<'_>> = None;

    let body = input.strip_suffix('\n').unwrap_or(input);
    for (idx, line) in body.split('\n').enumerate() {
        let line_no = idx + 1;

        if let Some(rest) = line.strip_prefix("diff --git ") {
            if let Some(entry) = current.take() {
                diffs.push(entry.finish()?);
            }
            current = Some(EntryBuilder::new(rest, line_no)?);
            continue;
        }

        match current.as_mut() {
            Some(entry) => entry.push(line, line_no)?,
            None => trace!(line = line_no, "skipping diff preamble"),
        }
    }

    if let Some(entry) = current.take() {
        diffs.push(entry.finish()?);
    }

    debug!(entries = diffs.len(), "parsed diff");
    Ok(diffs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Extended header lines between `diff --git` and the body.
    Header,
    /// Saw `---`, the next line must be `+++`.
    ExpectNewPath,
    /// Hunks.
    Body,
    /// Binary marker or patch data, kept verbatim.
    Binary,
}

struct IndexLine {
    a_id: String,
    b_id: String,
    mode: Option<FileMode>,
}

struct EntryBuilder<'a> {
    start_line: usize,
    a_path: String,
    b_path: String,
    old_mode: Option<FileMode>,
    new_mode: Option<FileMode>,
    new_file: bool,
    deleted_file: bool,
    rename_from: Option<String>,
    rename_to: Option<String>,
    similarity: Option<u8>,
    index: Option<IndexLine>,
    section: Section,
    binary: bool,
    hunks: Vec<Hunk>,
    body: Vec<&'a str>,
}

impl<'a> EntryBuilder<'a> {
    fn new(header: &str, line_no: usize) -> Result<Self, GitscribeError> {
        let (a_path, b_path) = split_header_paths(header.trim_end_matches('\r')).ok_or_else(|| {
            GitscribeError::MalformedDiff {
                line: line_no,
                reason: format!("cannot split paths in `diff --git {header}`"),
            }
        })?;

        Ok(Self {
            start_line: line_no,
            a_path,
            b_path,
            old_mode: None,
            new_mode: None,
            new_file: false,
            deleted_file: false,
            rename_from: None,
            rename_to: None,
            similarity: None,
            index: None,
            section: Section::Header,
            binary: false,
            hunks: Vec::new(),
            body: Vec::new(),
        })
    }

    fn push(&mut self, line: &'a str, line_no: usize) -> Result<(), GitscribeError> {
        match self.section {
            Section::Header => self.push_header(line, line_no),
            Section::ExpectNewPath => {
                let Some(path) = line.strip_prefix("+++ ") else {
                    return Err(malformed(line_no, "expected `+++` after `---`"));
                };
                if is_dev_null(path) {
                    self.deleted_file = true;
                } else {
                    self.b_path = parse_path(path);
                }
                self.body.push(line);
                self.section = Section::Body;
                Ok(())
            }
            Section::Body => self.push_body(line, line_no),
            Section::Binary => {
                self.body.push(line);
                Ok(())
            }
        }
    }

    fn push_header(&mut self, line: &'a str, line_no: usize) -> Result<(), GitscribeError> {
        let l = line.trim_end_matches('\r');

        if l.is_empty() {
            return Ok(());
        }

        if let Some(v) = l.strip_prefix("old mode ") {
            self.old_mode = Some(parse_mode(v, line_no)?);
        } else if let Some(v) = l.strip_prefix("new mode ") {
            self.new_mode = Some(parse_mode(v, line_no)?);
        } else if let Some(v) = l.strip_prefix("new file mode ") {
            self.new_file = true;
            self.new_mode = Some(parse_mode(v, line_no)?);
        } else if let Some(v) = l.strip_prefix("deleted file mode ") {
            self.deleted_file = true;
            self.old_mode = Some(parse_mode(v, line_no)?);
        } else if let Some(v) = l.strip_prefix("similarity index ") {
            self.similarity = Some(parse_percent(v, line_no)?);
        } else if let Some(v) = l.strip_prefix("dissimilarity index ") {
            parse_percent(v, line_no)?;
        } else if let Some(v) = l.strip_prefix("rename from ") {
            self.rename_from = Some(unquote(v).to_string());
        } else if let Some(v) = l.strip_prefix("rename to ") {
            self.rename_to = Some(unquote(v).to_string());
        } else if let Some(v) = l.strip_prefix("copy from ") {
            self.a_path = unquote(v).to_string();
        } else if let Some(v) = l.strip_prefix("copy to ") {
            self.b_path = unquote(v).to_string();
        } else if let Some(v) = l.strip_prefix("index ") {
            self.index = Some(parse_index(v, line_no)?);
        } else if let Some(path) = l.strip_prefix("--- ") {
            if is_dev_null(path) {
                self.new_file = true;
            } else {
                self.a_path = parse_path(path);
            }
            self.body.push(line);
            self.section = Section::ExpectNewPath;
        } else if l.starts_with("Binary files ") || l == "GIT binary patch" {
            self.binary = true;
            self.body.push(line);
            self.section = Section::Binary;
        } else {
            return Err(malformed(
                line_no,
                &format!("unexpected line in diff header: `{l}`"),
            ));
        }
        Ok(())
    }

    fn push_body(&mut self, line: &'a str, line_no: usize) -> Result<(), GitscribeError> {
        if line.starts_with("@@") {
            let (old_start, old_lines, new_start, new_lines) = parse_hunk_header(line, line_no)?;
            self.hunks.push(Hunk {
                old_start,
                old_lines,
                new_start,
                new_lines,
                insertions: 0,
                deletions: 0,
            });
            self.body.push(line);
            return Ok(());
        }

        match line.as_bytes().first().copied() {
            None | Some(b'\\') => {}
            Some(b'+') | Some(b'-') | Some(b' ') => {
                let Some(hunk) = self.hunks.last_mut() else {
                    return Err(malformed(line_no, "content line before first hunk header"));
                };
                match line.as_bytes()[0] {
                    b'+' => hunk.insertions += 1,
                    b'-' => hunk.deletions += 1,
                    _ => {}
                }
            }
            Some(_) => {
                return Err(malformed(
                    line_no,
                    &format!("unexpected line in hunk body: `{line}`"),
                ));
            }
        }
        self.body.push(line);
        Ok(())
    }

    fn finish(mut self) -> Result<Diff, GitscribeError> {
        if self.section == Section::ExpectNewPath {
            return Err(malformed(self.start_line, "`---` line without `+++` line"));
        }
        if self.new_file && self.deleted_file {
            return Err(malformed(
                self.start_line,
                "entry is marked both new and deleted",
            ));
        }

        let rename = match (self.rename_from.take(), self.rename_to.take()) {
            (None, None) => None,
            (Some(from), Some(to)) => {
                if from.is_empty() || to.is_empty() || from == to {
                    return Err(malformed(
                        self.start_line,
                        &format!("invalid rename `{from}` -> `{to}`"),
                    ));
                }
                self.a_path = from.clone();
                self.b_path = to.clone();
                Some(Rename { from, to })
            }
            _ => {
                return Err(malformed(
                    self.start_line,
                    "`rename from` and `rename to` must appear together",
                ));
            }
        };

        let index_mode = self.index.as_ref().and_then(|ix| ix.mode);
        let a_mode = if self.new_file {
            None
        } else {
            self.old_mode.or(index_mode)
        };
        let b_mode = if self.deleted_file {
            None
        } else {
            self.new_mode.or(index_mode)
        };

        let (a_blob, b_blob) = match self.index.take() {
            Some(ix) => {
                let a_blob = (!self.new_file).then(|| Blob {
                    path: self.a_path.clone(),
                    id: ix.a_id,
                    mode: a_mode,
                });
                let b_blob = (!self.deleted_file).then(|| Blob {
                    path: self.b_path.clone(),
                    id: ix.b_id,
                    mode: b_mode,
                });
                (a_blob, b_blob)
            }
            None if self.new_file || self.deleted_file => {
                return Err(malformed(
                    self.start_line,
                    "new or deleted file without an `index` line",
                ));
            }
            // Mode-only changes and identical-content renames carry no ids.
            None => (None, None),
        };

        while self.body.last().is_some_and(|l| l.trim_end_matches('\r').is_empty()) {
            self.body.pop();
        }

        Ok(Diff {
            a_path: self.a_path,
            b_path: self.b_path,
            a_blob,
            b_blob,
            a_mode,
            b_mode,
            new_file: self.new_file,
            deleted_file: self.deleted_file,
            rename,
            similarity: self.similarity,
            binary: self.binary,
            hunks: self.hunks,
            diff: self.body.join("\n"),
        })
    }
}

fn malformed(line: usize, reason: &str) -> GitscribeError {
    GitscribeError::MalformedDiff {
        line,
        reason: reason.to_string(),
    }
}

/// Split `a/<path> b/<path>` from a `diff --git` line.
///
/// Paths may contain spaces, so the symmetric split (both sides equal) is
/// tried first, then the last ` b/` occurrence.
fn split_header_paths(rest: &str) -> Option<(String, String)> {
    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"')?;
        let a = &quoted[..end];
        let b = unquote(quoted[end + 1..].trim_start());
        return Some((strip_side(a, "a/")?, strip_side(b, "b/")?));
    }

    if rest.len() % 2 == 1 {
        let mid = rest.len() / 2;
        if rest.is_char_boundary(mid) && rest.as_bytes()[mid] == b' ' {
            if let (Some(a), Some(b)) = (
                rest[..mid].strip_prefix("a/"),
                rest[mid + 1..].strip_prefix("b/"),
            ) {
                if a == b {
                    return Some((a.to_string(), b.to_string()));
                }
            }
        }
    }

    let b_pos = rest.rfind(" b/")?;
    let a = strip_side(&rest[..b_pos], "a/")?;
    let b = strip_side(unquote(&rest[b_pos + 1..]), "b/")?;
    Some((a, b))
}

fn strip_side(path: &str, prefix: &str) -> Option<String> {
    path.strip_prefix(prefix).map(str::to_string)
}

fn unquote(raw: &str) -> &str {
    raw.trim_matches('"')
}

fn is_dev_null(raw: &str) -> bool {
    raw.split('\t').next().map(str::trim_end) == Some("/dev/null")
}

/// Path from a `---` / `+++` line, without the `a/` / `b/` prefix or any
/// tab-separated suffix.
fn parse_path(raw: &str) -> String {
    let raw = raw.split('\t').next().unwrap_or(raw).trim_end_matches('\r');
    let normalized = unquote(raw);

    normalized
        .strip_prefix("a/")
        .or_else(|| normalized.strip_prefix("b/"))
        .unwrap_or(normalized)
        .to_string()
}

fn parse_mode(raw: &str, line_no: usize) -> Result<FileMode, GitscribeError> {
    raw.trim()
        .parse()
        .map_err(|e: String| malformed(line_no, &e))
}

fn parse_percent(raw: &str, line_no: usize) -> Result<u8, GitscribeError> {
    raw.trim()
        .strip_suffix('%')
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| *n <= 100)
        .ok_or_else(|| malformed(line_no, &format!("invalid percentage `{raw}`")))
}

/// `index <a-id>..<b-id>[ <mode>]`
fn parse_index(raw: &str, line_no: usize) -> Result<IndexLine, GitscribeError> {
    let (ids, mode) = match raw.trim().split_once(' ') {
        Some((ids, mode)) => (ids, Some(parse_mode(mode, line_no)?)),
        None => (raw.trim(), None),
    };
    let (a_id, b_id) = ids
        .split_once("..")
        .filter(|(a, b)| is_object_id(a) && is_object_id(b))
        .ok_or_else(|| malformed(line_no, &format!("invalid index line `index {raw}`")))?;

    Ok(IndexLine {
        a_id: a_id.to_string(),
        b_id: b_id.to_string(),
        mode,
    })
}

fn is_object_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_hunk_header(line: &str, line_no: usize) -> Result<(u32, u32, u32, u32), GitscribeError> {
    let invalid = || malformed(line_no, &format!("invalid hunk header: `{line}`"));

    let inner = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some(&s[..end])
        })
        .ok_or_else(invalid)?;

    let parts: Vec<&str> = inner.split(' ').collect();
    if parts.len() != 2 {
        return Err(invalid());
    }

    let old = parts[0].strip_prefix('-').ok_or_else(invalid)?;
    let new = parts[1].strip_prefix('+').ok_or_else(invalid)?;

    let (old_start, old_lines) = parse_range(old).ok_or_else(invalid)?;
    let (new_start, new_lines) = parse_range(new).ok_or_else(invalid)?;

    Ok((old_start, old_lines, new_start, new_lines))
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    if let Some((start, count)) = range.split_once(',') {
        Some((start.parse().ok()?, count.parse().ok()?))
    } else {
        Some((range.parse().ok()?, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A_ID: &str = "4ebc8aea50e0a67e000ba29a30809d0a7b9b2666";
    const B_ID: &str = "2dd02534615434d88c51307beb0f0092f21fd103";

    #[test]
    fn empty_diff_returns_empty_vec() {
        assert!(parse_diff("").unwrap().is_empty());
        assert!(parse_diff("\n").unwrap().is_empty());
    }

    #[test]
    fn single_file_single_hunk() {
        let diff = format!(
            "\
diff --git a/src/main.rs b/src/main.rs
index {A_ID}..{B_ID} 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,3 +1,4 @@
 fn main() {{
+    println!(\"hello\");
     let x = 1;
 }}
"
        );
        let files = parse_diff(&diff).unwrap();
        assert_eq!(files.len(), 1);
        let file = &files[0];
        assert_eq!(file.path(), "src/main.rs");
        assert_eq!(file.hunks().len(), 1);
        assert_eq!(file.hunks()[0].old_start, 1);
        assert_eq!(file.hunks()[0].old_lines, 3);
        assert_eq!(file.hunks()[0].new_lines, 4);
        assert_eq!(file.insertions(), 1);
        assert_eq!(file.deletions(), 0);
        assert_eq!(file.change_type(), ChangeType::Modify);
        assert_eq!(file.a_blob().unwrap().id, A_ID);
        assert_eq!(file.b_blob().unwrap().id, B_ID);
        assert_eq!(file.b_mode().unwrap().bits(), 0o100644);
        assert!(file.diff().ends_with(" }"));
    }

    #[test]
    fn multiple_files_keep_order() {
        let diff = format!(
            "\
diff --git a/a.rs b/a.rs
index {A_ID}..{B_ID} 100644
--- a/a.rs
+++ b/a.rs
@@ -1 +1,2 @@
 line1
+line2
diff --git a/b.rs b/b.rs
index {B_ID}..{A_ID} 100644
--- a/b.rs
+++ b/b.rs
@@ -1,2 +1 @@
 line1
-line2
"
        );
        let files = parse_diff(&diff).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path(), "a.rs");
        assert_eq!(files[1].path(), "b.rs");
        assert_eq!(files[0].diff(), "--- a/a.rs\n+++ b/a.rs\n@@ -1 +1,2 @@\n line1\n+line2");
        assert_eq!(files[1].deletions(), 1);
    }

    #[test]
    fn new_file_has_no_a_blob() {
        let diff = format!(
            "\
diff --git a/new.rs b/new.rs
new file mode 100644
index 0000000000000000000000000000000000000000..{B_ID}
--- /dev/null
+++ b/new.rs
@@ -0,0 +1,2 @@
+fn hello() {{
+}}
"
        );
        let files = parse_diff(&diff).unwrap();
        let file = &files[0];
        assert!(file.new_file());
        assert!(!file.deleted_file());
        assert!(file.a_blob().is_none());
        assert!(file.a_mode().is_none());
        assert_eq!(file.b_blob().unwrap().path, "new.rs");
        assert_eq!(file.b_blob().unwrap().mode, Some(FileMode::new(0o100644)));
        assert_eq!(file.change_type(), ChangeType::Add);
    }

    #[test]
    fn deleted_file_has_no_b_blob() {
        let diff = format!(
            "\
diff --git a/old.rs b/old.rs
deleted file mode 100755
index {A_ID}..0000000000000000000000000000000000000000
--- a/old.rs
+++ /dev/null
@@ -1 +0,0 @@
-gone
"
        );
        let files = parse_diff(&diff).unwrap();
        let file = &files[0];
        assert!(file.deleted_file());
        assert!(file.b_blob().is_none());
        assert!(file.b_mode().is_none());
        assert_eq!(file.a_blob().unwrap().id, A_ID);
        assert!(file.a_mode().unwrap().is_executable());
        assert_eq!(file.path(), "old.rs");
    }

    #[test]
    fn mode_only_change_has_no_blobs() {
        let diff = "\
diff --git a/bin/run b/bin/run
old mode 100644
new mode 100755
";
        let files = parse_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        let file = &files[0];
        assert!(file.a_blob().is_none());
        assert!(file.b_blob().is_none());
        assert_eq!(file.a_mode(), Some(FileMode::new(0o100644)));
        assert_eq!(file.b_mode(), Some(FileMode::new(0o100755)));
        assert!(!file.new_file());
        assert!(!file.deleted_file());
        assert_eq!(file.diff(), "");
        assert_eq!(file.path(), "bin/run");
        assert_eq!(file.change_type(), ChangeType::ModeChange);
        assert_eq!(file.to_string(), "T bin/run 100644 -> 100755");
    }

    #[test]
    fn mode_change_with_content_keeps_blobs() {
        let diff = format!(
            "\
diff --git a/run.sh b/run.sh
old mode 100644
new mode 100755
index {A_ID}..{B_ID}
--- a/run.sh
+++ b/run.sh
@@ -1 +1 @@
-echo hi
+echo hello
"
        );
        let file = &parse_diff(&diff).unwrap()[0];
        assert_eq!(file.a_blob().unwrap().mode, Some(FileMode::new(0o100644)));
        assert_eq!(file.b_blob().unwrap().mode, Some(FileMode::new(0o100755)));
        assert_eq!(file.change_type(), ChangeType::Modify);
    }

    #[test]
    fn identical_rename_has_empty_body() {
        let diff = "\
diff --git a/AUTHORS b/CONTRIBUTORS
similarity index 100%
rename from AUTHORS
rename to CONTRIBUTORS
";
        let files = parse_diff(diff).unwrap();
        let file = &files[0];
        assert!(file.renamed());
        assert_eq!(file.rename_from(), Some("AUTHORS"));
        assert_eq!(file.rename_to(), Some("CONTRIBUTORS"));
        assert_eq!(file.similarity(), Some(100));
        assert_eq!(file.diff(), "");
        assert_eq!(file.to_string(), "R AUTHORS -> CONTRIBUTORS");
    }

    #[test]
    fn rename_with_edit_populates_blobs() {
        let diff = format!(
            "\
diff --git a/lib/old.rb b/lib/new.rb
similarity index 90%
rename from lib/old.rb
rename to lib/new.rb
index {A_ID}..{B_ID} 100644
--- a/lib/old.rb
+++ b/lib/new.rb
@@ -1 +1 @@
-a
+b
"
        );
        let file = &parse_diff(&diff).unwrap()[0];
        assert!(file.renamed());
        assert_eq!(file.a_blob().unwrap().path, "lib/old.rb");
        assert_eq!(file.b_blob().unwrap().path, "lib/new.rb");
        assert_eq!(file.similarity(), Some(90));
    }

    #[test]
    fn rename_to_same_path_is_rejected() {
        let diff = "\
diff --git a/x b/x
rename from x
rename to x
";
        let err = parse_diff(diff).unwrap_err();
        assert!(matches!(err, GitscribeError::MalformedDiff { line: 1, .. }));
    }

    #[test]
    fn binary_file_is_kept_with_marker() {
        let diff = format!(
            "\
diff --git a/image.png b/image.png
index {A_ID}..{B_ID} 100644
Binary files a/image.png and b/image.png differ
diff --git a/code.rs b/code.rs
index {A_ID}..{B_ID} 100644
--- a/code.rs
+++ b/code.rs
@@ -1 +1,2 @@
 line1
+line2
"
        );
        let files = parse_diff(&diff).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].binary());
        assert!(files[0].hunks().is_empty());
        assert_eq!(files[0].diff(), "Binary files a/image.png and b/image.png differ");
        assert_eq!(files[1].path(), "code.rs");
        assert!(!files[1].binary());
    }

    #[test]
    fn no_newline_marker_is_kept_but_not_counted() {
        let diff = format!(
            "\
diff --git a/f.rs b/f.rs
index {A_ID}..{B_ID} 100644
--- a/f.rs
+++ b/f.rs
@@ -1 +1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file
"
        );
        let file = &parse_diff(&diff).unwrap()[0];
        assert!(file.diff().contains("No newline"));
        assert_eq!(file.insertions(), 1);
        assert_eq!(file.deletions(), 1);
    }

    #[test]
    fn show_preamble_is_skipped() {
        let diff = format!(
            "\
commit 634396b2f541a9f2d58b00be1a07f0c358b999b3
tree b4b2b4a8dbb9d4e3cbed3d9ec0b4d7d1c0d3a5c8
author Tom Preston-Werner <tom@mojombo.com> 1191999972 -0700
committer Tom Preston-Werner <tom@mojombo.com> 1191999972 -0700

    initial

diff --git a/README b/README
new file mode 100644
index 0000000000000000000000000000000000000000..{B_ID}
--- /dev/null
+++ b/README
@@ -0,0 +1 @@
+hi
"
        );
        let files = parse_diff(&diff).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].new_file());
    }

    #[test]
    fn header_only_show_output_is_empty() {
        let text = "\
commit 634396b2f541a9f2d58b00be1a07f0c358b999b3
tree b4b2b4a8dbb9d4e3cbed3d9ec0b4d7d1c0d3a5c8
author Tom Preston-Werner <tom@mojombo.com> 1191999972 -0700
committer Tom Preston-Werner <tom@mojombo.com> 1191999972 -0700

    empty commit
";
        assert!(parse_diff(text).unwrap().is_empty());
    }

    #[test]
    fn unknown_header_line_is_malformed() {
        let diff = "\
diff --git a/f b/f
frobnicate 12
";
        let err = parse_diff(diff).unwrap_err();
        assert!(matches!(err, GitscribeError::MalformedDiff { line: 2, .. }));
    }

    #[test]
    fn missing_plus_line_is_malformed() {
        let diff = format!(
            "\
diff --git a/f b/f
index {A_ID}..{B_ID} 100644
--- a/f
@@ -1 +1 @@
"
        );
        let err = parse_diff(&diff).unwrap_err();
        assert!(matches!(err, GitscribeError::MalformedDiff { line: 4, .. }));
    }

    #[test]
    fn bad_hunk_header_is_malformed() {
        let diff = format!(
            "\
diff --git a/f b/f
index {A_ID}..{B_ID} 100644
--- a/f
+++ b/f
@@ -x +1 @@
"
        );
        let err = parse_diff(&diff).unwrap_err();
        assert_eq!(err.line(), Some(5));
    }

    #[test]
    fn content_before_hunk_is_malformed() {
        let diff = format!(
            "\
diff --git a/f b/f
index {A_ID}..{B_ID} 100644
--- a/f
+++ b/f
+orphan
"
        );
        assert!(parse_diff(&diff).is_err());
    }

    #[test]
    fn new_file_without_index_is_malformed() {
        let diff = "\
diff --git a/f b/f
new file mode 100644
";
        assert!(matches!(
            parse_diff(diff),
            Err(GitscribeError::MalformedDiff { line: 1, .. })
        ));
    }

    #[test]
    fn empty_new_file_has_blob_and_empty_body() {
        let diff = "\
diff --git a/.keep b/.keep
new file mode 100644
index 0000000000000000000000000000000000000000..e69de29bb2d1d6434b8b29ae775ad8c2e48c5391
";
        let file = &parse_diff(diff).unwrap()[0];
        assert!(file.new_file());
        assert_eq!(
            file.b_blob().unwrap().id,
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
        assert_eq!(file.diff(), "");
    }

    #[test]
    fn header_paths_with_spaces() {
        assert_eq!(
            split_header_paths("a/my file.rs b/my file.rs"),
            Some(("my file.rs".to_string(), "my file.rs".to_string()))
        );
        assert_eq!(
            split_header_paths("a/old name b/new name"),
            Some(("old name".to_string(), "new name".to_string()))
        );
        assert_eq!(
            split_header_paths("\"a/q f\" \"b/q f\""),
            Some(("q f".to_string(), "q f".to_string()))
        );
        assert_eq!(split_header_paths("nonsense"), None);
    }

    #[test]
    fn parse_path_handles_quotes_and_tabs() {
        assert_eq!(parse_path("\"a/src/my file.rs\""), "src/my file.rs");
        assert_eq!(parse_path("b/src/my file.rs\t"), "src/my file.rs");
    }

    #[test]
    fn index_line_without_mode() {
        let ix = parse_index(&format!("{A_ID}..{B_ID}"), 1).unwrap();
        assert_eq!(ix.a_id, A_ID);
        assert!(ix.mode.is_none());
        assert!(parse_index("abc,def..123", 1).is_err());
    }

    #[test]
    fn hunk_header_without_counts() {
        assert_eq!(parse_hunk_header("@@ -1 +1,2 @@", 1).unwrap(), (1, 1, 1, 2));
        assert_eq!(
            parse_hunk_header("@@ -10,3 +11,4 @@ fn ctx()", 1).unwrap(),
            (10, 3, 11, 4)
        );
    }
}
