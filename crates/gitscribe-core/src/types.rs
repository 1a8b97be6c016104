use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::GitscribeError;

/// The person and moment recorded on an `author` or `committer` line.
///
/// # Examples
///
/// ```
/// use gitscribe_core::Actor;
///
/// let actor = Actor::from_signature("Tom Preston-Werner <tom@mojombo.com> 1191999972 -0700").unwrap();
/// assert_eq!(actor.name, "Tom Preston-Werner");
/// assert_eq!(actor.email, "tom@mojombo.com");
/// assert_eq!(actor.offset, -7 * 3600);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Display name, possibly empty.
    pub name: String,
    /// Email address without the surrounding angle brackets.
    pub email: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Timezone offset in seconds east of UTC.
    pub offset: i32,
}

impl Actor {
    /// Parse the value of a signature line: `<name> <<email>> <unixtime> <tz>`.
    ///
    /// Returns `None` when the email brackets, timestamp or timezone are
    /// missing or malformed.
    pub fn from_signature(value: &str) -> Option<Self> {
        let value = value.trim_end();
        let (rest, tz) = value.rsplit_once(' ')?;
        let (ident, time) = rest.trim_end().rsplit_once(' ')?;
        let timestamp = time.parse::<i64>().ok()?;
        let offset = parse_tz_offset(tz)?;

        let ident = ident.trim_end();
        let email_start = ident.rfind('<')?;
        let email = ident[email_start + 1..].strip_suffix('>')?;
        let name = ident[..email_start].trim();

        Some(Self {
            name: name.to_string(),
            email: email.to_string(),
            timestamp,
            offset,
        })
    }

    /// The signature time in the signer's own timezone.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitscribe_core::Actor;
    ///
    /// let actor = Actor::from_signature("A U Thor <a@example.com> 0 +0130").unwrap();
    /// let dt = actor.datetime().unwrap();
    /// assert_eq!(dt.to_rfc3339(), "1970-01-01T01:30:00+01:30");
    /// ```
    pub fn datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.offset)?;
        let utc = DateTime::from_timestamp(self.timestamp, 0)?;
        Some(utc.with_timezone(&offset))
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Parse `+hhmm` / `-hhmm` into seconds east of UTC.
fn parse_tz_offset(tz: &str) -> Option<i32> {
    let (sign, digits) = match tz.as_bytes().first()? {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    Some(sign * (hours * 3600 + minutes * 60))
}

/// A git file mode such as `100644` or `100755`, stored as its integer value.
///
/// # Examples
///
/// ```
/// use gitscribe_core::FileMode;
///
/// let mode: FileMode = "100755".parse().unwrap();
/// assert!(mode.is_executable());
/// assert_eq!(mode.to_string(), "100755");
/// assert_eq!(mode.bits(), 0o100755);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct FileMode(u32);

impl FileMode {
    /// Wrap raw mode bits.
    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw mode bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Regular file with the owner execute bit set.
    pub fn is_executable(self) -> bool {
        self.0 & 0o170000 == 0o100000 && self.0 & 0o100 != 0
    }

    /// Symbolic link entry.
    pub fn is_symlink(self) -> bool {
        self.0 & 0o170000 == 0o120000
    }

    /// Gitlink (submodule) entry.
    pub fn is_submodule(self) -> bool {
        self.0 & 0o170000 == 0o160000
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.0)
    }
}

impl FromStr for FileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u32::from_str_radix(s.trim(), 8)
            .map(FileMode)
            .map_err(|_| format!("invalid file mode: {s}"))
    }
}

impl TryFrom<String> for FileMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for FileMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One side of a file-level change: where the content lived and what it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// Repository-relative path.
    pub path: String,
    /// Full object id of the content, as printed on the `index` line.
    pub id: String,
    /// File mode on this side, when the diff reported one.
    pub mode: Option<FileMode>,
}

/// A single hunk from a unified diff, reduced to its ranges and line counts.
///
/// # Examples
///
/// ```
/// use gitscribe_core::Hunk;
///
/// let hunk = Hunk {
///     old_start: 1,
///     old_lines: 1,
///     new_start: 1,
///     new_lines: 2,
///     insertions: 1,
///     deletions: 0,
/// };
/// assert_eq!(hunk.new_lines - hunk.old_lines, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version.
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version.
    pub new_lines: u32,
    /// `+` lines in the hunk body.
    pub insertions: u64,
    /// `-` lines in the hunk body.
    pub deletions: u64,
}

/// Classification of a file-level change.
///
/// # Examples
///
/// ```
/// use gitscribe_core::ChangeType;
///
/// assert_eq!(ChangeType::Rename.to_string(), "R");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    /// New file.
    Add,
    /// File removed.
    Delete,
    /// Content changed in place.
    Modify,
    /// Path changed, content possibly changed too.
    Rename,
    /// Only the file mode changed.
    ModeChange,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Add => write!(f, "A"),
            ChangeType::Delete => write!(f, "D"),
            ChangeType::Modify => write!(f, "M"),
            ChangeType::Rename => write!(f, "R"),
            ChangeType::ModeChange => write!(f, "T"),
        }
    }
}

/// Insertion and deletion counts for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    /// Lines added.
    pub insertions: u64,
    /// Lines removed.
    pub deletions: u64,
    /// `insertions + deletions`.
    pub lines: u64,
    /// Binary content; counts are always zero.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub binary: bool,
}

impl FileStats {
    /// Counts for a text file.
    ///
    /// `lines` saturates at `u64::MAX`; use [`FileStats::checked_new`] for
    /// counts read from untrusted text.
    pub fn new(insertions: u64, deletions: u64) -> Self {
        Self {
            insertions,
            deletions,
            lines: insertions.saturating_add(deletions),
            binary: false,
        }
    }

    /// Counts for a text file, or `None` if `insertions + deletions`
    /// overflows.
    pub fn checked_new(insertions: u64, deletions: u64) -> Option<Self> {
        Some(Self {
            insertions,
            deletions,
            lines: insertions.checked_add(deletions)?,
            binary: false,
        })
    }

    /// A binary file: counted as a file, never as lines.
    pub fn binary() -> Self {
        Self {
            binary: true,
            ..Self::default()
        }
    }

    /// Fold another entry for the same path into this one.
    pub fn merge(&mut self, other: FileStats) {
        self.insertions = self.insertions.saturating_add(other.insertions);
        self.deletions = self.deletions.saturating_add(other.deletions);
        self.lines = self.insertions.saturating_add(self.deletions);
        self.binary = self.binary && other.binary;
    }
}

/// Aggregate counts over every file in a [`Stats`] value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStats {
    /// Sum of per-file insertions.
    pub insertions: u64,
    /// Sum of per-file deletions.
    pub deletions: u64,
    /// `insertions + deletions`.
    pub lines: u64,
    /// Number of files.
    pub files: u64,
}

/// Per-file and total insertion/deletion counts.
///
/// The totals are always derived from the per-file map, so
/// `total.lines == total.insertions + total.deletions` and the totals equal
/// the per-file sums for every value this type can hold.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use gitscribe_core::{FileStats, Stats};
///
/// let mut files = BTreeMap::new();
/// files.insert("src/lib.rs".to_string(), FileStats::new(3, 1));
/// files.insert("logo.png".to_string(), FileStats::binary());
///
/// let stats = Stats::from_files(files);
/// assert_eq!(stats.total().insertions, 3);
/// assert_eq!(stats.total().lines, 4);
/// assert_eq!(stats.total().files, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    total: TotalStats,
    files: BTreeMap<String, FileStats>,
}

impl Stats {
    /// Build stats from per-file counts, deriving the totals.
    pub fn from_files(files: BTreeMap<String, FileStats>) -> Self {
        let mut total = TotalStats {
            files: files.len() as u64,
            ..TotalStats::default()
        };
        for file in files.values() {
            total.insertions = total.insertions.saturating_add(file.insertions);
            total.deletions = total.deletions.saturating_add(file.deletions);
        }
        total.lines = total.insertions.saturating_add(total.deletions);
        Self { total, files }
    }

    /// Build stats from independently stated totals and per-file counts.
    ///
    /// # Errors
    ///
    /// Returns [`GitscribeError::StatsMismatch`] if the stated totals disagree
    /// with the per-file sums.
    pub fn from_parts(
        total: TotalStats,
        files: BTreeMap<String, FileStats>,
    ) -> Result<Self, GitscribeError> {
        let stats = Self::from_files(files);
        stats.reconcile(&total)?;
        Ok(stats)
    }

    /// Check independently stated totals against the per-file sums.
    ///
    /// # Errors
    ///
    /// Returns [`GitscribeError::StatsMismatch`] naming the first field that
    /// disagrees.
    pub fn reconcile(&self, stated: &TotalStats) -> Result<(), GitscribeError> {
        let checks = [
            ("files", stated.files, self.total.files),
            ("insertions", stated.insertions, self.total.insertions),
            ("deletions", stated.deletions, self.total.deletions),
            ("lines", stated.lines, self.total.lines),
        ];
        for (field, expected, actual) in checks {
            if expected != actual {
                return Err(GitscribeError::StatsMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Aggregate counts.
    pub fn total(&self) -> &TotalStats {
        &self.total
    }

    /// Per-file counts keyed by path, in path order.
    pub fn files(&self) -> &BTreeMap<String, FileStats> {
        &self.files
    }

    /// `true` when no file was touched.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Render a Markdown table of per-file counts.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("| File | + | - | Lines |\n|---|---:|---:|---:|\n");
        for (path, file) in &self.files {
            if file.binary {
                out.push_str(&format!("| `{path}` | bin | bin | 0 |\n"));
            } else {
                out.push_str(&format!(
                    "| `{path}` | {} | {} | {} |\n",
                    file.insertions, file.deletions, file.lines
                ));
            }
        }
        out.push_str(&format!(
            "| **{} files** | {} | {} | {} |\n",
            self.total.files, self.total.insertions, self.total.deletions, self.total.lines
        ));
        out
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (path, file) in &self.files {
            if file.binary {
                writeln!(f, "{path} | Bin")?;
            } else {
                writeln!(f, "{path} | {} +{} -{}", file.lines, file.insertions, file.deletions)?;
            }
        }
        writeln!(
            f,
            "{} files changed, {} insertions(+), {} deletions(-)",
            self.total.files, self.total.insertions, self.total.deletions
        )
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use gitscribe_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
