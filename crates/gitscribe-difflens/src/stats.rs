//! Per-file and total insertion/deletion counts.
//!
//! Counts come either from `--numstat` lines or from the hunks of a full
//! diff. Binary files count as files with zero insertions and deletions and
//! carry [`FileStats::binary`].

use std::collections::BTreeMap;

use gitscribe_core::{FileStats, GitscribeError, Stats, StatsConfig, TotalStats};
use tracing::debug;

use crate::parser::{parse_diff, Diff};

/// Parse stats from either numstat text or a full diff.
///
/// Text containing a `diff --git` line is parsed with
/// [`parse_diff`](crate::parser::parse_diff) and aggregated; anything else is
/// treated as `--numstat` output.
///
/// # Errors
///
/// Propagates the errors of [`parse_diff`] and [`parse_numstat`].
///
/// # Examples
///
/// ```
/// use gitscribe_difflens::stats::parse_stats;
///
/// let stats = parse_stats("3\t1\tsrc/lib.rs\n-\t-\tlogo.png\n").unwrap();
/// assert_eq!(stats.total().insertions, 3);
/// assert_eq!(stats.total().lines, 4);
/// assert_eq!(stats.total().files, 2);
/// assert!(stats.files()["logo.png"].binary);
/// ```
pub fn parse_stats(input: &str) -> Result<Stats, GitscribeError> {
    parse_stats_with(input, &StatsConfig::default())
}

/// [`parse_stats`] with explicit configuration.
pub fn parse_stats_with(input: &str, config: &StatsConfig) -> Result<Stats, GitscribeError> {
    if input.lines().any(|l| l.starts_with("diff --git ")) {
        let diffs = parse_diff(input)?;
        return Ok(stats_from_diffs(&diffs));
    }
    parse_numstat_with(input, config)
}

/// Aggregate parsed diffs into [`Stats`], keyed by [`Diff::path`].
///
/// # Examples
///
/// ```
/// use gitscribe_difflens::{parse_diff, stats_from_diffs};
///
/// let diffs = parse_diff("diff --git a/run b/run\nold mode 100644\nnew mode 100755\n").unwrap();
/// let stats = stats_from_diffs(&diffs);
/// assert_eq!(stats.total().files, 1);
/// assert_eq!(stats.total().lines, 0);
/// ```
pub fn stats_from_diffs(diffs: &[Diff]) -> Stats {
    let mut files: BTreeMap<String, FileStats> = BTreeMap::new();
    for diff in diffs {
        let entry = if diff.binary() {
            FileStats::binary()
        } else {
            FileStats::new(diff.insertions(), diff.deletions())
        };
        merge_entry(&mut files, diff.path().to_string(), entry);
    }
    debug!(files = files.len(), "aggregated diff stats");
    Stats::from_files(files)
}

/// Parse `--numstat` output: `<insertions>\t<deletions>\t<path>` per line.
///
/// A leading commit record (text starting with `commit `) is skipped up to
/// the first numstat line. A `--shortstat` summary line, when present,
/// supplies independent totals that must match the per-file sums.
///
/// # Errors
///
/// Returns [`GitscribeError::MalformedStat`] for a line that is neither a
/// numstat nor a summary line, and [`GitscribeError::StatsMismatch`] if the
/// summary disagrees with the per-file counts.
///
/// # Examples
///
/// ```
/// use gitscribe_difflens::stats::parse_numstat;
///
/// let text = "1\t0\ta.txt\n2\t2\tb.txt\n 2 files changed, 3 insertions(+), 2 deletions(-)\n";
/// let stats = parse_numstat(text).unwrap();
/// assert_eq!(stats.total().deletions, 2);
///
/// let bad = "1\t0\ta.txt\n 1 file changed, 5 insertions(+)\n";
/// assert!(parse_numstat(bad).is_err());
/// ```
pub fn parse_numstat(input: &str) -> Result<Stats, GitscribeError> {
    parse_numstat_with(input, &StatsConfig::default())
}

/// [`parse_numstat`] with explicit configuration.
pub fn parse_numstat_with(input: &str, config: &StatsConfig) -> Result<Stats, GitscribeError> {
    let mut files: BTreeMap<String, FileStats> = BTreeMap::new();
    let mut running = TotalStats::default();
    let mut summary: Option<TotalStats> = None;
    let mut in_record = input.starts_with("commit ");

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let entry = parse_numstat_line(line, line_no);
        if in_record {
            if entry.is_none() {
                continue;
            }
            in_record = false;
        }

        if let Some(entry) = entry {
            let (path, stat) = entry?;
            if summary.is_some() {
                return Err(GitscribeError::MalformedStat {
                    line: line_no,
                    reason: "numstat line after summary line".into(),
                });
            }
            // Per-file sums never exceed the running totals, so checking
            // those keeps every later addition in range.
            running = add_counts(&running, &stat).ok_or_else(|| overflow(line_no))?;
            merge_entry(&mut files, path, stat);
            continue;
        }

        match parse_shortstat(line) {
            Some(total) if summary.is_none() => summary = Some(total),
            Some(_) => {
                return Err(GitscribeError::MalformedStat {
                    line: line_no,
                    reason: "more than one summary line".into(),
                });
            }
            None => {
                return Err(GitscribeError::MalformedStat {
                    line: line_no,
                    reason: format!("not a numstat line: `{line}`"),
                });
            }
        }
    }

    debug!(files = files.len(), summary = summary.is_some(), "parsed numstat");
    match summary {
        Some(total) if config.verify_summary => Stats::from_parts(total, files),
        _ => Ok(Stats::from_files(files)),
    }
}

fn merge_entry(files: &mut BTreeMap<String, FileStats>, path: String, entry: FileStats) {
    files
        .entry(path)
        .and_modify(|existing| existing.merge(entry))
        .or_insert(entry);
}

/// `None` if `line` is not a numstat line at all.
fn parse_numstat_line(
    line: &str,
    line_no: usize,
) -> Option<Result<(String, FileStats), GitscribeError>> {
    let mut parts = line.splitn(3, '\t');
    let insertions = parts.next()?;
    let deletions = parts.next()?;
    let path = parts.next()?.trim_end_matches('\r');
    if path.is_empty() {
        return None;
    }

    let stat = if insertions == "-" && deletions == "-" {
        FileStats::binary()
    } else {
        let insertions: u64 = insertions.parse().ok()?;
        let deletions: u64 = deletions.parse().ok()?;
        match FileStats::checked_new(insertions, deletions) {
            Some(stat) => stat,
            None => return Some(Err(overflow(line_no))),
        }
    };
    Some(Ok((path.to_string(), stat)))
}

fn add_counts(total: &TotalStats, stat: &FileStats) -> Option<TotalStats> {
    let insertions = total.insertions.checked_add(stat.insertions)?;
    let deletions = total.deletions.checked_add(stat.deletions)?;
    Some(TotalStats {
        insertions,
        deletions,
        lines: insertions.checked_add(deletions)?,
        files: total.files,
    })
}

fn overflow(line: usize) -> GitscribeError {
    GitscribeError::MalformedStat {
        line,
        reason: "line counts overflow".into(),
    }
}

/// ` N file(s) changed, X insertion(s)(+), Y deletion(s)(-)`
fn parse_shortstat(line: &str) -> Option<TotalStats> {
    let mut parts = line.trim().split(", ");
    let head = parts.next()?;
    let files = head
        .strip_suffix(" files changed")
        .or_else(|| head.strip_suffix(" file changed"))?
        .parse()
        .ok()?;

    let mut total = TotalStats {
        files,
        ..TotalStats::default()
    };
    for part in parts {
        let (count, label) = part.split_once(' ')?;
        let count: u64 = count.parse().ok()?;
        match label {
            "insertion(+)" | "insertions(+)" => total.insertions = count,
            "deletion(-)" | "deletions(-)" => total.deletions = count,
            _ => return None,
        }
    }
    total.lines = total.insertions.checked_add(total.deletions)?;
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(stats: &Stats) {
        let total = stats.total();
        assert_eq!(total.lines, total.insertions + total.deletions);
        assert_eq!(
            total.insertions,
            stats.files().values().map(|f| f.insertions).sum::<u64>()
        );
        assert_eq!(
            total.deletions,
            stats.files().values().map(|f| f.deletions).sum::<u64>()
        );
        assert_eq!(total.files, stats.files().len() as u64);
    }

    #[test]
    fn numstat_lines_are_summed() {
        let stats = parse_numstat("4\t2\tsrc/a.rs\n0\t7\tsrc/b.rs\n").unwrap();
        assert_eq!(stats.total().insertions, 4);
        assert_eq!(stats.total().deletions, 9);
        assert_eq!(stats.files()["src/a.rs"], FileStats::new(4, 2));
        assert_invariants(&stats);
    }

    #[test]
    fn binary_entries_count_as_files_only() {
        let stats = parse_numstat("-\t-\tlogo.png\n1\t1\tREADME\n").unwrap();
        assert_eq!(stats.total().files, 2);
        assert_eq!(stats.total().lines, 2);
        assert!(stats.files()["logo.png"].binary);
        assert_invariants(&stats);
    }

    #[test]
    fn rename_paths_are_kept_verbatim() {
        let stats = parse_numstat("0\t0\tlib/{old.rb => new.rb}\n").unwrap();
        assert!(stats.files().contains_key("lib/{old.rb => new.rb}"));
    }

    #[test]
    fn duplicate_paths_are_merged() {
        let stats = parse_numstat("1\t0\ta\n2\t3\ta\n").unwrap();
        assert_eq!(stats.total().files, 1);
        assert_eq!(stats.files()["a"], FileStats::new(3, 3));
    }

    #[test]
    fn empty_input_is_empty_stats() {
        let stats = parse_numstat("").unwrap();
        assert!(stats.is_empty());
        assert_eq!(*stats.total(), TotalStats::default());
    }

    #[test]
    fn leading_commit_record_is_skipped() {
        let text = "\
commit 33ebe7acec14b25c5f84f35a664803fcab2f7781
tree 4a6c6cf8e1f8e2e7c0e9f0a7d7b7c9f4e0b8e1c2
author Michael Trier <mtrier@gmail.com> 1210193388 -0400
committer Michael Trier <mtrier@gmail.com> 1210193388 -0400

    initial project

14\t0\tLICENSE
7\t0\tREADME
";
        let stats = parse_numstat(text).unwrap();
        assert_eq!(stats.total().files, 2);
        assert_eq!(stats.total().insertions, 21);
    }

    #[test]
    fn garbage_line_is_malformed() {
        let err = parse_numstat("1\t1\ta\nhello world\n").unwrap_err();
        assert!(matches!(err, GitscribeError::MalformedStat { line: 2, .. }));
    }

    #[test]
    fn summary_mismatch_is_reported() {
        let err = parse_numstat("1\t1\ta\n 1 file changed, 1 insertion(+), 2 deletions(-)\n")
            .unwrap_err();
        assert!(matches!(
            err,
            GitscribeError::StatsMismatch {
                field: "deletions",
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn summary_check_can_be_disabled() {
        let config = StatsConfig {
            verify_summary: false,
        };
        let stats =
            parse_numstat_with("1\t1\ta\n 3 files changed, 9 insertions(+)\n", &config).unwrap();
        assert_eq!(stats.total().files, 1);
    }

    #[test]
    fn shortstat_variants() {
        let t = parse_shortstat(" 1 file changed, 1 insertion(+)").unwrap();
        assert_eq!((t.files, t.insertions, t.deletions, t.lines), (1, 1, 0, 1));
        let t = parse_shortstat(" 2 files changed, 3 deletions(-)").unwrap();
        assert_eq!((t.files, t.insertions, t.deletions), (2, 0, 3));
        assert!(parse_shortstat("2 files changed, lots of stuff").is_none());
        assert!(parse_shortstat("nothing").is_none());
    }

    #[test]
    fn overflowing_counts_are_malformed() {
        let err = parse_numstat("18446744073709551615\t1\tbig.txt\n").unwrap_err();
        assert!(matches!(err, GitscribeError::MalformedStat { line: 1, .. }));

        let err = parse_numstat("18446744073709551615\t0\ta\n1\t0\tb\n").unwrap_err();
        assert!(matches!(err, GitscribeError::MalformedStat { line: 2, .. }));

        let err = parse_numstat("0\t18446744073709551615\ta\n0\t1\ta\n").unwrap_err();
        assert!(err.to_string().contains("overflow"));

        let huge = " 1 file changed, 18446744073709551615 insertions(+), 1 deletion(-)";
        assert!(parse_shortstat(huge).is_none());
    }

    #[test]
    fn largest_counts_still_parse() {
        let stats = parse_numstat("18446744073709551615\t0\ta\n").unwrap();
        assert_eq!(stats.total().lines, u64::MAX);
        assert_invariants(&stats);
    }

    #[test]
    fn stats_from_full_diff() {
        let text = "\
diff --git a/a.txt b/a.txt
index 4ebc8aea50e0a67e000ba29a30809d0a7b9b2666..2dd02534615434d88c51307beb0f0092f21fd103 100644
--- a/a.txt
+++ b/a.txt
@@ -1,2 +1,2 @@
-one
+uno
 two
@@ -10 +10,2 @@
 ten
+eleven
diff --git a/pic.png b/pic.png
index 4ebc8aea50e0a67e000ba29a30809d0a7b9b2666..2dd02534615434d88c51307beb0f0092f21fd103 100644
Binary files a/pic.png and b/pic.png differ
diff --git a/gone.txt b/gone.txt
deleted file mode 100644
index 4ebc8aea50e0a67e000ba29a30809d0a7b9b2666..0000000000000000000000000000000000000000
--- a/gone.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-a
-b
";
        let stats = parse_stats(text).unwrap();
        assert_eq!(stats.files()["a.txt"], FileStats::new(2, 1));
        assert!(stats.files()["pic.png"].binary);
        assert_eq!(stats.files()["gone.txt"], FileStats::new(0, 2));
        assert_eq!(stats.total().files, 3);
        assert_eq!(stats.total().lines, 5);
        assert_invariants(&stats);
    }
}
