use crate::error::{CodequityError, Result};
use crate::git::walk::CommitWalk;
use crate::model::{CommitStats, DateRange, FileStats};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gix::object::tree::diff::ChangeDetached;
use gix::{discover, ObjectId, Repository};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open the repository at `path`, discovering upward the way git does.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = discover(path.as_ref())?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazy walk over every commit reachable from HEAD, each visited once.
    pub fn walk(&self) -> Result<CommitWalk<'_>> {
        CommitWalk::from_head(&self.repo)
    }

    pub fn resolve_range(&self, since: Option<&str>, until: Option<&str>) -> Result<DateRange> {
        let mut range = DateRange::new();

        let since_dt = if let Some(s) = since {
            Some(self.parse_commit_or_date(s)?)
        } else {
            None
        };

        let until_dt = if let Some(u) = until {
            Some(self.parse_commit_or_date(u)?)
        } else {
            None
        };

        if let (Some(s), Some(u)) = (since_dt, until_dt) {
            if s > u {
                return Err(CodequityError::InvalidDate(format!(
                    "Invalid range: since ({}) is after until ({})",
                    s, u
                )));
            }
        }

        if let Some(s) = since_dt {
            range = range.with_since(s);
        }
        if let Some(u) = until_dt {
            range = range.with_until(u);
        }

        Ok(range)
    }

    fn parse_commit_or_date(&self, input: &str) -> Result<DateTime<Utc>> {
        // RFC3339
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        // YYYY-MM-DD
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&datetime));
            }
        }

        // Relative forms like "2 weeks ago"
        if let Some(duration) = parse_natural_duration(input) {
            let now = SystemTime::now();
            let target = now
                .checked_sub(duration)
                .ok_or_else(|| CodequityError::InvalidDate(format!("Duration overflow for '{input}'")))?;
            return Ok(DateTime::<Utc>::from(target));
        }

        // Fallback to a git rev
        let id = self
            .repo
            .rev_parse_single(input)
            .map_err(|e| CodequityError::Parse(format!("Invalid commit or date '{input}': {e}")))?;

        let commit = id
            .object()
            .map_err(|e| CodequityError::Parse(format!("Invalid commit '{input}': {e}")))?
            .try_into_commit()
            .map_err(|_| CodequityError::Parse(format!("Not a commit: {input}")))?;

        let secs = commit.time()?.seconds;
        DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| CodequityError::InvalidDate(format!("Invalid timestamp: {secs}")))
    }

    /// Per-file line counts for one commit, diffed against its first parent.
    ///
    /// Merge commits are compared against the first parent only; lines that
    /// arrive solely via other parents are not re-attributed here. A root
    /// commit is diffed against the empty tree, so its whole content counts
    /// as additions.
    pub fn commit_stats(&self, commit_id: &str, parent_ids: &[String]) -> Result<CommitStats> {
        let oid = parse_oid(commit_id)?;
        let commit_tree = self
            .repo
            .find_commit(oid)
            .map_err(|e| diff_error(commit_id, &e))?
            .tree()
            .map_err(|e| diff_error(commit_id, &e))?;

        let parent_tree = match parent_ids.first() {
            Some(pid) => Some(
                self.repo
                    .find_commit(parse_oid(pid)?)
                    .map_err(|e| diff_error(commit_id, &e))?
                    .tree()
                    .map_err(|e| diff_error(commit_id, &e))?,
            ),
            None => None,
        };

        let changes: Vec<ChangeDetached> = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), None)
            .map_err(|e| diff_error(commit_id, &e))?;

        let mut files = Vec::new();
        for change in changes {
            self.record_change(commit_id, change, &mut files)?;
        }

        Ok(CommitStats {
            commit_id: commit_id.to_string(),
            files,
        })
    }

    fn record_change(
        &self,
        commit_id: &str,
        change: ChangeDetached,
        files: &mut Vec<FileStats>,
    ) -> Result<()> {
        match change {
            ChangeDetached::Addition { id, location, .. } => {
                let obj = self.find_blob(commit_id, id)?;
                let is_binary = is_binary_object(&obj);
                files.push(FileStats {
                    path: location.to_string(),
                    added_lines: if is_binary { 0 } else { count_lines(&obj) },
                    deleted_lines: 0,
                    is_binary,
                });
            }
            ChangeDetached::Deletion { id, location, .. } => {
                let obj = self.find_blob(commit_id, id)?;
                let is_binary = is_binary_object(&obj);
                files.push(FileStats {
                    path: location.to_string(),
                    added_lines: 0,
                    deleted_lines: if is_binary { 0 } else { count_lines(&obj) },
                    is_binary,
                });
            }
            ChangeDetached::Modification {
                previous_id,
                id,
                location,
                ..
            } => {
                let old_obj = self.find_blob(commit_id, previous_id)?;
                let new_obj = self.find_blob(commit_id, id)?;
                let is_binary = is_binary_object(&old_obj) || is_binary_object(&new_obj);
                let (added, deleted) = if is_binary {
                    (0, 0)
                } else {
                    line_diff(&old_obj, &new_obj)
                };
                files.push(FileStats {
                    path: location.to_string(),
                    added_lines: added,
                    deleted_lines: deleted,
                    is_binary,
                });
            }
            ChangeDetached::Rewrite {
                source_id,
                id,
                location,
                ..
            } => {
                // Rename or copy: only the content delta counts, so a pure
                // rename contributes nothing.
                let old_obj = self.find_blob(commit_id, source_id)?;
                let new_obj = self.find_blob(commit_id, id)?;
                let is_binary = is_binary_object(&old_obj) || is_binary_object(&new_obj);
                let (added, deleted) = if is_binary {
                    (0, 0)
                } else {
                    line_diff(&old_obj, &new_obj)
                };
                files.push(FileStats {
                    path: location.to_string(),
                    added_lines: added,
                    deleted_lines: deleted,
                    is_binary,
                });
            }
        }
        Ok(())
    }

    fn find_blob(&self, commit_id: &str, id: ObjectId) -> Result<gix::Object<'_>> {
        self.repo
            .find_object(id)
            .map_err(|e| diff_error(commit_id, &e))
    }
}

fn parse_oid(hex: &str) -> Result<ObjectId> {
    ObjectId::from_hex(hex.as_bytes())
        .map_err(|e| CodequityError::Parse(format!("Invalid commit ID '{hex}': {e}")))
}

fn diff_error(commit_id: &str, err: &dyn std::fmt::Display) -> CodequityError {
    CodequityError::Diff {
        commit: commit_id.to_string(),
        reason: err.to_string(),
    }
}

// Binary files never contribute line counts; a NUL in the first 8 KiB
// marks the blob as binary.
fn is_binary_object(object: &gix::Object) -> bool {
    object.data.as_slice().iter().take(8192).any(|&b| b == 0)
}

fn count_lines(object: &gix::Object) -> u32 {
    std::str::from_utf8(object.data.as_slice())
        .map(|t| t.lines().count() as u32)
        .unwrap_or(0)
}

// Line-level added/deleted counts with a bounded look-ahead resync.
fn line_diff(old_object: &gix::Object, new_object: &gix::Object) -> (u32, u32) {
    let old_text = std::str::from_utf8(old_object.data.as_slice()).unwrap_or("");
    let new_text = std::str::from_utf8(new_object.data.as_slice()).unwrap_or("");

    let old_lines: Vec<&str> = old_text.lines().collect();
    let new_lines: Vec<&str> = new_text.lines().collect();

    let mut added = 0usize;
    let mut deleted = 0usize;
    let (mut oi, mut ni) = (0usize, 0usize);

    while oi < old_lines.len() || ni < new_lines.len() {
        if oi >= old_lines.len() {
            added += new_lines.len() - ni;
            break;
        }
        if ni >= new_lines.len() {
            deleted += old_lines.len() - oi;
            break;
        }

        if old_lines[oi] == new_lines[ni] {
            oi += 1;
            ni += 1;
            continue;
        }

        let mut found = false;
        for look_ahead in 1..=3 {
            if oi + look_ahead < old_lines.len() && old_lines[oi + look_ahead] == new_lines[ni] {
                deleted += look_ahead;
                oi += look_ahead;
                found = true;
                break;
            }
            if ni + look_ahead < new_lines.len() && old_lines[oi] == new_lines[ni + look_ahead] {
                added += look_ahead;
                ni += look_ahead;
                found = true;
                break;
            }
        }

        if !found {
            deleted += 1;
            added += 1;
            oi += 1;
            ni += 1;
        }
    }

    (added as u32, deleted as u32)
}

fn parse_natural_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    if let Some(days) = input.strip_suffix(" days ago") {
        if let Ok(n) = days.trim().parse::<u64>() {
            return Some(Duration::from_secs(n * 86400));
        }
    }

    if let Some(weeks) = input.strip_suffix(" weeks ago") {
        if let Ok(n) = weeks.trim().parse::<u64>() {
            return Some(Duration::from_secs(n * 7 * 86400));
        }
    }

    if let Some(months) = input.strip_suffix(" months ago") {
        if let Ok(n) = months.trim().parse::<u64>() {
            return Some(Duration::from_secs(n * 30 * 86400));
        }
    }

    None
}
