use crate::cli::CommonArgs;
use crate::error::{CodequityError, Result};
use crate::git::GitRepo;
use crate::model::{CommitInfo, CommitStats, DateRange, EquityEntry};
use crate::source;
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;

pub fn exec(common: CommonArgs, location: Option<String>, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let location = source::parse_location(location.as_deref())
        .context("Failed to resolve repository location")?;

    let credentials = match (common.username.clone(), common.password.clone()) {
        (Some(username), Some(password)) => Some(source::Credentials { username, password }),
        _ => None,
    };

    let acquired = source::acquire(&location, credentials.as_ref())
        .context("Failed to acquire repository")?;
    let repo = acquired.repo();

    let range = repo
        .resolve_range(common.since.as_deref(), common.until.as_deref())
        .context("Failed to resolve date range")?;

    let policy = ChangePolicy {
        count_deletions: common.count_deletions,
        skip_merges: common.skip_merges,
    };

    let entries = compute_equity(repo, &range, policy)
        .context("Failed to compute contribution shares")?;

    if json {
        crate::output::output_json(&entries, repo.path(), &common)?;
    } else if ndjson {
        crate::output::output_ndjson(&entries)?;
    } else {
        crate::output::output_report(&entries)?;
    }

    Ok(())
}

/// What counts as change volume when folding a commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangePolicy {
    /// Count deleted lines in addition to added ones.
    pub count_deletions: bool,
    /// Leave merge commits out of the totals entirely.
    pub skip_merges: bool,
}

/// Walk the full history and fold every commit's diff into the ranking.
///
/// Strictly sequential: each commit's stats are committed to the
/// accumulator before the next commit is read, and nothing partial is ever
/// returned on failure.
pub fn compute_equity(repo: &GitRepo, range: &DateRange, policy: ChangePolicy) -> Result<Vec<EquityEntry>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Collecting commits...");

    let mut aggregator = Aggregator::new(policy);
    for item in repo.walk()? {
        let info = item?;
        pb.inc(1);

        if !range.contains(&info.timestamp) {
            continue;
        }
        if policy.skip_merges && info.is_merge() {
            continue;
        }

        let stats = repo.commit_stats(&info.id, &info.parent_ids)?;
        aggregator.fold(&info, &stats);
    }
    pb.finish_and_clear();

    aggregator.rank()
}

struct AuthorBucket {
    name: String,
    email: String,
    changes: u64,
}

/// Running per-author and global totals, in pure integer arithmetic.
///
/// Buckets are kept in first-seen order so the final ranking can break
/// exact ties deterministically. The accumulator is a plain value; feeding
/// it synthetic commits needs no repository at all.
pub struct Aggregator {
    policy: ChangePolicy,
    buckets: Vec<AuthorBucket>,
    index: HashMap<String, usize>,
    global: u64,
}

impl Aggregator {
    pub fn new(policy: ChangePolicy) -> Self {
        Self {
            policy,
            buckets: Vec::new(),
            index: HashMap::new(),
            global: 0,
        }
    }

    pub fn global_total(&self) -> u64 {
        self.global
    }

    /// Fold one commit's file stats into the totals.
    pub fn fold(&mut self, info: &CommitInfo, stats: &CommitStats) {
        let mut changes = 0u64;
        for file in &stats.files {
            changes += file.added_lines as u64;
            if self.policy.count_deletions {
                changes += file.deleted_lines as u64;
            }
        }

        let identity = info.author_identity();
        let pos = match self.index.get(&identity) {
            Some(&pos) => pos,
            None => {
                let pos = self.buckets.len();
                self.buckets.push(AuthorBucket {
                    name: info.author_name.clone(),
                    email: info.author_email.clone(),
                    changes: 0,
                });
                self.index.insert(identity, pos);
                pos
            }
        };

        self.buckets[pos].changes += changes;
        self.global += changes;
    }

    /// Convert the totals into a ranked percentage report.
    ///
    /// Percentages are computed in floating point only here, over the final
    /// integer totals. The sort is stable and keyed on the integer counts,
    /// so authors with exactly equal totals keep their first-seen order.
    pub fn rank(self) -> Result<Vec<EquityEntry>> {
        if self.global == 0 {
            return Err(CodequityError::NoContributions);
        }

        let global = self.global as f64;
        let mut entries: Vec<EquityEntry> = self
            .buckets
            .into_iter()
            .map(|bucket| EquityEntry {
                author: format!("{} <{}>", bucket.name, bucket.email),
                author_name: bucket.name,
                author_email: bucket.email,
                changes: bucket.changes,
                equity: (bucket.changes as f64 / global) * 100.0,
            })
            .collect();

        entries.sort_by(|a, b| b.changes.cmp(&a.changes));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileStats;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn commit(id: &str, name: &str, email: &str) -> CommitInfo {
        CommitInfo {
            id: id.to_string(),
            author_name: name.to_string(),
            author_email: email.to_string(),
            timestamp: Utc::now(),
            parent_ids: Vec::new(),
        }
    }

    fn stats(id: &str, added: u32, deleted: u32) -> CommitStats {
        CommitStats {
            commit_id: id.to_string(),
            files: vec![FileStats {
                path: "src/lib.rs".to_string(),
                added_lines: added,
                deleted_lines: deleted,
                is_binary: false,
            }],
        }
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let mut agg = Aggregator::new(ChangePolicy::default());
        agg.fold(&commit("a1", "alice", "alice@e.com"), &stats("a1", 100, 0));
        agg.fold(&commit("b1", "bob", "bob@e.com"), &stats("b1", 37, 0));
        agg.fold(&commit("c1", "carol", "carol@e.com"), &stats("c1", 11, 0));

        let entries = agg.rank().unwrap();
        let sum: f64 = entries.iter().map(|e| e.equity).sum();
        assert!((sum - 100.0).abs() < 1e-6);
        for entry in &entries {
            assert!(entry.equity >= 0.0 && entry.equity <= 100.0);
        }
    }

    #[test]
    fn two_authors_with_equal_volume_split_evenly() {
        let mut agg = Aggregator::new(ChangePolicy::default());
        agg.fold(&commit("a1", "alice", "alice@e.com"), &stats("a1", 100, 0));
        agg.fold(&commit("b1", "bob", "bob@e.com"), &stats("b1", 50, 0));
        agg.fold(&commit("b2", "bob", "bob@e.com"), &stats("b2", 50, 0));

        let entries = agg.rank().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].author, "alice <alice@e.com>");
        assert_eq!(entries[1].author, "bob <bob@e.com>");
        assert!((entries[0].equity - 50.0).abs() < 1e-9);
        assert!((entries[1].equity - 50.0).abs() < 1e-9);
    }

    #[test]
    fn ranking_is_deterministic() {
        let build = || {
            let mut agg = Aggregator::new(ChangePolicy::default());
            agg.fold(&commit("a1", "alice", "alice@e.com"), &stats("a1", 30, 0));
            agg.fold(&commit("b1", "bob", "bob@e.com"), &stats("b1", 30, 0));
            agg.fold(&commit("c1", "carol", "carol@e.com"), &stats("c1", 40, 0));
            agg.rank().unwrap()
        };

        let first = build();
        let second = build();
        let order_a: Vec<&str> = first.iter().map(|e| e.author.as_str()).collect();
        let order_b: Vec<&str> = second.iter().map(|e| e.author.as_str()).collect();
        assert_eq!(order_a, order_b);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.equity, b.equity);
        }
    }

    #[test]
    fn exact_ties_keep_first_seen_order() {
        let mut agg = Aggregator::new(ChangePolicy::default());
        agg.fold(&commit("b1", "bob", "bob@e.com"), &stats("b1", 25, 0));
        agg.fold(&commit("a1", "alice", "alice@e.com"), &stats("a1", 25, 0));
        agg.fold(&commit("c1", "carol", "carol@e.com"), &stats("c1", 50, 0));

        let entries = agg.rank().unwrap();
        assert_eq!(entries[0].author_name, "carol");
        // bob was seen before alice, and both hold 25
        assert_eq!(entries[1].author_name, "bob");
        assert_eq!(entries[2].author_name, "alice");
    }

    #[test]
    fn zero_global_total_reports_no_contributions() {
        let agg = Aggregator::new(ChangePolicy::default());
        assert!(matches!(agg.rank(), Err(CodequityError::NoContributions)));

        let mut agg = Aggregator::new(ChangePolicy::default());
        agg.fold(
            &commit("a1", "alice", "alice@e.com"),
            &CommitStats {
                commit_id: "a1".to_string(),
                files: Vec::new(),
            },
        );
        assert!(matches!(agg.rank(), Err(CodequityError::NoContributions)));
    }

    #[test]
    fn root_commit_counts_full_content_as_additions() {
        let mut agg = Aggregator::new(ChangePolicy::default());
        agg.fold(&commit("r1", "alice", "alice@e.com"), &stats("r1", 50, 0));

        assert_eq!(agg.global_total(), 50);
        let entries = agg.rank().unwrap();
        assert_eq!(entries[0].changes, 50);
        assert!((entries[0].equity - 100.0).abs() < 1e-9);
    }

    #[test]
    fn deletions_only_count_when_configured() {
        let mut additions_only = Aggregator::new(ChangePolicy::default());
        additions_only.fold(&commit("a1", "alice", "alice@e.com"), &stats("a1", 10, 7));
        assert_eq!(additions_only.global_total(), 10);

        let mut with_deletions = Aggregator::new(ChangePolicy {
            count_deletions: true,
            skip_merges: false,
        });
        with_deletions.fold(&commit("a1", "alice", "alice@e.com"), &stats("a1", 10, 7));
        assert_eq!(with_deletions.global_total(), 17);
    }

    #[test]
    fn empty_merge_diff_contributes_nothing() {
        // First-parent policy: a merge whose tree matches its first parent
        // has an empty stat set and must not move any totals.
        let mut agg = Aggregator::new(ChangePolicy::default());
        agg.fold(&commit("a1", "alice", "alice@e.com"), &stats("a1", 10, 0));

        let mut merge = commit("m1", "bob", "bob@e.com");
        merge.parent_ids = vec!["a1".to_string(), "f1".to_string()];
        agg.fold(
            &merge,
            &CommitStats {
                commit_id: "m1".to_string(),
                files: Vec::new(),
            },
        );

        assert_eq!(agg.global_total(), 10);
        let entries = agg.rank().unwrap();
        let bob = entries.iter().find(|e| e.author_name == "bob").unwrap();
        assert_eq!(bob.changes, 0);
        assert!((bob.equity - 0.0).abs() < 1e-9);
    }
}
