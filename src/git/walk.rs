use crate::error::{CodequityError, Result};
use crate::model::CommitInfo;
use chrono::{DateTime, Utc};
use gix::{ObjectId, Repository};
use std::collections::{HashSet, VecDeque};

/// Depth-first walk over every commit reachable from HEAD.
///
/// Each commit is yielded exactly once no matter how many merge paths lead
/// to it, and the visit order is a fixed function of the repository state so
/// repeated runs see authors in the same first-encountered order. An unborn
/// HEAD (fresh repository with no commits) produces an empty walk rather
/// than an error.
pub struct CommitWalk<'repo> {
    repo: &'repo Repository,
    stack: VecDeque<ObjectId>,
    seen: HashSet<ObjectId>,
}

impl<'repo> CommitWalk<'repo> {
    pub fn from_head(repo: &'repo Repository) -> Result<Self> {
        let mut head = repo.head()?;

        let stack = if head.is_unborn() {
            VecDeque::new()
        } else {
            let head_commit = head.peel_to_commit_in_place()?;
            VecDeque::from([head_commit.id])
        };

        Ok(Self {
            repo,
            stack,
            seen: HashSet::new(),
        })
    }

    fn read_commit(&mut self, commit_id: ObjectId) -> Result<CommitInfo> {
        let commit = self.repo.find_commit(commit_id)?;

        let secs = commit.time()?.seconds;
        let timestamp = DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| CodequityError::InvalidDate(format!("Invalid timestamp: {secs}")))?;

        let author = commit.author()?;
        let parents: Vec<ObjectId> = commit.parent_ids().map(|id| id.into()).collect();

        // First parent goes on top of the stack so linear history is walked
        // newest-to-oldest before side branches.
        for pid in parents.iter().rev() {
            self.stack.push_back(*pid);
        }

        Ok(CommitInfo {
            id: commit_id.to_string(),
            author_name: author.name.to_string(),
            author_email: author.email.to_string(),
            timestamp,
            parent_ids: parents.iter().map(|id| id.to_string()).collect(),
        })
    }
}

impl Iterator for CommitWalk<'_> {
    type Item = Result<CommitInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(commit_id) = self.stack.pop_back() {
            if !self.seen.insert(commit_id) {
                continue;
            }
            return Some(self.read_commit(commit_id));
        }
        None
    }
}
