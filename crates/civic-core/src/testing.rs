//! In-memory store and scripted moderator for lifecycle tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Utc;
use civic_types::models::{
    AdminStats, Comment, CommentStats, Ministry, Proposal, ProposalStats, ProposalStatus,
    Province, Role, User, Vote, VoteKind,
};
use uuid::Uuid;

use crate::access::Actor;
use crate::error::{StoreError, StoreResult};
use crate::moderation::{ModerationOutcome, Moderator};
use crate::store::{
    NewComment, NewProposal, ProposalContent, ProposalFilter, Publication, SortOrder, Store,
    UserRecord,
};

struct StoredProposal {
    seq: u64,
    row: NewProposal,
    official_response: Option<String>,
}

#[derive(Default)]
struct Inner {
    seq: u64,
    users: Vec<UserRecord>,
    ministries: Vec<Ministry>,
    provinces: Vec<Province>,
    proposals: Vec<StoredProposal>,
    votes: Vec<Vote>,
    comments: Vec<NewComment>,
}

impl Inner {
    fn user_name(&self, id: Uuid) -> String {
        self.users
            .iter()
            .find(|u| u.user.id == id)
            .map(|u| u.user.name.clone())
            .unwrap_or_else(|| "unknown".into())
    }

    fn resolve(&self, stored: &StoredProposal) -> Proposal {
        let row = &stored.row;
        let count = |kind| {
            self.votes
                .iter()
                .filter(|v| v.proposal_id == row.id && v.kind == kind)
                .count() as u64
        };
        Proposal {
            id: row.id,
            author_id: row.author_id,
            author_name: self.user_name(row.author_id),
            ministry_id: row.ministry_id,
            ministry_name: row.ministry_id.and_then(|id| {
                self.ministries.iter().find(|m| m.id == id).map(|m| m.name.clone())
            }),
            province_id: row.province_id,
            province_name: row.province_id.and_then(|id| {
                self.provinces.iter().find(|p| p.id == id).map(|p| p.name.clone())
            }),
            problem: row.problem.clone(),
            solution: row.solution.clone(),
            impact: row.impact.clone(),
            status: row.status,
            official_response: stored.official_response.clone(),
            moderation_score: row.moderation_score,
            flagged_for_review: row.flagged_for_review,
            created_at: row.created_at,
            likes: count(VoteKind::Like),
            dislikes: count(VoteKind::Dislike),
            comment_count: self.comments.iter().filter(|c| c.proposal_id == row.id).count() as u64,
        }
    }

    fn resolve_comment(&self, c: &NewComment) -> Comment {
        Comment {
            id: c.id,
            proposal_id: c.proposal_id,
            author_id: c.author_id,
            author_name: self.user_name(c.author_id),
            content: c.content.clone(),
            moderation_score: c.moderation_score,
            flagged_for_review: c.flagged_for_review,
            created_at: c.created_at,
        }
    }

    fn proposal_mut(&mut self, id: Uuid) -> Option<&mut StoredProposal> {
        self.proposals.iter_mut().find(|p| p.row.id == id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    reads: AtomicUsize,
    fail_next_vote: AtomicBool,
    publish_before_author_write: AtomicBool,
}

impl MemoryStore {
    pub fn with_reference_data() -> Self {
        let store = Self::default();
        {
            let mut inner = store.inner.lock().unwrap();
            inner.ministries.push(Ministry {
                id: 1,
                name: "Ministère de la Santé".into(),
                description: None,
                attributions: None,
            });
            inner.provinces.push(Province {
                id: 1,
                name: "Kinshasa".into(),
                government: None,
            });
        }
        store
    }

    pub fn add_user(&self, name: &str, role: Role) -> Actor {
        let user = User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.org", name.to_lowercase()),
            role,
            created_at: Utc::now(),
        };
        let actor = Actor { id: user.id, name: user.name.clone(), role };
        self.inner.lock().unwrap().users.push(UserRecord {
            user,
            password_hash: String::new(),
        });
        actor
    }

    /// Number of store calls made so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn vote_rows(&self, proposal_id: Uuid) -> Vec<Vote> {
        let inner = self.inner.lock().unwrap();
        inner.votes.iter().filter(|v| v.proposal_id == proposal_id).cloned().collect()
    }

    /// Makes the next upsert fail as if another request inserted first.
    pub fn fail_next_vote_with_duplicate(&self) {
        self.fail_next_vote.store(true, Ordering::SeqCst);
    }

    /// Publishes the target row just before the next author revise or
    /// withdraw reaches it, as a concurrent staff request would.
    pub fn publish_before_next_author_write(&self) {
        self.publish_before_author_write.store(true, Ordering::SeqCst);
    }

    fn author_write(&self, id: Uuid) -> std::sync::MutexGuard<'_, Inner> {
        let mut inner = self.lock();
        if self.publish_before_author_write.swap(false, Ordering::SeqCst) {
            if let Some(p) = inner.proposal_mut(id) {
                p.official_response = Some("Published meanwhile".into());
            }
        }
        inner
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.lock().unwrap()
    }
}

impl Store for MemoryStore {
    fn insert_user(&self, record: &UserRecord) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.users.iter().any(|u| u.user.email == record.user.email) {
            return Err(StoreError::Duplicate("email".into()));
        }
        inner.users.push(record.clone());
        Ok(())
    }

    fn user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.lock().users.iter().find(|u| u.user.email == email).cloned())
    }

    fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.user.id == id).map(|u| u.user.clone()))
    }

    fn set_user_role(&self, email: &str, role: Role) -> StoreResult<bool> {
        let mut inner = self.lock();
        match inner.users.iter_mut().find(|u| u.user.email == email) {
            Some(record) => {
                record.user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn ministries(&self) -> StoreResult<Vec<Ministry>> {
        Ok(self.lock().ministries.clone())
    }

    fn ministry(&self, id: i64) -> StoreResult<Option<Ministry>> {
        Ok(self.lock().ministries.iter().find(|m| m.id == id).cloned())
    }

    fn provinces(&self) -> StoreResult<Vec<Province>> {
        Ok(self.lock().provinces.clone())
    }

    fn province(&self, id: i64) -> StoreResult<Option<Province>> {
        Ok(self.lock().provinces.iter().find(|p| p.id == id).cloned())
    }

    fn insert_proposal(&self, proposal: &NewProposal) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.seq += 1;
        let seq = inner.seq;
        inner.proposals.push(StoredProposal {
            seq,
            row: proposal.clone(),
            official_response: None,
        });
        Ok(())
    }

    fn proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let inner = self.lock();
        Ok(inner
            .proposals
            .iter()
            .find(|p| p.row.id == id)
            .map(|p| inner.resolve(p)))
    }

    fn proposals(&self, filter: &ProposalFilter) -> StoreResult<Vec<Proposal>> {
        let inner = self.lock();
        let mut matching: Vec<(u64, Proposal)> = inner
            .proposals
            .iter()
            .filter(|p| filter.ministry_id.is_none() || p.row.ministry_id == filter.ministry_id)
            .filter(|p| filter.province_id.is_none() || p.row.province_id == filter.province_id)
            .filter(|p| filter.status.is_none_or(|s| p.row.status == s))
            .filter(|p| filter.author_id.is_none_or(|a| p.row.author_id == a))
            .filter(|p| match filter.publication {
                Publication::Any => true,
                Publication::Published => p.official_response.is_some(),
                Publication::Unpublished => p.official_response.is_none(),
            })
            .map(|p| (p.seq, inner.resolve(p)))
            .collect();

        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            let newest = (b.created_at, seq_b).cmp(&(a.created_at, seq_a));
            match filter.sort {
                SortOrder::Recent => newest,
                SortOrder::Popular => b.likes.cmp(&a.likes).then(newest),
            }
        });
        Ok(matching.into_iter().map(|(_, p)| p).collect())
    }

    fn update_proposal_content(&self, id: Uuid, content: &ProposalContent) -> StoreResult<bool> {
        let mut inner = self.author_write(id);
        Ok(match inner.proposal_mut(id) {
            Some(p) if p.official_response.is_none() => {
                p.row.problem = content.problem.clone();
                p.row.solution = content.solution.clone();
                p.row.impact = content.impact.clone();
                p.row.moderation_score = content.moderation_score;
                p.row.flagged_for_review = content.flagged_for_review;
                true
            }
            _ => false,
        })
    }

    fn set_proposal_status(&self, id: Uuid, status: ProposalStatus) -> StoreResult<bool> {
        let mut inner = self.lock();
        Ok(inner.proposal_mut(id).map(|p| p.row.status = status).is_some())
    }

    fn set_official_response(&self, id: Uuid, response: &str) -> StoreResult<bool> {
        let mut inner = self.lock();
        Ok(inner
            .proposal_mut(id)
            .map(|p| p.official_response = Some(response.to_string()))
            .is_some())
    }

    fn delete_proposal(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.lock();
        let before = inner.proposals.len();
        inner.proposals.retain(|p| p.row.id != id);
        inner.votes.retain(|v| v.proposal_id != id);
        inner.comments.retain(|c| c.proposal_id != id);
        Ok(inner.proposals.len() != before)
    }

    fn delete_unpublished_proposal(&self, id: Uuid) -> StoreResult<bool> {
        let published = {
            let mut inner = self.author_write(id);
            match inner.proposal_mut(id) {
                Some(p) => p.official_response.is_some(),
                None => return Ok(false),
            }
        };
        if published {
            Ok(false)
        } else {
            self.delete_proposal(id)
        }
    }

    fn upsert_vote(&self, vote: &Vote) -> StoreResult<()> {
        if self.fail_next_vote.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Duplicate("vote".into()));
        }
        let mut inner = self.lock();
        match inner
            .votes
            .iter_mut()
            .find(|v| v.user_id == vote.user_id && v.proposal_id == vote.proposal_id)
        {
            Some(existing) => {
                existing.kind = vote.kind;
                existing.updated_at = vote.updated_at;
            }
            None => inner.votes.push(vote.clone()),
        }
        Ok(())
    }

    fn votes(&self, proposal_id: Uuid) -> StoreResult<Vec<Vote>> {
        Ok(self.vote_rows(proposal_id))
    }

    fn insert_comment(&self, comment: &NewComment) -> StoreResult<()> {
        self.lock().comments.push(comment.clone());
        Ok(())
    }

    fn comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let inner = self.lock();
        Ok(inner
            .comments
            .iter()
            .find(|c| c.id == id)
            .map(|c| inner.resolve_comment(c)))
    }

    fn comments(&self, proposal_id: Uuid) -> StoreResult<Vec<Comment>> {
        let inner = self.lock();
        // Stable sort keeps insertion order for equal timestamps.
        let mut rows: Vec<&NewComment> =
            inner.comments.iter().filter(|c| c.proposal_id == proposal_id).collect();
        rows.sort_by_key(|c| c.created_at);
        Ok(rows.into_iter().map(|c| inner.resolve_comment(c)).collect())
    }

    fn stats(&self) -> StoreResult<AdminStats> {
        let inner = self.lock();
        let mut by_status = BTreeMap::new();
        for p in &inner.proposals {
            *by_status.entry(p.row.status).or_insert(0) += 1;
        }
        Ok(AdminStats {
            proposals: ProposalStats {
                total: inner.proposals.len() as u64,
                flagged: inner.proposals.iter().filter(|p| p.row.flagged_for_review).count() as u64,
                published: inner.proposals.iter().filter(|p| p.official_response.is_some()).count()
                    as u64,
                by_status,
            },
            comments: CommentStats {
                total: inner.comments.len() as u64,
                flagged: inner.comments.iter().filter(|c| c.flagged_for_review).count() as u64,
            },
        })
    }
}

enum Script {
    Answer { flagged: bool, probability: f64 },
    Unavailable,
    Disabled,
}

/// Returns a fixed outcome and records every text it was asked about.
pub struct ScriptedModerator {
    script: Script,
    seen: Mutex<Vec<String>>,
}

impl ScriptedModerator {
    fn new(script: Script) -> Self {
        Self { script, seen: Mutex::new(Vec::new()) }
    }

    pub fn answering(flagged: bool, probability: f64) -> Self {
        Self::new(Script::Answer { flagged, probability })
    }

    pub fn unavailable() -> Self {
        Self::new(Script::Unavailable)
    }

    pub fn disabled() -> Self {
        Self::new(Script::Disabled)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Moderator for ScriptedModerator {
    async fn check(&self, text: &str) -> ModerationOutcome {
        self.seen.lock().unwrap().push(text.to_string());
        match self.script {
            Script::Answer { flagged, probability } => {
                ModerationOutcome::from_oracle(flagged, probability)
            }
            Script::Unavailable => ModerationOutcome::Unavailable("connection refused".into()),
            Script::Disabled => ModerationOutcome::Disabled,
        }
    }
}
