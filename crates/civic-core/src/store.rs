use std::sync::Arc;

use chrono::{DateTime, Utc};
use civic_types::models::{
    AdminStats, Comment, Ministry, Proposal, ProposalStatus, Province, Role, User, Vote,
};
use tracing::error;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// A user together with the stored password hash.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewProposal {
    pub id: Uuid,
    pub author_id: Uuid,
    pub ministry_id: Option<i64>,
    pub province_id: Option<i64>,
    pub problem: String,
    pub solution: String,
    pub impact: Option<String>,
    pub status: ProposalStatus,
    pub moderation_score: u8,
    pub flagged_for_review: bool,
    pub created_at: DateTime<Utc>,
}

/// Replacement text for an author revision, with its fresh moderation result.
#[derive(Debug, Clone)]
pub struct ProposalContent {
    pub problem: String,
    pub solution: String,
    pub impact: Option<String>,
    pub moderation_score: u8,
    pub flagged_for_review: bool,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub moderation_score: u8,
    pub flagged_for_review: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Publication {
    #[default]
    Any,
    Published,
    Unpublished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Newest first.
    #[default]
    Recent,
    /// Most likes first, ties newest first.
    Popular,
}

#[derive(Debug, Clone, Default)]
pub struct ProposalFilter {
    pub ministry_id: Option<i64>,
    pub province_id: Option<i64>,
    pub status: Option<ProposalStatus>,
    pub author_id: Option<Uuid>,
    pub publication: Publication,
    pub sort: SortOrder,
}

/// Access to users, reference data, propositions, votes and comments.
///
/// Implementations are synchronous; async callers go through [`blocking`].
pub trait Store: Send + Sync + 'static {
    // -- Users --

    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    fn insert_user(&self, record: &UserRecord) -> StoreResult<()>;
    fn user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;
    fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Returns false when no user has this email.
    fn set_user_role(&self, email: &str, role: Role) -> StoreResult<bool>;

    // -- Reference data --

    fn ministries(&self) -> StoreResult<Vec<Ministry>>;
    fn ministry(&self, id: i64) -> StoreResult<Option<Ministry>>;
    fn provinces(&self) -> StoreResult<Vec<Province>>;
    fn province(&self, id: i64) -> StoreResult<Option<Province>>;

    // -- Propositions --

    fn insert_proposal(&self, proposal: &NewProposal) -> StoreResult<()>;
    fn proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>>;
    fn proposals(&self, filter: &ProposalFilter) -> StoreResult<Vec<Proposal>>;
    /// Rewrites the text of a proposition that has no official response yet.
    /// Returns false when no such unpublished row exists.
    fn update_proposal_content(&self, id: Uuid, content: &ProposalContent) -> StoreResult<bool>;
    /// The update methods return false when the proposition does not exist.
    fn set_proposal_status(&self, id: Uuid, status: ProposalStatus) -> StoreResult<bool>;
    fn set_official_response(&self, id: Uuid, response: &str) -> StoreResult<bool>;
    /// Removes the proposition with its votes and comments.
    fn delete_proposal(&self, id: Uuid) -> StoreResult<bool>;
    /// Like [`Store::delete_proposal`], but only while it is unpublished.
    fn delete_unpublished_proposal(&self, id: Uuid) -> StoreResult<bool>;

    // -- Votes --

    /// Insert, or overwrite the type of the existing (user, proposition) row.
    fn upsert_vote(&self, vote: &Vote) -> StoreResult<()>;
    fn votes(&self, proposal_id: Uuid) -> StoreResult<Vec<Vote>>;

    // -- Comments --

    fn insert_comment(&self, comment: &NewComment) -> StoreResult<()>;
    fn comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    /// Oldest first.
    fn comments(&self, proposal_id: Uuid) -> StoreResult<Vec<Comment>>;

    fn stats(&self) -> StoreResult<AdminStats>;
}

/// Runs a store call on the blocking pool so it never stalls the runtime.
pub async fn blocking<T, F>(store: &Arc<dyn Store>, f: F) -> StoreResult<T>
where
    F: FnOnce(&dyn Store) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StoreError::Backend(anyhow::anyhow!("store task failed: {e}"))
        })?
}
