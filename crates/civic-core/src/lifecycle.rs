use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use civic_types::models::{
    AdminStats, Comment, Proposal, ProposalStatus, UnknownVariant, Vote, VoteKind, VoteTally,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::{Actor, Operation, authorize, authorize_owner};
use crate::error::{CoreError, CoreResult, StoreError};
use crate::moderation::{ModerationOutcome, ModerationVerdict, Moderator, proposal_text};
use crate::store::{
    NewComment, NewProposal, ProposalContent, ProposalFilter, Publication, SortOrder, Store,
    blocking,
};

/// Stored as the official response when staff publish without a text.
pub const PUBLISHED_WITHOUT_RESPONSE: &str = "Published without an official response.";

#[derive(Debug, Clone, Default)]
pub struct ProposalDraft {
    pub ministry_id: Option<i64>,
    pub province_id: Option<i64>,
    pub problem: String,
    pub solution: String,
    pub impact: Option<String>,
}

/// Absent fields keep their current value; an empty impact clears it.
#[derive(Debug, Clone, Default)]
pub struct ProposalRevision {
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListView {
    /// Propositions with an official response.
    #[default]
    Published,
    /// The caller's own propositions still waiting for a response.
    Pending,
    /// Everything, for staff.
    All,
}

impl FromStr for ListView {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "published" => Ok(Self::Published),
            "pending" => Ok(Self::Pending),
            "all" => Ok(Self::All),
            other => Err(CoreError::validation(format!(
                "invalid view '{other}' (allowed: published, pending, all)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub view: ListView,
    pub ministry_id: Option<i64>,
    pub province_id: Option<i64>,
    pub status: Option<String>,
    pub sort: Option<String>,
}

/// Applies the proposition rules on top of an injected [`Store`] and
/// [`Moderator`].
pub struct Lifecycle<M> {
    store: Arc<dyn Store>,
    moderator: M,
}

impl<M: Moderator> Lifecycle<M> {
    pub fn new(store: Arc<dyn Store>, moderator: M) -> Self {
        Self { store, moderator }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    // -- Propositions --

    pub async fn create_proposal(&self, actor: &Actor, draft: ProposalDraft) -> CoreResult<Proposal> {
        authorize(Some(actor), Operation::CreateProposal)?;

        let problem = required(&draft.problem, "problem")?;
        let solution = required(&draft.solution, "solution")?;
        let impact = optional(draft.impact.as_deref());
        if draft.ministry_id.is_none() && draft.province_id.is_none() {
            return Err(CoreError::validation("ministry_id or province_id is required"));
        }

        self.check_target(draft.ministry_id, draft.province_id).await?;

        let verdict = self
            .moderate(&proposal_text(&problem, &solution, impact.as_deref()))
            .await;

        let new = NewProposal {
            id: Uuid::new_v4(),
            author_id: actor.id,
            ministry_id: draft.ministry_id,
            province_id: draft.province_id,
            problem,
            solution,
            impact,
            status: ProposalStatus::default(),
            moderation_score: verdict.score,
            flagged_for_review: verdict.flagged,
            created_at: Utc::now(),
        };
        let id = new.id;
        blocking(&self.store, move |s| s.insert_proposal(&new)).await?;

        info!(
            "Proposition {} created by {} (score {}, flagged {})",
            id, actor.id, verdict.score, verdict.flagged
        );
        self.require_proposal(id).await
    }

    pub async fn revise_proposal(
        &self,
        actor: &Actor,
        id: Uuid,
        revision: ProposalRevision,
    ) -> CoreResult<Proposal> {
        let op = Operation::ReviseOwnProposal;
        authorize(Some(actor), op)?;

        let problem = revision.problem.as_deref().map(|p| required(p, "problem")).transpose()?;
        let solution = revision.solution.as_deref().map(|s| required(s, "solution")).transpose()?;

        let current = self.proposal(Some(actor), id).await?;
        authorize_owner(actor, current.author_id, op)?;
        if current.is_published() {
            return Err(published_conflict("edited"));
        }

        let problem = problem.unwrap_or(current.problem);
        let solution = solution.unwrap_or(current.solution);
        let impact = match revision.impact {
            Some(impact) => optional(Some(&impact)),
            None => current.impact,
        };

        let verdict = self
            .moderate(&proposal_text(&problem, &solution, impact.as_deref()))
            .await;
        let content = ProposalContent {
            problem,
            solution,
            impact,
            moderation_score: verdict.score,
            flagged_for_review: verdict.flagged,
        };
        let updated = blocking(&self.store, move |s| s.update_proposal_content(id, &content)).await?;
        if !updated {
            return Err(self.refused_author_write(id, "edited").await);
        }

        info!("Proposition {} revised by its author", id);
        self.require_proposal(id).await
    }

    pub async fn withdraw_proposal(&self, actor: &Actor, id: Uuid) -> CoreResult<()> {
        let op = Operation::WithdrawOwnProposal;
        authorize(Some(actor), op)?;

        let current = self.proposal(Some(actor), id).await?;
        authorize_owner(actor, current.author_id, op)?;
        if current.is_published() {
            return Err(published_conflict("withdrawn"));
        }

        if !blocking(&self.store, move |s| s.delete_unpublished_proposal(id)).await? {
            return Err(self.refused_author_write(id, "withdrawn").await);
        }
        info!("Proposition {} withdrawn by its author", id);
        Ok(())
    }

    /// Published propositions are public; unpublished ones are visible to
    /// their author and to staff only. Anyone else gets not-found, here and
    /// on the vote and comment routes of the same proposition.
    pub async fn proposal(&self, viewer: Option<&Actor>, id: Uuid) -> CoreResult<Proposal> {
        let proposal = self.require_proposal(id).await?;
        let allowed = proposal.is_published()
            || viewer.is_some_and(|a| a.is_staff() || a.id == proposal.author_id);
        if allowed {
            Ok(proposal)
        } else {
            Err(CoreError::NotFound("proposition"))
        }
    }

    pub async fn list_proposals(
        &self,
        viewer: Option<&Actor>,
        query: ListQuery,
    ) -> CoreResult<Vec<Proposal>> {
        let mut filter = ProposalFilter {
            ministry_id: query.ministry_id,
            province_id: query.province_id,
            ..ProposalFilter::default()
        };
        match query.view {
            ListView::Published => filter.publication = Publication::Published,
            ListView::Pending => {
                let actor = authorize(viewer, Operation::ListPending)?;
                filter.author_id = Some(actor.id);
                filter.publication = Publication::Unpublished;
            }
            ListView::All => {
                authorize(viewer, Operation::ListAll)?;
            }
        }

        filter.status = match query.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(status) => Some(parse_status(status)?),
        };
        filter.sort = match query.sort.as_deref().map(str::trim) {
            None | Some("") | Some("recent") => SortOrder::Recent,
            Some("popular") => SortOrder::Popular,
            Some(other) => {
                return Err(CoreError::validation(format!(
                    "invalid sort '{other}' (allowed: recent, popular)"
                )));
            }
        };

        Ok(blocking(&self.store, move |s| s.proposals(&filter)).await?)
    }

    // -- Staff workflow --

    /// Sets the workflow label. Never touches the official response.
    pub async fn set_status(&self, actor: &Actor, id: Uuid, status: &str) -> CoreResult<Proposal> {
        authorize(Some(actor), Operation::ChangeStatus)?;
        let status = parse_status(status.trim())?;

        let updated = blocking(&self.store, move |s| s.set_proposal_status(id, status)).await?;
        if !updated {
            return Err(CoreError::NotFound("proposition"));
        }

        info!("Proposition {} moved to {} by {}", id, status, actor.id);
        self.require_proposal(id).await
    }

    /// Publishes with an official response text. Never touches the status.
    pub async fn publish_response(
        &self,
        actor: &Actor,
        id: Uuid,
        response: &str,
    ) -> CoreResult<Proposal> {
        authorize(Some(actor), Operation::PublishResponse)?;
        let response = required(response, "official_response")?;

        let updated = blocking(&self.store, move |s| s.set_official_response(id, &response)).await?;
        if !updated {
            return Err(CoreError::NotFound("proposition"));
        }

        info!("Official response published on proposition {} by {}", id, actor.id);
        self.require_proposal(id).await
    }

    /// Publishes with the fixed sentinel text. Repeating the call is a no-op,
    /// and an existing official response is kept.
    pub async fn publish_as_is(&self, actor: &Actor, id: Uuid) -> CoreResult<Proposal> {
        authorize(Some(actor), Operation::PublishAsIs)?;

        let current = self.require_proposal(id).await?;
        if current.is_published() {
            return Ok(current);
        }

        let updated = blocking(&self.store, move |s| {
            s.set_official_response(id, PUBLISHED_WITHOUT_RESPONSE)
        })
        .await?;
        if !updated {
            return Err(CoreError::NotFound("proposition"));
        }

        info!("Proposition {} published without response by {}", id, actor.id);
        self.require_proposal(id).await
    }

    pub async fn delete_proposal(&self, actor: &Actor, id: Uuid) -> CoreResult<()> {
        authorize(Some(actor), Operation::DeleteProposal)?;
        self.remove(id).await?;
        info!("Proposition {} deleted by {}", id, actor.id);
        Ok(())
    }

    pub async fn stats(&self, actor: &Actor) -> CoreResult<AdminStats> {
        authorize(Some(actor), Operation::ViewStats)?;
        let mut stats = blocking(&self.store, |s| s.stats()).await?;
        for status in ProposalStatus::ALL {
            stats.proposals.by_status.entry(status).or_insert(0);
        }
        Ok(stats)
    }

    // -- Votes --

    /// One row per (user, proposition): the first vote inserts, later votes
    /// overwrite the type. Casting the same type again changes nothing.
    pub async fn cast_vote(&self, actor: &Actor, proposal_id: Uuid, kind: &str) -> CoreResult<Vote> {
        authorize(Some(actor), Operation::Vote)?;
        let kind: VoteKind = kind
            .trim()
            .parse()
            .map_err(|e: UnknownVariant| CoreError::validation(e.to_string()))?;

        self.proposal(Some(actor), proposal_id).await?;

        let vote = Vote {
            user_id: actor.id,
            proposal_id,
            kind,
            updated_at: Utc::now(),
        };
        let first = vote.clone();
        match blocking(&self.store, move |s| s.upsert_vote(&first)).await {
            Err(StoreError::Duplicate(_)) => {
                // Lost an insert race against our own concurrent vote.
                let retry = vote.clone();
                blocking(&self.store, move |s| s.upsert_vote(&retry)).await?;
            }
            other => other?,
        }

        Ok(vote)
    }

    pub async fn tally(&self, viewer: Option<&Actor>, proposal_id: Uuid) -> CoreResult<VoteTally> {
        self.proposal(viewer, proposal_id).await?;
        let votes = blocking(&self.store, move |s| s.votes(proposal_id)).await?;

        let mut tally = VoteTally::default();
        for vote in &votes {
            match vote.kind {
                VoteKind::Like => tally.likes += 1,
                VoteKind::Dislike => tally.dislikes += 1,
            }
        }
        tally.user_vote = viewer.and_then(|actor| {
            votes
                .iter()
                .find(|v| v.user_id == actor.id)
                .map(|v| v.kind)
        });
        Ok(tally)
    }

    // -- Comments --

    pub async fn add_comment(
        &self,
        actor: &Actor,
        proposal_id: Uuid,
        content: &str,
    ) -> CoreResult<Comment> {
        authorize(Some(actor), Operation::Comment)?;
        let content = required(content, "content")?;

        self.proposal(Some(actor), proposal_id).await?;

        let verdict = self.moderate(&content).await;
        let new = NewComment {
            id: Uuid::new_v4(),
            proposal_id,
            author_id: actor.id,
            content,
            moderation_score: verdict.score,
            flagged_for_review: verdict.flagged,
            created_at: Utc::now(),
        };
        let id = new.id;
        blocking(&self.store, move |s| s.insert_comment(&new)).await?;

        blocking(&self.store, move |s| s.comment(id))
            .await?
            .ok_or(CoreError::NotFound("comment"))
    }

    /// Oldest first. Flagged comments are listed like any other.
    pub async fn comments(
        &self,
        viewer: Option<&Actor>,
        proposal_id: Uuid,
    ) -> CoreResult<Vec<Comment>> {
        self.proposal(viewer, proposal_id).await?;
        Ok(blocking(&self.store, move |s| s.comments(proposal_id)).await?)
    }

    // -- Internals --

    async fn moderate(&self, text: &str) -> ModerationVerdict {
        let outcome = self.moderator.check(text).await;
        if let ModerationOutcome::Unavailable(reason) = &outcome {
            warn!("Moderation unavailable, accepting content unflagged: {}", reason);
        }
        outcome.verdict()
    }

    async fn require_proposal(&self, id: Uuid) -> CoreResult<Proposal> {
        blocking(&self.store, move |s| s.proposal(id))
            .await?
            .ok_or(CoreError::NotFound("proposition"))
    }

    /// A conditional author write matched nothing: the row is gone, or staff
    /// published it after it was read.
    async fn refused_author_write(&self, id: Uuid, action: &str) -> CoreError {
        match self.require_proposal(id).await {
            Ok(_) => published_conflict(action),
            Err(e) => e,
        }
    }

    async fn check_target(&self, ministry_id: Option<i64>, province_id: Option<i64>) -> CoreResult<()> {
        if let Some(id) = ministry_id {
            if blocking(&self.store, move |s| s.ministry(id)).await?.is_none() {
                return Err(CoreError::validation(format!("unknown ministry {id}")));
            }
        }
        if let Some(id) = province_id {
            if blocking(&self.store, move |s| s.province(id)).await?.is_none() {
                return Err(CoreError::validation(format!("unknown province {id}")));
            }
        }
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> CoreResult<()> {
        if blocking(&self.store, move |s| s.delete_proposal(id)).await? {
            Ok(())
        } else {
            Err(CoreError::NotFound("proposition"))
        }
    }
}

fn published_conflict(action: &str) -> CoreError {
    CoreError::Conflict(format!("a published proposition can no longer be {action}"))
}

fn required(value: &str, field: &str) -> CoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(CoreError::validation(format!("{field} is required")))
    } else {
        Ok(value.to_string())
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_status(value: &str) -> CoreResult<ProposalStatus> {
    value
        .parse()
        .map_err(|e: UnknownVariant| CoreError::validation(e.to_string()))
}
