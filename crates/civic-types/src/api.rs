use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comment, Proposal, ProposalStatus, Role, User};

// -- JWT Claims --

/// Session token claims. The role is carried in the token and trusted for
/// the token's lifetime; it is not re-read from the store per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by both register and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&Claims> for SessionUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name.clone(),
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: SessionUser,
}

// -- Propositions --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateProposalRequest {
    pub ministry_id: Option<i64>,
    pub province_id: Option<i64>,
    pub problem: String,
    pub solution: String,
    pub impact: Option<String>,
}

/// Author revision of an unpublished proposition. Absent fields are kept.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReviseProposalRequest {
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub impact: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub ministry_id: Option<i64>,
    pub ministry_name: Option<String>,
    pub province_id: Option<i64>,
    pub province_name: Option<String>,
    pub problem: String,
    pub solution: String,
    pub impact: Option<String>,
    pub status: ProposalStatus,
    pub official_response: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub dislikes: u64,
    pub comment_count: u64,
    /// Staff views only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderation_score: Option<u8>,
    /// Staff views only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged_for_review: Option<bool>,
}

impl ProposalResponse {
    pub fn new(proposal: Proposal, with_moderation: bool) -> Self {
        let published = proposal.is_published();
        Self {
            id: proposal.id,
            author_id: proposal.author_id,
            author_name: proposal.author_name,
            ministry_id: proposal.ministry_id,
            ministry_name: proposal.ministry_name,
            province_id: proposal.province_id,
            province_name: proposal.province_name,
            problem: proposal.problem,
            solution: proposal.solution,
            impact: proposal.impact,
            status: proposal.status,
            official_response: proposal.official_response,
            published,
            created_at: proposal.created_at,
            likes: proposal.likes,
            dislikes: proposal.dislikes,
            comment_count: proposal.comment_count,
            moderation_score: with_moderation.then_some(proposal.moderation_score),
            flagged_for_review: with_moderation.then_some(proposal.flagged_for_review),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: bool,
    pub id: Uuid,
}

// -- Votes --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CastVoteRequest {
    #[serde(rename = "type", alias = "type_vote")]
    pub kind: String,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddCommentRequest {
    #[serde(alias = "contenu")]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderation_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged_for_review: Option<bool>,
}

impl CommentResponse {
    pub fn new(comment: Comment, with_moderation: bool) -> Self {
        Self {
            id: comment.id,
            proposal_id: comment.proposal_id,
            author_id: comment.author_id,
            author_name: comment.author_name,
            content: comment.content,
            created_at: comment.created_at,
            moderation_score: with_moderation.then_some(comment.moderation_score),
            flagged_for_review: with_moderation.then_some(comment.flagged_for_review),
        }
    }
}

// -- Admin --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetStatusRequest {
    #[serde(alias = "statut")]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OfficialResponseRequest {
    #[serde(alias = "reponse_officielle")]
    pub official_response: String,
}
