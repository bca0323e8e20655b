use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}' (allowed: {})", .allowed.join(", "))]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub allowed: &'static [&'static str],
}

// -- Roles --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    MinistryResponsible,
    Admin,
}

impl Role {
    const NAMES: &'static [&'static str] = &["citizen", "ministry_responsible", "admin"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::MinistryResponsible => "ministry_responsible",
            Self::Admin => "admin",
        }
    }

    /// Admins and ministry responsibles manage propositions.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::MinistryResponsible)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "citizen" => Ok(Self::Citizen),
            "ministry_responsible" => Ok(Self::MinistryResponsible),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
                allowed: Self::NAMES,
            }),
        }
    }
}

// -- Proposition workflow status --

/// Workflow label set by staff. Independent of publication.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    #[default]
    Received,
    UnderAnalysis,
    Retained,
    InExecution,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 4] = [
        Self::Received,
        Self::UnderAnalysis,
        Self::Retained,
        Self::InExecution,
    ];

    const NAMES: &'static [&'static str] =
        &["received", "under_analysis", "retained", "in_execution"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::UnderAnalysis => "under_analysis",
            Self::Retained => "retained",
            Self::InExecution => "in_execution",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "status",
                value: s.to_string(),
                allowed: Self::NAMES,
            })
    }
}

// -- Votes --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    const NAMES: &'static [&'static str] = &["like", "dislike"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            other => Err(UnknownVariant {
                kind: "vote type",
                value: other.to_string(),
                allowed: Self::NAMES,
            }),
        }
    }
}

// -- Records --

/// A registered account. The password hash never leaves the store layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ministry {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub attributions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Province {
    pub id: i64,
    pub name: String,
    pub government: Option<String>,
}

/// A proposition as read back from the store, with its display names and
/// vote/comment counts resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
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
    pub moderation_score: u8,
    pub flagged_for_review: bool,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub dislikes: u64,
    pub comment_count: u64,
}

impl Proposal {
    pub fn is_published(&self) -> bool {
        self.official_response.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub moderation_score: u8,
    pub flagged_for_review: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub user_id: Uuid,
    pub proposal_id: Uuid,
    #[serde(rename = "type")]
    pub kind: VoteKind,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate vote counts for one proposition, plus the viewer's own vote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteTally {
    pub likes: u64,
    pub dislikes: u64,
    pub user_vote: Option<VoteKind>,
}

// -- Admin statistics --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminStats {
    pub proposals: ProposalStats,
    pub comments: CommentStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposalStats {
    pub total: u64,
    pub flagged: u64,
    pub published: u64,
    pub by_status: BTreeMap<ProposalStatus, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentStats {
    pub total: u64,
    pub flagged: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_every_known_value() {
        for status in ProposalStatus::ALL {
            assert_eq!(status.as_str().parse::<ProposalStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_lists_allowed_values() {
        let err = "archived".parse::<ProposalStatus>().unwrap_err();
        assert_eq!(err.kind, "status");
        assert!(err.to_string().contains("under_analysis"));

        let err = "voter".parse::<Role>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid role 'voter' (allowed: citizen, ministry_responsible, admin)"
        );
    }

    #[test]
    fn vote_kind_is_case_sensitive() {
        assert_eq!("like".parse::<VoteKind>().unwrap(), VoteKind::Like);
        assert!("Like".parse::<VoteKind>().is_err());
    }

    #[test]
    fn only_admin_and_ministry_are_staff() {
        assert!(Role::Admin.is_staff());
        assert!(Role::MinistryResponsible.is_staff());
        assert!(!Role::Citizen.is_staff());
    }

    #[test]
    fn tally_serializes_missing_user_vote_as_null() {
        let tally = VoteTally { likes: 3, dislikes: 1, user_vote: None };
        let json = serde_json::to_value(&tally).unwrap();
        assert!(json["user_vote"].is_null());

        let tally = VoteTally { user_vote: Some(VoteKind::Dislike), ..tally };
        assert_eq!(serde_json::to_value(&tally).unwrap()["user_vote"], "dislike");
    }

    #[test]
    fn stats_serialize_status_keys_in_snake_case() {
        let mut stats = AdminStats::default();
        stats.proposals.by_status.insert(ProposalStatus::InExecution, 2);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["proposals"]["by_status"]["in_execution"], 2);
    }
}
