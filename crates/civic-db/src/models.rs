//! Database row types. These map directly to SQLite rows.
//! Converted into civic-types records at the store boundary.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use civic_types::models::{Comment, Proposal, User, Vote};
use uuid::Uuid;

/// Fixed-width RFC 3339 so that text order is chronological order.
pub fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("corrupt timestamp '{s}'"))?
        .with_timezone(&Utc))
}

fn decode_id(s: &str) -> Result<Uuid> {
    s.parse().with_context(|| format!("corrupt id '{s}'"))
}

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<(User, String)> {
        let user = User {
            id: decode_id(&self.id)?,
            name: self.name,
            email: self.email,
            role: self.role.parse()?,
            created_at: decode_time(&self.created_at)?,
        };
        Ok((user, self.password_hash))
    }
}

pub struct ProposalRow {
    pub id: String,
    pub author_id: String,
    pub author_name: Option<String>,
    pub ministry_id: Option<i64>,
    pub ministry_name: Option<String>,
    pub province_id: Option<i64>,
    pub province_name: Option<String>,
    pub problem: String,
    pub solution: String,
    pub impact: Option<String>,
    pub status: String,
    pub official_response: Option<String>,
    pub moderation_score: i64,
    pub flagged_for_review: bool,
    pub created_at: String,
    pub likes: i64,
    pub dislikes: i64,
    pub comment_count: i64,
}

impl TryFrom<ProposalRow> for Proposal {
    type Error = anyhow::Error;

    fn try_from(row: ProposalRow) -> Result<Self> {
        Ok(Proposal {
            id: decode_id(&row.id)?,
            author_id: decode_id(&row.author_id)?,
            author_name: row.author_name.unwrap_or_else(|| "unknown".to_string()),
            ministry_id: row.ministry_id,
            ministry_name: row.ministry_name,
            province_id: row.province_id,
            province_name: row.province_name,
            problem: row.problem,
            solution: row.solution,
            impact: row.impact,
            status: row.status.parse()?,
            official_response: row.official_response,
            moderation_score: row.moderation_score.clamp(0, 100) as u8,
            flagged_for_review: row.flagged_for_review,
            created_at: decode_time(&row.created_at)?,
            likes: row.likes.max(0) as u64,
            dislikes: row.dislikes.max(0) as u64,
            comment_count: row.comment_count.max(0) as u64,
        })
    }
}

pub struct CommentRow {
    pub id: String,
    pub proposal_id: String,
    pub author_id: String,
    pub author_name: Option<String>,
    pub content: String,
    pub moderation_score: i64,
    pub flagged_for_review: bool,
    pub created_at: String,
}

impl TryFrom<CommentRow> for Comment {
    type Error = anyhow::Error;

    fn try_from(row: CommentRow) -> Result<Self> {
        Ok(Comment {
            id: decode_id(&row.id)?,
            proposal_id: decode_id(&row.proposal_id)?,
            author_id: decode_id(&row.author_id)?,
            author_name: row.author_name.unwrap_or_else(|| "unknown".to_string()),
            content: row.content,
            moderation_score: row.moderation_score.clamp(0, 100) as u8,
            flagged_for_review: row.flagged_for_review,
            created_at: decode_time(&row.created_at)?,
        })
    }
}

pub struct VoteRow {
    pub user_id: String,
    pub proposal_id: String,
    pub kind: String,
    pub updated_at: String,
}

impl TryFrom<VoteRow> for Vote {
    type Error = anyhow::Error;

    fn try_from(row: VoteRow) -> Result<Self> {
        Ok(Vote {
            user_id: decode_id(&row.user_id)?,
            proposal_id: decode_id(&row.proposal_id)?,
            kind: row.kind.parse()?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encoded_times_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2026, 1, 9, 23, 59, 59).unwrap();
        let late = early + chrono::Duration::microseconds(1);
        assert!(encode_time(early) < encode_time(late));
        assert_eq!(decode_time(&encode_time(late)).unwrap(), late);
    }

    #[test]
    fn corrupt_vote_kind_is_an_error() {
        let row = VoteRow {
            user_id: Uuid::new_v4().to_string(),
            proposal_id: Uuid::new_v4().to_string(),
            kind: "meh".into(),
            updated_at: encode_time(Utc::now()),
        };
        assert!(Vote::try_from(row).is_err());
    }
}
