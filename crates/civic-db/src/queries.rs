use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use civic_core::store::{NewComment, NewProposal, ProposalContent, ProposalFilter, Publication, SortOrder};
use civic_types::models::{
    AdminStats, CommentStats, Ministry, ProposalStats, ProposalStatus, Province, Role, Vote,
};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::Database;
use crate::models::{CommentRow, ProposalRow, UserRow, VoteRow, encode_time};

// Display names are joined in and counts are computed at read time.
const PROPOSAL_SELECT: &str = "
    SELECT p.id, p.author_id, u.name, p.ministry_id, m.name, p.province_id, pr.name,
           p.problem, p.solution, p.impact, p.status, p.official_response,
           p.moderation_score, p.flagged_for_review, p.created_at,
           (SELECT COUNT(*) FROM votes v WHERE v.proposal_id = p.id AND v.kind = 'like') AS likes,
           (SELECT COUNT(*) FROM votes v WHERE v.proposal_id = p.id AND v.kind = 'dislike') AS dislikes,
           (SELECT COUNT(*) FROM comments c WHERE c.proposal_id = p.id) AS comment_count
    FROM proposals p
    LEFT JOIN users u ON p.author_id = u.id
    LEFT JOIN ministries m ON p.ministry_id = m.id
    LEFT JOIN provinces pr ON p.province_id = pr.id";

const COMMENT_SELECT: &str = "
    SELECT c.id, c.proposal_id, c.author_id, u.name, c.content,
           c.moderation_score, c.flagged_for_review, c.created_at
    FROM comments c
    LEFT JOIN users u ON c.author_id = u.id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id.to_string(),
                    name,
                    email,
                    password_hash,
                    role.as_str(),
                    encode_time(created_at)
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    pub fn set_user_role(&self, email: &str, role: Role) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?1 WHERE email = ?2",
                rusqlite::params![role.as_str(), email],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Reference data --

    pub fn list_ministries(&self) -> Result<Vec<Ministry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, attributions FROM ministries ORDER BY name",
            )?;
            let rows = stmt
                .query_map([], ministry_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_ministry(&self, id: i64) -> Result<Option<Ministry>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, description, attributions FROM ministries WHERE id = ?1",
                [id],
                ministry_from_row,
            )
            .optional()
        })
    }

    pub fn list_provinces(&self) -> Result<Vec<Province>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, government FROM provinces ORDER BY name")?;
            let rows = stmt
                .query_map([], province_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_province(&self, id: i64) -> Result<Option<Province>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, government FROM provinces WHERE id = ?1",
                [id],
                province_from_row,
            )
            .optional()
        })
    }

    // -- Propositions --

    pub fn insert_proposal(&self, p: &NewProposal) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO proposals (id, author_id, ministry_id, province_id, problem, solution,
                                        impact, status, moderation_score, flagged_for_review, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    p.id.to_string(),
                    p.author_id.to_string(),
                    p.ministry_id,
                    p.province_id,
                    p.problem,
                    p.solution,
                    p.impact,
                    p.status.as_str(),
                    p.moderation_score,
                    p.flagged_for_review,
                    encode_time(p.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_proposal(&self, id: Uuid) -> Result<Option<ProposalRow>> {
        self.with_conn(|conn| {
            let sql = format!("{PROPOSAL_SELECT} WHERE p.id = ?1");
            conn.query_row(&sql, [id.to_string()], proposal_from_row).optional()
        })
    }

    pub fn list_proposals(&self, filter: &ProposalFilter) -> Result<Vec<ProposalRow>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(id) = filter.ministry_id {
            clauses.push("p.ministry_id = ?");
            params.push(Value::Integer(id));
        }
        if let Some(id) = filter.province_id {
            clauses.push("p.province_id = ?");
            params.push(Value::Integer(id));
        }
        if let Some(status) = filter.status {
            clauses.push("p.status = ?");
            params.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(author) = filter.author_id {
            clauses.push("p.author_id = ?");
            params.push(Value::Text(author.to_string()));
        }
        match filter.publication {
            Publication::Any => {}
            Publication::Published => clauses.push("p.official_response IS NOT NULL"),
            Publication::Unpublished => clauses.push("p.official_response IS NULL"),
        }

        let mut sql = PROPOSAL_SELECT.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(match filter.sort {
            SortOrder::Recent => " ORDER BY p.created_at DESC, p.rowid DESC",
            SortOrder::Popular => " ORDER BY likes DESC, p.created_at DESC, p.rowid DESC",
        });

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), proposal_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_proposal_content(&self, id: Uuid, content: &ProposalContent) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE proposals
                 SET problem = ?1, solution = ?2, impact = ?3,
                     moderation_score = ?4, flagged_for_review = ?5
                 WHERE id = ?6 AND official_response IS NULL",
                rusqlite::params![
                    content.problem,
                    content.solution,
                    content.impact,
                    content.moderation_score,
                    content.flagged_for_review,
                    id.to_string(),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_proposal_status(&self, id: Uuid, status: ProposalStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE proposals SET status = ?1 WHERE id = ?2",
                rusqlite::params![status.as_str(), id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_official_response(&self, id: Uuid, response: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE proposals SET official_response = ?1 WHERE id = ?2",
                rusqlite::params![response, id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Votes and comments go with it through ON DELETE CASCADE.
    pub fn delete_proposal(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM proposals WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }

    pub fn delete_unpublished_proposal(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM proposals WHERE id = ?1 AND official_response IS NULL",
                [id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Votes --

    /// Single statement: insert, or flip the type of the existing row.
    pub fn upsert_vote(&self, vote: &Vote) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO votes (user_id, proposal_id, kind, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, proposal_id)
                 DO UPDATE SET kind = excluded.kind, updated_at = excluded.updated_at",
                rusqlite::params![
                    vote.user_id.to_string(),
                    vote.proposal_id.to_string(),
                    vote.kind.as_str(),
                    encode_time(vote.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_votes(&self, proposal_id: Uuid) -> Result<Vec<VoteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, proposal_id, kind, updated_at FROM votes WHERE proposal_id = ?1",
            )?;
            let rows = stmt
                .query_map([proposal_id.to_string()], |row| {
                    Ok(VoteRow {
                        user_id: row.get(0)?,
                        proposal_id: row.get(1)?,
                        kind: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, c: &NewComment) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, proposal_id, author_id, content,
                                       moderation_score, flagged_for_review, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    c.id.to_string(),
                    c.proposal_id.to_string(),
                    c.author_id.to_string(),
                    c.content,
                    c.moderation_score,
                    c.flagged_for_review,
                    encode_time(c.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: Uuid) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{COMMENT_SELECT} WHERE c.id = ?1");
            conn.query_row(&sql, [id.to_string()], comment_from_row).optional()
        })
    }

    pub fn get_comments(&self, proposal_id: Uuid) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{COMMENT_SELECT} WHERE c.proposal_id = ?1 ORDER BY c.created_at ASC, c.rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([proposal_id.to_string()], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Stats --

    pub fn stats(&self) -> Result<AdminStats> {
        self.with_conn(|conn| {
            let (total, flagged, published): (i64, i64, i64) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(flagged_for_review), 0),
                        COALESCE(SUM(official_response IS NOT NULL), 0)
                 FROM proposals",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )?;

            let mut by_status = BTreeMap::new();
            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM proposals GROUP BY status")?;
            let counts = stmt
                .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            for (status, count) in counts {
                by_status.insert(status.parse::<ProposalStatus>()?, count as u64);
            }

            let (comments, flagged_comments): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(flagged_for_review), 0) FROM comments",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?;

            Ok(AdminStats {
                proposals: ProposalStats {
                    total: total as u64,
                    flagged: flagged as u64,
                    published: published as u64,
                    by_status,
                },
                comments: CommentStats {
                    total: comments as u64,
                    flagged: flagged_comments as u64,
                },
            })
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, name, email, password_hash, role, created_at FROM users WHERE {column} = ?1"
    );
    conn.query_row(&sql, [value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
        })
    })
    .optional()
}

fn ministry_from_row(row: &Row<'_>) -> rusqlite::Result<Ministry> {
    Ok(Ministry {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        attributions: row.get(3)?,
    })
}

fn province_from_row(row: &Row<'_>) -> rusqlite::Result<Province> {
    Ok(Province {
        id: row.get(0)?,
        name: row.get(1)?,
        government: row.get(2)?,
    })
}

fn proposal_from_row(row: &Row<'_>) -> rusqlite::Result<ProposalRow> {
    Ok(ProposalRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_name: row.get(2)?,
        ministry_id: row.get(3)?,
        ministry_name: row.get(4)?,
        province_id: row.get(5)?,
        province_name: row.get(6)?,
        problem: row.get(7)?,
        solution: row.get(8)?,
        impact: row.get(9)?,
        status: row.get(10)?,
        official_response: row.get(11)?,
        moderation_score: row.get(12)?,
        flagged_for_review: row.get(13)?,
        created_at: row.get(14)?,
        likes: row.get(15)?,
        dislikes: row.get(16)?,
        comment_count: row.get(17)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        proposal_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        content: row.get(4)?,
        moderation_score: row.get(5)?,
        flagged_for_review: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
