use civic_core::store::{NewComment, NewProposal, ProposalContent, ProposalFilter, UserRecord};
use civic_core::{Store, StoreError, StoreResult};
use civic_types::models::{
    AdminStats, Comment, Ministry, Proposal, ProposalStatus, Province, Role, User, Vote,
};
use rusqlite::ffi;
use uuid::Uuid;

use crate::Database;

/// Unique and primary-key violations become [`StoreError::Duplicate`].
fn classify(err: anyhow::Error, what: &str) -> StoreError {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            StoreError::Duplicate(what.to_string())
        }
        _ => StoreError::Backend(err),
    }
}

impl Store for Database {
    fn insert_user(&self, record: &UserRecord) -> StoreResult<()> {
        let u = &record.user;
        self.create_user(u.id, &u.name, &u.email, &record.password_hash, u.role, u.created_at)
            .map_err(|e| classify(e, "email"))
    }

    fn user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let Some(row) = self.get_user_by_email(email)? else {
            return Ok(None);
        };
        let (user, password_hash) = row.into_user()?;
        Ok(Some(UserRecord { user, password_hash }))
    }

    fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        match self.get_user_by_id(id)? {
            Some(row) => Ok(Some(row.into_user()?.0)),
            None => Ok(None),
        }
    }

    fn set_user_role(&self, email: &str, role: Role) -> StoreResult<bool> {
        Ok(Database::set_user_role(self, email, role)?)
    }

    fn ministries(&self) -> StoreResult<Vec<Ministry>> {
        Ok(self.list_ministries()?)
    }

    fn ministry(&self, id: i64) -> StoreResult<Option<Ministry>> {
        Ok(self.get_ministry(id)?)
    }

    fn provinces(&self) -> StoreResult<Vec<Province>> {
        Ok(self.list_provinces()?)
    }

    fn province(&self, id: i64) -> StoreResult<Option<Province>> {
        Ok(self.get_province(id)?)
    }

    fn insert_proposal(&self, proposal: &NewProposal) -> StoreResult<()> {
        Database::insert_proposal(self, proposal).map_err(|e| classify(e, "proposition"))
    }

    fn proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        match self.get_proposal(id)? {
            Some(row) => Ok(Some(Proposal::try_from(row)?)),
            None => Ok(None),
        }
    }

    fn proposals(&self, filter: &ProposalFilter) -> StoreResult<Vec<Proposal>> {
        let rows = self.list_proposals(filter)?;
        let proposals = rows
            .into_iter()
            .map(Proposal::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(proposals)
    }

    fn update_proposal_content(&self, id: Uuid, content: &ProposalContent) -> StoreResult<bool> {
        Ok(Database::update_proposal_content(self, id, content)?)
    }

    fn set_proposal_status(&self, id: Uuid, status: ProposalStatus) -> StoreResult<bool> {
        Ok(Database::set_proposal_status(self, id, status)?)
    }

    fn set_official_response(&self, id: Uuid, response: &str) -> StoreResult<bool> {
        Ok(Database::set_official_response(self, id, response)?)
    }

    fn delete_proposal(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Database::delete_proposal(self, id)?)
    }

    fn delete_unpublished_proposal(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Database::delete_unpublished_proposal(self, id)?)
    }

    fn upsert_vote(&self, vote: &Vote) -> StoreResult<()> {
        Database::upsert_vote(self, vote).map_err(|e| classify(e, "vote"))
    }

    fn votes(&self, proposal_id: Uuid) -> StoreResult<Vec<Vote>> {
        let votes = self
            .get_votes(proposal_id)?
            .into_iter()
            .map(Vote::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(votes)
    }

    fn insert_comment(&self, comment: &NewComment) -> StoreResult<()> {
        Database::insert_comment(self, comment).map_err(|e| classify(e, "comment"))
    }

    fn comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        match self.get_comment(id)? {
            Some(row) => Ok(Some(Comment::try_from(row)?)),
            None => Ok(None),
        }
    }

    fn comments(&self, proposal_id: Uuid) -> StoreResult<Vec<Comment>> {
        let comments = self
            .get_comments(proposal_id)?
            .into_iter()
            .map(Comment::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(comments)
    }

    fn stats(&self) -> StoreResult<AdminStats> {
        Ok(Database::stats(self)?)
    }
}
