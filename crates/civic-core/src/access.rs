use civic_types::api::Claims;
use civic_types::models::Role;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

impl From<&Claims> for Actor {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name.clone(),
            role: claims.role,
        }
    }
}

/// Every gated operation, with the roles allowed to perform it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateProposal,
    ReviseOwnProposal,
    WithdrawOwnProposal,
    Vote,
    Comment,
    ListPending,
    ChangeStatus,
    PublishResponse,
    PublishAsIs,
    DeleteProposal,
    ListAll,
    ViewStats,
}

const ANY_ROLE: &[Role] = &[Role::Citizen, Role::MinistryResponsible, Role::Admin];
const STAFF: &[Role] = &[Role::Admin, Role::MinistryResponsible];

impl Operation {
    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::CreateProposal
            | Self::ReviseOwnProposal
            | Self::WithdrawOwnProposal
            | Self::Vote
            | Self::Comment
            | Self::ListPending => ANY_ROLE,
            Self::ChangeStatus
            | Self::PublishResponse
            | Self::PublishAsIs
            | Self::DeleteProposal
            | Self::ListAll
            | Self::ViewStats => STAFF,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::CreateProposal => "create a proposition",
            Self::ReviseOwnProposal => "revise this proposition",
            Self::WithdrawOwnProposal => "withdraw this proposition",
            Self::Vote => "vote",
            Self::Comment => "comment",
            Self::ListPending => "list pending propositions",
            Self::ChangeStatus => "change a proposition status",
            Self::PublishResponse => "publish an official response",
            Self::PublishAsIs => "publish a proposition",
            Self::DeleteProposal => "delete a proposition",
            Self::ListAll => "list all propositions",
            Self::ViewStats => "view moderation statistics",
        }
    }
}

/// Checks the role precondition of `op`. Must run before any store access.
pub fn authorize(actor: Option<&Actor>, op: Operation) -> CoreResult<&Actor> {
    let actor = actor.ok_or(CoreError::Unauthenticated)?;
    if op.allowed_roles().contains(&actor.role) {
        Ok(actor)
    } else {
        Err(CoreError::Forbidden(op))
    }
}

/// Author-only operations: the role check plus ownership of the record.
pub fn authorize_owner(actor: &Actor, owner: Uuid, op: Operation) -> CoreResult<()> {
    authorize(Some(actor), op)?;
    if actor.id == owner {
        Ok(())
    } else {
        Err(CoreError::Forbidden(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            name: "tester".into(),
            role,
        }
    }

    #[test]
    fn citizens_cannot_manage_propositions() {
        let citizen = actor(Role::Citizen);
        for op in [
            Operation::ChangeStatus,
            Operation::PublishResponse,
            Operation::PublishAsIs,
            Operation::DeleteProposal,
            Operation::ListAll,
            Operation::ViewStats,
        ] {
            assert!(matches!(
                authorize(Some(&citizen), op),
                Err(CoreError::Forbidden(o)) if o == op
            ));
        }
    }

    #[test]
    fn staff_roles_pass_management_checks() {
        for role in [Role::Admin, Role::MinistryResponsible] {
            let staff = actor(role);
            assert!(authorize(Some(&staff), Operation::ChangeStatus).is_ok());
            assert!(authorize(Some(&staff), Operation::PublishResponse).is_ok());
        }
    }

    #[test]
    fn every_role_may_participate() {
        for role in [Role::Citizen, Role::MinistryResponsible, Role::Admin] {
            let a = actor(role);
            assert!(authorize(Some(&a), Operation::CreateProposal).is_ok());
            assert!(authorize(Some(&a), Operation::Vote).is_ok());
            assert!(authorize(Some(&a), Operation::Comment).is_ok());
        }
    }

    #[test]
    fn missing_actor_is_unauthenticated_not_forbidden() {
        assert!(matches!(
            authorize(None, Operation::ChangeStatus),
            Err(CoreError::Unauthenticated)
        ));
    }

    #[test]
    fn owner_check_rejects_other_authors() {
        let a = actor(Role::Citizen);
        assert!(authorize_owner(&a, a.id, Operation::ReviseOwnProposal).is_ok());
        assert!(authorize_owner(&a, Uuid::new_v4(), Operation::ReviseOwnProposal).is_err());
    }
}
