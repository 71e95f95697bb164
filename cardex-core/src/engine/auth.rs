//! Who is acting, and what they may do.
//!
//! Authentication happens at the server edge; by the time an operation runs
//! the caller is an [`AuthorizationContext`].

use super::error::EngineError;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    /// The arbiter. Approves, rejects and resolves.
    Admin,
    /// Background jobs such as the listing expiry sweep.
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationContext {
    actor: Uuid,
    role: Role,
}

impl AuthorizationContext {
    pub fn user(actor: Uuid) -> Self {
        Self {
            actor,
            role: Role::User,
        }
    }

    pub fn admin(actor: Uuid) -> Self {
        Self {
            actor,
            role: Role::Admin,
        }
    }

    pub fn system() -> Self {
        Self {
            actor: Uuid::nil(),
            role: Role::System,
        }
    }

    pub fn actor(&self) -> Uuid {
        self.actor
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_privileged(&self) -> bool {
        matches!(self.role, Role::Admin | Role::System)
    }

    pub fn require_admin(&self) -> Result<(), EngineError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(EngineError::Forbidden("arbiter privileges required"))
        }
    }

    pub fn require_privileged(&self) -> Result<(), EngineError> {
        if self.is_privileged() {
            Ok(())
        } else {
            Err(EngineError::Forbidden("privileged caller required"))
        }
    }

    /// The user an operation acts on behalf of. Background jobs have none.
    pub fn acting_user(&self) -> Result<Uuid, EngineError> {
        match self.role {
            Role::System => Err(EngineError::Forbidden("background jobs cannot act as a user")),
            Role::User | Role::Admin => Ok(self.actor),
        }
    }

    /// Admins may read anything; users only what they own.
    pub fn can_view(&self, owner: Uuid) -> bool {
        self.is_privileged() || self.actor == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admins_pass_the_arbiter_check() {
        let id = Uuid::now_v7();
        assert!(AuthorizationContext::admin(id).require_admin().is_ok());
        assert!(matches!(
            AuthorizationContext::user(id).require_admin(),
            Err(EngineError::Forbidden(_))
        ));
        assert!(AuthorizationContext::system().require_admin().is_err());
    }

    #[test]
    fn system_is_privileged_but_not_a_user() {
        let ctx = AuthorizationContext::system();
        assert!(ctx.require_privileged().is_ok());
        assert!(ctx.acting_user().is_err());
        assert!(AuthorizationContext::user(Uuid::now_v7()).require_privileged().is_err());
    }

    #[test]
    fn users_view_only_their_own_records() {
        let owner = Uuid::now_v7();
        assert!(AuthorizationContext::user(owner).can_view(owner));
        assert!(!AuthorizationContext::user(Uuid::now_v7()).can_view(owner));
        assert!(AuthorizationContext::admin(Uuid::now_v7()).can_view(owner));
    }
}
