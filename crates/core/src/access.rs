//! Actor identity and the mutation access policy.
//!
//! Authentication happens elsewhere. The caller hands in an [`Actor`]; the
//! lifecycle code records it on history rows and asks an [`AccessPolicy`]
//! whether the actor may change an owned entity.

use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;

/// Role held by a user within the organization.
///
/// Roles are ordered from lowest to highest privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access.
    Viewer = 0,
    /// Works their own deals and offers.
    Sales = 1,
    /// Manages other users' deals and offers.
    Manager = 2,
    /// Administers one company.
    CompanyAdmin = 3,
    /// Administers every company.
    SuperAdmin = 4,
}

impl Role {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "viewer" => Some(Self::Viewer),
            "sales" => Some(Self::Sales),
            "manager" => Some(Self::Manager),
            "company_admin" => Some(Self::CompanyAdmin),
            "super_admin" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Sales => "sales",
            Self::Manager => "manager",
            Self::CompanyAdmin => "company_admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Manager and above may modify entities they do not own.
    #[must_use]
    pub fn can_override_ownership(&self) -> bool {
        *self >= Self::Manager
    }
}

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user id from the identity provider.
    pub user_id: String,
    /// Name recorded on history rows.
    pub display_name: String,
    /// Roles granted to the user.
    pub roles: Vec<Role>,
}

impl Actor {
    /// Creates an actor without roles.
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            roles: Vec::new(),
        }
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    /// Returns true if the actor holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Decides whether an actor may mutate an entity.
pub trait AccessPolicy: Send + Sync + std::fmt::Debug {
    /// Returns true if `actor` may modify an entity owned by `owner_id`.
    fn can_modify(&self, actor: &Actor, owner_id: Option<&str>) -> bool;

    /// Like [`AccessPolicy::can_modify`], but returns `Forbidden` on refusal.
    fn authorize(
        &self,
        actor: &Actor,
        owner_id: Option<&str>,
        entity: &str,
    ) -> Result<(), LifecycleError> {
        if self.can_modify(actor, owner_id) {
            Ok(())
        } else {
            Err(LifecycleError::Forbidden(format!(
                "user {} may not modify this {entity}: not the owner and no manager role",
                actor.user_id
            )))
        }
    }
}

/// Owners may modify their own entities; managers and admins may modify any.
/// Entities without an owner are open to everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAccessPolicy;

impl AccessPolicy for RoleAccessPolicy {
    fn can_modify(&self, actor: &Actor, owner_id: Option<&str>) -> bool {
        match owner_id {
            None => true,
            Some(owner) if owner == actor.user_id => true,
            Some(_) => actor.roles.iter().any(Role::can_override_ownership),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("viewer", Role::Viewer)]
    #[case("SALES", Role::Sales)]
    #[case("manager", Role::Manager)]
    #[case("company_admin", Role::CompanyAdmin)]
    #[case("super_admin", Role::SuperAdmin)]
    fn test_role_parse(#[case] input: &str, #[case] role: Role) {
        assert_eq!(Role::parse(input), Some(role));
        assert_eq!(Role::parse(role.as_str()), Some(role));
    }

    #[test]
    fn test_role_parse_unknown() {
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_owner_may_modify() {
        let actor = Actor::new("u-1", "Ola").with_role(Role::Sales);
        assert!(RoleAccessPolicy.can_modify(&actor, Some("u-1")));
    }

    #[test]
    fn test_non_owner_without_manager_role_is_forbidden() {
        let actor = Actor::new("u-2", "Kari").with_role(Role::Sales);
        let err = RoleAccessPolicy
            .authorize(&actor, Some("u-1"), "deal")
            .unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[rstest]
    #[case(Role::Manager)]
    #[case(Role::CompanyAdmin)]
    #[case(Role::SuperAdmin)]
    fn test_manager_like_roles_override_ownership(#[case] role: Role) {
        let actor = Actor::new("u-2", "Kari").with_role(role);
        assert!(RoleAccessPolicy.can_modify(&actor, Some("u-1")));
    }

    #[test]
    fn test_unowned_entity_is_open() {
        let actor = Actor::new("u-3", "Per");
        assert!(RoleAccessPolicy.can_modify(&actor, None));
    }

    #[test]
    fn test_with_role_deduplicates() {
        let actor = Actor::new("u", "U").with_role(Role::Manager).with_role(Role::Manager);
        assert_eq!(actor.roles.len(), 1);
        assert!(actor.has_role(Role::Manager));
    }
}
