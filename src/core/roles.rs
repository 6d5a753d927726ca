//! Roles, callers and the per-operation permission table.
//!
//! Every mutating ledger operation takes the caller as an [`Actor`] and checks
//! it against [`Operation::required_roles`] before touching the database.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A role a member can hold inside a mess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Owns the mess: membership and role management
    Admin,
    /// Runs the books: costs, approvals, payments, locks
    Manager,
    /// Keeps the daily meal sheet
    MealManager,
    /// Regular member
    Member,
}

impl Role {
    /// Every role, in display order.
    pub const ALL: [Self; 4] = [Self::Admin, Self::Manager, Self::MealManager, Self::Member];

    /// Stable name used in storage and commands.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::MealManager => "meal_manager",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| Error::validation(format!("unknown role '{s}'")))
    }
}

/// The set of roles a member holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Empty set, as held by non-members.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Parses the comma separated form stored in the `members` table.
    /// Unknown names are skipped so a renamed role never locks anyone out.
    #[must_use]
    pub fn from_stored(stored: &str) -> Self {
        Self(
            stored
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .filter_map(|part| part.parse().ok())
                .collect(),
        )
    }

    /// Comma separated form for storage.
    #[must_use]
    pub fn to_stored(&self) -> String {
        self.0
            .iter()
            .map(|role| role.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Whether the set contains `role`.
    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Whether the set shares at least one role with `roles`.
    #[must_use]
    pub fn any_of(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.contains(*role))
    }

    /// Adds a role, returning whether it was newly added.
    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    /// Removes a role, returning whether it was present.
    pub fn remove(&mut self, role: Role) -> bool {
        self.0.remove(&role)
    }

    /// True when no role is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates roles in display order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&self.to_stored().replace(',', ", "))
        }
    }
}

/// The caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Discord user ID of the caller
    pub user_id: String,
    /// Roles the caller holds in the mess being acted on
    pub roles: RoleSet,
}

impl Actor {
    /// Builds an actor from a user ID and roles.
    pub fn new(user_id: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Admins and managers run the books.
    #[must_use]
    pub fn is_manager(&self) -> bool {
        self.roles.any_of(MANAGERS)
    }

    /// Any role at all means the caller is an active member.
    #[must_use]
    pub fn is_member(&self) -> bool {
        !self.roles.is_empty()
    }
}

const ADMINS: &[Role] = &[Role::Admin];
const MANAGERS: &[Role] = &[Role::Admin, Role::Manager];
const MEAL_KEEPERS: &[Role] = &[Role::Admin, Role::Manager, Role::MealManager];
const ANY_MEMBER: &[Role] = &[Role::Admin, Role::Manager, Role::MealManager, Role::Member];

/// Every mutating operation that is permission checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Record a service cost
    AddServiceCost,
    /// Approve a pending service cost
    ApproveServiceCost,
    /// Replace a cost's explicit shares
    UpdateCostShares,
    /// Delete a service cost
    DeleteServiceCost,
    /// Upsert a batch of daily meal rows
    BatchUpdateMeals,
    /// Record a bazar entry
    CreateBazar,
    /// Approve a pending bazar entry
    ApproveBazar,
    /// Edit a bazar entry
    EditBazar,
    /// Delete a bazar entry
    DeleteBazar,
    /// Record a payment
    SubmitPayment,
    /// Approve a pending payment
    VerifyPayment,
    /// Reject a pending payment
    RejectPayment,
    /// Lock a month
    LockMonth,
    /// Unlock a month directly
    UnlockMonth,
    /// Ask for a locked month to be reopened
    RequestUnlock,
    /// Grant or deny an unlock request
    DecideUnlock,
    /// Accept a join request
    ApproveMember,
    /// Grant or revoke roles
    AssignRole,
}

impl Operation {
    /// Roles allowed to perform the operation. Holding any one is enough.
    #[must_use]
    pub const fn required_roles(self) -> &'static [Role] {
        match self {
            Self::AddServiceCost
            | Self::ApproveServiceCost
            | Self::UpdateCostShares
            | Self::DeleteServiceCost
            | Self::ApproveBazar
            | Self::EditBazar
            | Self::DeleteBazar
            | Self::VerifyPayment
            | Self::RejectPayment
            | Self::LockMonth
            | Self::UnlockMonth
            | Self::DecideUnlock => MANAGERS,
            Self::BatchUpdateMeals => MEAL_KEEPERS,
            Self::CreateBazar | Self::SubmitPayment | Self::RequestUnlock => ANY_MEMBER,
            Self::ApproveMember | Self::AssignRole => ADMINS,
        }
    }

    /// Phrase used in error messages ("Not allowed to ...").
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AddServiceCost => "add a service cost",
            Self::ApproveServiceCost => "approve a service cost",
            Self::UpdateCostShares => "change cost shares",
            Self::DeleteServiceCost => "delete a service cost",
            Self::BatchUpdateMeals => "update meals",
            Self::CreateBazar => "add a bazar entry",
            Self::ApproveBazar => "approve a bazar entry",
            Self::EditBazar => "edit this bazar entry",
            Self::DeleteBazar => "delete this bazar entry",
            Self::SubmitPayment => "record a payment",
            Self::VerifyPayment => "verify a payment",
            Self::RejectPayment => "reject a payment",
            Self::LockMonth => "lock a month",
            Self::UnlockMonth => "unlock a month",
            Self::RequestUnlock => "request an unlock",
            Self::DecideUnlock => "decide an unlock request",
            Self::ApproveMember => "approve members",
            Self::AssignRole => "change roles",
        }
    }

    /// The error returned when the check fails.
    #[must_use]
    pub fn denied(self) -> Error {
        Error::Unauthorized {
            action: self.description(),
            required: self
                .required_roles()
                .iter()
                .map(|role| role.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Checks `actor` against the permission table.
pub fn authorize(actor: &Actor, operation: Operation) -> Result<()> {
    if actor.roles.any_of(operation.required_roles()) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %actor.user_id,
            roles = %actor.roles,
            ?operation,
            "permission denied"
        );
        Err(operation.denied())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_role_set_round_trip_through_storage() {
        let roles = RoleSet::from_stored("member,admin");
        assert!(roles.contains(Role::Admin));
        assert!(roles.contains(Role::Member));
        assert_eq!(roles.to_stored(), "admin,member");
        assert_eq!(roles.to_string(), "admin, member");
    }

    #[test]
    fn test_role_set_skips_unknown_names() {
        let roles = RoleSet::from_stored("member,,treasurer");
        assert_eq!(roles.iter().collect::<Vec<_>>(), vec![Role::Member]);
        assert!(RoleSet::from_stored("").is_empty());
    }

    #[test]
    fn test_member_cannot_add_cost() {
        let actor = Actor::new("u1", [Role::Member]);
        let err = authorize(&actor, Operation::AddServiceCost).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(err.to_string().contains("admin, manager"));
    }

    #[test]
    fn test_meal_manager_can_update_meals_only() {
        let actor = Actor::new("u1", [Role::MealManager, Role::Member]);
        assert!(authorize(&actor, Operation::BatchUpdateMeals).is_ok());
        assert!(authorize(&actor, Operation::ApproveBazar).is_err());
        assert!(!actor.is_manager());
    }

    #[test]
    fn test_admin_passes_manager_checks() {
        let actor = Actor::new("u1", [Role::Admin]);
        assert!(authorize(&actor, Operation::LockMonth).is_ok());
        assert!(authorize(&actor, Operation::AssignRole).is_ok());
        assert!(actor.is_manager());
    }

    #[test]
    fn test_manager_cannot_manage_roles() {
        let actor = Actor::new("u1", [Role::Manager, Role::Member]);
        assert!(authorize(&actor, Operation::AssignRole).is_err());
        assert!(authorize(&actor, Operation::VerifyPayment).is_ok());
    }

    #[test]
    fn test_outsider_holds_nothing() {
        let actor = Actor::new("stranger", []);
        assert!(!actor.is_member());
        assert!(authorize(&actor, Operation::CreateBazar).is_err());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("meal_manager".parse::<Role>().unwrap(), Role::MealManager);
        assert!("boss".parse::<Role>().is_err());
    }
}
