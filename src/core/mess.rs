//! Mess registry - messes, membership and role assignment.
//!
//! Supplies the two things every ledger operation needs: the active member
//! set of a mess and the [`Actor`] for a caller.

use crate::{
    core::roles::{Actor, Operation, Role, RoleSet, authorize},
    entities::{Member, MemberModel, Mess, member, mess},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::fmt;
use std::str::FromStr;
use tracing::{info, instrument};

/// Lifecycle of a membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    /// Asked to join, waiting for an admin
    Pending,
    /// Full member, included in equal splits
    Active,
    /// Former member; their history still settles
    Left,
}

impl MemberStatus {
    /// Stored form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Left => "left",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "left" => Ok(Self::Left),
            other => Err(Error::validation(format!("unknown member status '{other}'"))),
        }
    }
}

/// Parsed status of a stored member row. Unknown values read as pending so
/// they grant nothing.
fn status_of(member: &MemberModel) -> MemberStatus {
    member.status.parse().unwrap_or(MemberStatus::Pending)
}

/// Loads a mess or fails with `NotFound`.
pub async fn require_mess<C: ConnectionTrait>(conn: &C, mess_id: i64) -> Result<mess::Model> {
    Mess::find_by_id(mess_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Mess", mess_id))
}

/// Creates a mess. The creator becomes its first admin and an active member.
///
/// # Errors
/// `Validation` for a blank name or a guild that already has a mess.
#[instrument(skip(db))]
pub async fn create_mess(
    db: &DatabaseConnection,
    name: &str,
    guild_id: Option<String>,
    creator_id: &str,
    creator_name: &str,
) -> Result<mess::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("mess name cannot be empty"));
    }

    let txn = db.begin().await?;

    if let Some(guild) = &guild_id {
        let existing = Mess::find()
            .filter(mess::Column::GuildId.eq(guild.as_str()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(Error::validation("this server already has a mess"));
        }
    }

    let now = chrono::Utc::now();
    let created = mess::ActiveModel {
        name: Set(name.to_string()),
        guild_id: Set(guild_id),
        created_by: Set(creator_id.to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    member::ActiveModel {
        mess_id: Set(created.id),
        user_id: Set(creator_id.to_string()),
        name: Set(creator_name.to_string()),
        roles: Set(RoleSet::from_iter([Role::Admin, Role::Member]).to_stored()),
        status: Set(MemberStatus::Active.as_str().to_string()),
        joined_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(mess_id = created.id, "Created mess '{}'", created.name);
    Ok(created)
}

/// Loads a mess by ID.
pub async fn get_mess(db: &DatabaseConnection, mess_id: i64) -> Result<mess::Model> {
    require_mess(db, mess_id).await
}

/// Finds the mess bound to a Discord guild.
pub async fn get_mess_by_guild(
    db: &DatabaseConnection,
    guild_id: &str,
) -> Result<Option<mess::Model>> {
    Mess::find()
        .filter(mess::Column::GuildId.eq(guild_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks up one membership row.
pub async fn get_member<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    user_id: &str,
) -> Result<Option<MemberModel>> {
    Member::find()
        .filter(member::Column::MessId.eq(mess_id))
        .filter(member::Column::UserId.eq(user_id))
        .one(conn)
        .await
        .map_err(Into::into)
}

async fn require_member<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    user_id: &str,
) -> Result<MemberModel> {
    get_member(conn, mess_id, user_id)
        .await?
        .ok_or_else(|| Error::not_found("Member", user_id))
}

/// Checks that `user_id` is, or was, a full member of the mess. Ledger
/// entries may name former members so their history can be settled; pending
/// applicants and strangers are rejected.
pub async fn require_participant<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    user_id: &str,
) -> Result<MemberModel> {
    let member = get_member(conn, mess_id, user_id)
        .await?
        .ok_or_else(|| Error::validation(format!("user {user_id} is not a member of this mess")))?;
    if status_of(&member) == MemberStatus::Pending {
        return Err(Error::validation(format!(
            "user {user_id} has not been approved yet"
        )));
    }
    Ok(member)
}

/// Asks to join a mess. A former member may ask again.
///
/// # Errors
/// `Validation` if the user is already active or already waiting.
#[instrument(skip(db))]
pub async fn request_join(
    db: &DatabaseConnection,
    mess_id: i64,
    user_id: &str,
    name: &str,
) -> Result<MemberModel> {
    let txn = db.begin().await?;
    require_mess(&txn, mess_id).await?;

    let now = chrono::Utc::now();
    let joined = match get_member(&txn, mess_id, user_id).await? {
        Some(existing) => match status_of(&existing) {
            MemberStatus::Active => {
                return Err(Error::validation("you are already a member of this mess"));
            }
            MemberStatus::Pending => {
                return Err(Error::validation("your join request is already pending"));
            }
            MemberStatus::Left => {
                let mut rejoin: member::ActiveModel = existing.into();
                rejoin.name = Set(name.to_string());
                rejoin.roles = Set(Role::Member.as_str().to_string());
                rejoin.status = Set(MemberStatus::Pending.as_str().to_string());
                rejoin.joined_at = Set(now);
                rejoin.update(&txn).await?
            }
        },
        None => {
            member::ActiveModel {
                mess_id: Set(mess_id),
                user_id: Set(user_id.to_string()),
                name: Set(name.to_string()),
                roles: Set(Role::Member.as_str().to_string()),
                status: Set(MemberStatus::Pending.as_str().to_string()),
                joined_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;
    Ok(joined)
}

/// Accepts a pending join request. Approving an active member is a no-op.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn approve_member(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    user_id: &str,
) -> Result<MemberModel> {
    authorize(actor, Operation::ApproveMember)?;

    let txn = db.begin().await?;
    let member = require_member(&txn, mess_id, user_id).await?;
    let approved = match status_of(&member) {
        MemberStatus::Active => member,
        MemberStatus::Left => {
            return Err(Error::validation(format!(
                "{} left the mess; they need to request again",
                member.name
            )));
        }
        MemberStatus::Pending => {
            let mut active: member::ActiveModel = member.into();
            active.status = Set(MemberStatus::Active.as_str().to_string());
            active.update(&txn).await?
        }
    };
    txn.commit().await?;

    info!(mess_id, user_id, "Member approved");
    Ok(approved)
}

async fn active_admin_count<C: ConnectionTrait>(conn: &C, mess_id: i64) -> Result<usize> {
    let members = Member::find()
        .filter(member::Column::MessId.eq(mess_id))
        .filter(member::Column::Status.eq(MemberStatus::Active.as_str()))
        .all(conn)
        .await?;
    Ok(members
        .iter()
        .filter(|m| RoleSet::from_stored(&m.roles).contains(Role::Admin))
        .count())
}

/// Marks a member as having left. Their past entries keep settling.
///
/// # Errors
/// `Validation` if they are the only remaining admin.
#[instrument(skip(db))]
pub async fn leave_mess(db: &DatabaseConnection, mess_id: i64, user_id: &str) -> Result<MemberModel> {
    let txn = db.begin().await?;
    let member = require_member(&txn, mess_id, user_id).await?;

    if status_of(&member) == MemberStatus::Active
        && RoleSet::from_stored(&member.roles).contains(Role::Admin)
        && active_admin_count(&txn, mess_id).await? <= 1
    {
        return Err(Error::validation(
            "the last admin cannot leave; make someone else admin first",
        ));
    }

    let mut left: member::ActiveModel = member.into();
    left.status = Set(MemberStatus::Left.as_str().to_string());
    let left = left.update(&txn).await?;
    txn.commit().await?;
    Ok(left)
}

/// Grants a role to an active member. Granting a held role is a no-op.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn assign_role(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    user_id: &str,
    role: Role,
) -> Result<MemberModel> {
    authorize(actor, Operation::AssignRole)?;

    let txn = db.begin().await?;
    let member = require_member(&txn, mess_id, user_id).await?;
    if status_of(&member) != MemberStatus::Active {
        return Err(Error::validation(format!(
            "{} is not an active member",
            member.name
        )));
    }

    let mut roles = RoleSet::from_stored(&member.roles);
    if !roles.insert(role) {
        return Ok(member);
    }
    let mut updated: member::ActiveModel = member.into();
    updated.roles = Set(roles.to_stored());
    let updated = updated.update(&txn).await?;
    txn.commit().await?;

    info!(mess_id, user_id, role = %role, "Role assigned");
    Ok(updated)
}

/// Revokes a role. Revoking a role that is not held is a no-op.
///
/// # Errors
/// `Validation` when it would leave the mess without an admin.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn remove_role(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    user_id: &str,
    role: Role,
) -> Result<MemberModel> {
    authorize(actor, Operation::AssignRole)?;

    let txn = db.begin().await?;
    let member = require_member(&txn, mess_id, user_id).await?;
    let mut roles = RoleSet::from_stored(&member.roles);
    if !roles.contains(role) {
        return Ok(member);
    }
    if role == Role::Admin
        && status_of(&member) == MemberStatus::Active
        && active_admin_count(&txn, mess_id).await? <= 1
    {
        return Err(Error::validation("a mess must keep at least one admin"));
    }

    roles.remove(role);
    let mut updated: member::ActiveModel = member.into();
    updated.roles = Set(roles.to_stored());
    let updated = updated.update(&txn).await?;
    txn.commit().await?;

    info!(mess_id, user_id, role = %role, "Role removed");
    Ok(updated)
}

/// Lists members of a mess, optionally only those with `status`, by user ID.
pub async fn list_members(
    db: &DatabaseConnection,
    mess_id: i64,
    status: Option<MemberStatus>,
) -> Result<Vec<MemberModel>> {
    let mut query = Member::find().filter(member::Column::MessId.eq(mess_id));
    if let Some(status) = status {
        query = query.filter(member::Column::Status.eq(status.as_str()));
    }
    query
        .order_by_asc(member::Column::UserId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// User IDs of the active members, in ascending order.
pub async fn active_member_ids<C: ConnectionTrait>(conn: &C, mess_id: i64) -> Result<Vec<String>> {
    Ok(Member::find()
        .filter(member::Column::MessId.eq(mess_id))
        .filter(member::Column::Status.eq(MemberStatus::Active.as_str()))
        .order_by_asc(member::Column::UserId)
        .all(conn)
        .await?
        .into_iter()
        .map(|m| m.user_id)
        .collect())
}

/// Resolves the caller of an operation. Anyone who is not an active member
/// gets an empty role set and so passes no permission check.
pub async fn actor_for<C: ConnectionTrait>(conn: &C, mess_id: i64, user_id: &str) -> Result<Actor> {
    let roles = match get_member(conn, mess_id, user_id).await? {
        Some(member) if status_of(&member) == MemberStatus::Active => {
            RoleSet::from_stored(&member.roles)
        }
        _ => RoleSet::new(),
    };
    Ok(Actor {
        user_id: user_id.to_string(),
        roles,
    })
}
