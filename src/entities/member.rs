//! Member entity - A user's membership in a mess.
//!
//! Roles are stored as a comma separated list (`"admin,member"`) and parsed
//! into a `RoleSet` by the core layer. Status is one of `pending`, `active`
//! or `left`; only active members take part in equal cost splits.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Member database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
pub struct Model {
    /// Unique identifier for the membership row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Mess this membership belongs to
    pub mess_id: i64,
    /// Discord user ID of the member
    pub user_id: String,
    /// Display name captured when the member joined
    pub name: String,
    /// Comma separated role names
    pub roles: String,
    /// Membership status: `"pending"`, `"active"` or `"left"`
    pub status: String,
    /// When the join request was made
    pub joined_at: DateTimeUtc,
}

/// Defines relationships between Member and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each member belongs to one mess
    #[sea_orm(
        belongs_to = "super::mess::Entity",
        from = "Column::MessId",
        to = "super::mess::Column::Id"
    )]
    Mess,
}

impl Related<super::mess::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mess.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
