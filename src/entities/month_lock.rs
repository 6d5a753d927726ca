//! Month lock entity - Freeze state of one mess's ledger for one month.
//!
//! A missing row means the month has never been locked.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Month lock database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "month_locks")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Mess the lock applies to
    pub mess_id: i64,
    /// Month the lock applies to (`YYYY-MM`)
    pub month: String,
    /// Whether the ledger is frozen
    pub is_locked: bool,
    /// Manager who last locked the month
    pub locked_by: Option<String>,
    /// When the month was last locked
    pub locked_at: Option<DateTimeUtc>,
    /// Whether an unlock request is waiting for a decision
    pub unlock_requested: bool,
    /// Member who asked for the unlock
    pub requested_by: Option<String>,
    /// When a temporary unlock lapses back to locked
    pub unlock_expiry: Option<DateTimeUtc>,
    /// When the record last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `MonthLock` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each lock record belongs to one mess
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
