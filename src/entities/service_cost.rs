//! Service cost entity - Shared house bills (rent, gas, internet, ...).
//!
//! A cost without rows in `cost_shares` is split equally among the active
//! members; a cost with shares is charged exactly as listed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Service cost database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_costs")]
pub struct Model {
    /// Unique identifier for the cost
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Mess the cost is charged to
    pub mess_id: i64,
    /// Settlement month (`YYYY-MM`)
    pub month: String,
    /// Name of the bill (e.g., "Rent", "WiFi")
    pub name: String,
    /// Total amount of the bill
    pub amount: Decimal,
    /// `"pending"` or `"approved"`; only approved costs are settled
    pub status: String,
    /// User ID of the manager who recorded the cost
    pub created_by: String,
    /// When the cost was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ServiceCost` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each cost belongs to one mess
    #[sea_orm(
        belongs_to = "super::mess::Entity",
        from = "Column::MessId",
        to = "super::mess::Column::Id"
    )]
    Mess,
    /// One cost has many explicit shares
    #[sea_orm(has_many = "super::cost_share::Entity")]
    Shares,
}

impl Related<super::mess::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mess.def()
    }
}

impl Related<super::cost_share::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
