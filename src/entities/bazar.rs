//! Bazar entity - A grocery purchase feeding the meal cost pool.
//!
//! `month` is always derived from `date` when the row is written.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bazar database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bazars")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Mess the purchase was made for
    pub mess_id: i64,
    /// Member who did the shopping
    pub buyer_id: String,
    /// Amount spent
    pub amount: Decimal,
    /// Free-text list of items bought
    pub items: String,
    /// Calendar day of the purchase
    pub date: Date,
    /// Settlement month (`YYYY-MM`) of `date`
    pub month: String,
    /// `"pending"` or `"approved"`
    pub status: String,
    /// User ID who recorded the entry
    pub created_by: String,
    /// When the entry was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Bazar and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one mess
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
