//! Payment entity - Cash paid in by a member towards the house or meal account.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Mess the payment was made to
    pub mess_id: i64,
    /// Member who paid
    pub user_id: String,
    /// Amount paid
    pub amount: Decimal,
    /// Ledger the payment counts towards: `"house"` or `"meal"`
    pub payment_type: String,
    /// `"pending"`, `"approved"` or `"rejected"`
    pub status: String,
    /// Settlement month (`YYYY-MM`)
    pub month: String,
    /// User ID who recorded the payment
    pub submitted_by: String,
    /// Manager who approved or rejected it
    pub approved_by: Option<String>,
    /// When the payment was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one mess
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
