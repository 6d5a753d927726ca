//! Daily meal entity - One member's meal count for one day.
//!
//! There is at most one row per (`mess_id`, `user_id`, `date`); the batch
//! update path upserts on that key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Daily meal database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_meals")]
pub struct Model {
    /// Unique identifier for the row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Mess the meals were eaten in
    pub mess_id: i64,
    /// Member who ate
    pub user_id: String,
    /// Calendar day
    pub date: Date,
    /// Settlement month (`YYYY-MM`) of `date`
    pub month: String,
    /// Breakfast units (0, 0.5, 1, ...)
    pub breakfast: Decimal,
    /// Lunch units
    pub lunch: Decimal,
    /// Dinner units
    pub dinner: Decimal,
    /// Guest meals hosted by this member, charged to them
    pub guest_meals: i32,
    /// User ID of whoever last wrote the row
    pub updated_by: String,
    /// When the row was last written
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `DailyMeal` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each row belongs to one mess
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
