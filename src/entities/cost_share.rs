//! Cost share entity - One member's explicit portion of a service cost.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cost share database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cost_shares")]
pub struct Model {
    /// Unique identifier for the share
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Service cost this share belongs to
    pub cost_id: i64,
    /// Member who owes this share
    pub user_id: String,
    /// Amount owed
    pub amount: Decimal,
}

/// Defines relationships between `CostShare` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each share belongs to one service cost and goes away with it
    #[sea_orm(
        belongs_to = "super::service_cost::Entity",
        from = "Column::CostId",
        to = "super::service_cost::Column::Id",
        on_delete = "Cascade"
    )]
    ServiceCost,
}

impl Related<super::service_cost::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceCost.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
