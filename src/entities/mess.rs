//! Mess entity - A shared household whose ledger is being tracked.
//!
//! Each Discord guild maps to at most one mess. Every other ledger table hangs
//! off `mess_id`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Mess database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messes")]
pub struct Model {
    /// Unique identifier for the mess
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name of the mess
    pub name: String,
    /// Discord guild the mess is bound to, if any
    #[sea_orm(unique)]
    pub guild_id: Option<String>,
    /// User ID of the creator (first admin)
    pub created_by: String,
    /// When the mess was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Mess and the ledger tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One mess has many members
    #[sea_orm(has_many = "super::member::Entity")]
    Members,
    /// One mess has many service costs
    #[sea_orm(has_many = "super::service_cost::Entity")]
    ServiceCosts,
    /// One mess has many bazar entries
    #[sea_orm(has_many = "super::bazar::Entity")]
    Bazars,
    /// One mess has many daily meal rows
    #[sea_orm(has_many = "super::daily_meal::Entity")]
    DailyMeals,
    /// One mess has many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
    /// One mess has many month lock records
    #[sea_orm(has_many = "super::month_lock::Entity")]
    MonthLocks,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::service_cost::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceCosts.def()
    }
}

impl Related<super::bazar::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bazars.def()
    }
}

impl Related<super::daily_meal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyMeals.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::month_lock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonthLocks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
