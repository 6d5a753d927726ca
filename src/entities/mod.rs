//! Entity module - Contains all SeaORM entity definitions for the ledger.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod bazar;
pub mod cost_share;
pub mod daily_meal;
pub mod member;
pub mod mess;
pub mod month_lock;
pub mod payment;
pub mod service_cost;

// Re-export specific types to avoid conflicts
pub use bazar::{Column as BazarColumn, Entity as Bazar, Model as BazarModel};
pub use cost_share::{Column as CostShareColumn, Entity as CostShare, Model as CostShareModel};
pub use daily_meal::{Column as DailyMealColumn, Entity as DailyMeal, Model as DailyMealModel};
pub use member::{Column as MemberColumn, Entity as Member, Model as MemberModel};
pub use mess::{Column as MessColumn, Entity as Mess, Model as MessModel};
pub use month_lock::{Column as MonthLockColumn, Entity as MonthLock, Model as MonthLockModel};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use service_cost::{
    Column as ServiceCostColumn, Entity as ServiceCost, Model as ServiceCostModel,
};
