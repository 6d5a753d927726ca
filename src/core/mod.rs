//! Core ledger logic, independent of Discord.
//!
//! Pure calculations live in [`allocator`], [`meal_rate`] and
//! [`settlement::settle`]; the remaining modules read and write the store
//! through `SeaORM`. Every mutating operation takes the caller as an
//! [`roles::Actor`] and checks permissions and month locks before writing.

pub mod allocator;
pub mod bazar;
pub mod lock;
pub mod meal;
pub mod meal_rate;
pub mod mess;
pub mod month;
pub mod payment;
pub mod report;
pub mod roles;
pub mod service_cost;
pub mod settlement;
pub mod status;
