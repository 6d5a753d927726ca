//! Daily meal sheet - batch upserts of per-member meal counts.
//!
//! A batch is validated in full before anything is written and then applied
//! in a single transaction, so either every row lands or none does.

use crate::{
    core::{
        lock::ensure_unlocked,
        meal_rate,
        mess::{require_mess, require_participant},
        month::Month,
        roles::{Actor, Operation, authorize},
    },
    entities::{DailyMeal, DailyMealModel, daily_meal},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::{BTreeSet, HashSet};
use tracing::{info, instrument};

/// One member's meals for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealEntry {
    /// Member who ate
    pub user_id: String,
    /// Day
    pub date: NaiveDate,
    /// Breakfast units
    pub breakfast: Decimal,
    /// Lunch units
    pub lunch: Decimal,
    /// Dinner units
    pub dinner: Decimal,
    /// Guest meals charged to the member
    pub guest_meals: i32,
}

impl MealEntry {
    /// Meal units this entry stands for.
    #[must_use]
    pub fn units(&self) -> Decimal {
        meal_rate::meal_units(self.breakfast, self.lunch, self.dinner, self.guest_meals)
    }
}

/// Most units one meal slot may record for a member in a day.
pub const MAX_UNITS_PER_MEAL: Decimal = Decimal::TEN;

/// Most guest meals one member may bring in a day.
pub const MAX_GUEST_MEALS: i32 = 100;

/// Meal counts come in halves: 0, 0.5, 1, 1.5, ...
fn is_half_step(value: Decimal) -> bool {
    !value.is_sign_negative()
        && value
            .checked_mul(Decimal::TWO)
            .is_some_and(|doubled| doubled.fract().is_zero())
}

fn validate_entry(entry: &MealEntry) -> Result<()> {
    if entry.user_id.trim().is_empty() {
        return Err(Error::validation("meal entry is missing a user"));
    }
    for (label, value) in [
        ("breakfast", entry.breakfast),
        ("lunch", entry.lunch),
        ("dinner", entry.dinner),
    ] {
        if value > MAX_UNITS_PER_MEAL {
            return Err(Error::validation(format!(
                "{label} for {} on {} cannot exceed {MAX_UNITS_PER_MEAL}, got {value}",
                entry.user_id, entry.date
            )));
        }
        if !is_half_step(value) {
            return Err(Error::validation(format!(
                "{label} for {} on {} must be a non-negative multiple of 0.5, got {value}",
                entry.user_id, entry.date
            )));
        }
    }
    if !(0..=MAX_GUEST_MEALS).contains(&entry.guest_meals) {
        return Err(Error::validation(format!(
            "guest meals for {} on {} must be between 0 and {MAX_GUEST_MEALS}",
            entry.user_id, entry.date
        )));
    }
    Ok(())
}

/// Checks every entry and returns the months the batch touches.
fn validate_batch(entries: &[MealEntry]) -> Result<BTreeSet<Month>> {
    let mut seen = HashSet::new();
    let mut months = BTreeSet::new();
    for entry in entries {
        validate_entry(entry)?;
        if !seen.insert((entry.user_id.as_str(), entry.date)) {
            return Err(Error::validation(format!(
                "{} appears twice for {} in this batch",
                entry.user_id, entry.date
            )));
        }
        months.insert(Month::of(entry.date));
    }
    Ok(months)
}

async fn find_row<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    user_id: &str,
    date: NaiveDate,
) -> Result<Option<DailyMealModel>> {
    DailyMeal::find()
        .filter(daily_meal::Column::MessId.eq(mess_id))
        .filter(daily_meal::Column::UserId.eq(user_id))
        .filter(daily_meal::Column::Date.eq(date))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Upserts a batch of meal rows keyed on (mess, user, date).
///
/// Re-sending the same batch leaves the sheet as it was.
///
/// # Errors
/// - `Unauthorized` unless the actor is a manager or meal manager
/// - `Validation` for any malformed entry, a repeated (user, date) pair or a
///   user who is not a member; nothing is written
/// - `Locked` if any touched month is locked; nothing is written
#[instrument(skip(db, actor, entries), fields(actor = %actor.user_id, entries = entries.len()))]
pub async fn batch_update_meals(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    entries: &[MealEntry],
) -> Result<Vec<DailyMealModel>> {
    authorize(actor, Operation::BatchUpdateMeals)?;
    let months = validate_batch(entries)?;
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let txn = db.begin().await?;
    require_mess(&txn, mess_id).await?;
    for month in &months {
        ensure_unlocked(&txn, mess_id, *month).await?;
    }
    let users: BTreeSet<&str> = entries.iter().map(|e| e.user_id.as_str()).collect();
    for user_id in users {
        require_participant(&txn, mess_id, user_id).await?;
    }

    let now = chrono::Utc::now();
    let mut saved = Vec::with_capacity(entries.len());
    for entry in entries {
        let row = match find_row(&txn, mess_id, &entry.user_id, entry.date).await? {
            Some(existing) => {
                let mut row: daily_meal::ActiveModel = existing.into();
                row.breakfast = Set(entry.breakfast);
                row.lunch = Set(entry.lunch);
                row.dinner = Set(entry.dinner);
                row.guest_meals = Set(entry.guest_meals);
                row.updated_by = Set(actor.user_id.clone());
                row.updated_at = Set(now);
                row.update(&txn).await?
            }
            None => {
                daily_meal::ActiveModel {
                    mess_id: Set(mess_id),
                    user_id: Set(entry.user_id.clone()),
                    date: Set(entry.date),
                    month: Set(Month::of(entry.date).to_string()),
                    breakfast: Set(entry.breakfast),
                    lunch: Set(entry.lunch),
                    dinner: Set(entry.dinner),
                    guest_meals: Set(entry.guest_meals),
                    updated_by: Set(actor.user_id.clone()),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };
        saved.push(row);
    }

    txn.commit().await?;
    info!(mess_id, rows = saved.len(), "Meal batch applied");
    Ok(saved)
}

/// The meal sheet of a mess month, by date then user.
pub async fn list_daily_meals<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    month: Month,
) -> Result<Vec<DailyMealModel>> {
    DailyMeal::find()
        .filter(daily_meal::Column::MessId.eq(mess_id))
        .filter(daily_meal::Column::Month.eq(month.to_string()))
        .order_by_asc(daily_meal::Column::Date)
        .order_by_asc(daily_meal::Column::UserId)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Meal units a stored row stands for.
#[must_use]
pub fn row_units(row: &DailyMealModel) -> Decimal {
    meal_rate::meal_units(row.breakfast, row.lunch, row.dinner, row.guest_meals)
}
