//! Parsing of free-text command arguments.
//!
//! Slash commands hand us strings and floats; these helpers turn them into
//! core types and report bad input as validation errors so the user sees
//! what to fix.

use crate::{
    core::{allocator::CostShareInput, meal::MealEntry, month::Month},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Converts a slash-command number to a decimal amount.
pub fn amount(value: f64) -> Result<Decimal> {
    Decimal::try_from(value)
        .map(|d| d.normalize())
        .map_err(|_| Error::validation(format!("{value} is not a valid amount")))
}

/// Parses an optional `YYYY-MM`, defaulting to the current month.
pub fn month_or_current(value: Option<&str>) -> Result<Month> {
    value.map_or_else(|| Ok(Month::current()), str::parse)
}

/// Parses a `YYYY-MM-DD` date.
pub fn date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| Error::validation(format!("date must be YYYY-MM-DD, got '{value}'")))
}

/// Parses an optional date, defaulting to today.
pub fn date_or_today(value: Option<&str>) -> Result<NaiveDate> {
    value.map_or_else(|| Ok(chrono::Local::now().date_naive()), date)
}

/// Accepts a raw user ID or a mention (`<@123>`, `<@!123>`).
pub fn user_ref(value: &str) -> Result<String> {
    let trimmed = value.trim();
    let id = trimmed
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map_or(trimmed, |inner| inner.trim_start_matches('!'));
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::validation(format!("'{value}' is not a user mention or ID")));
    }
    Ok(id.to_string())
}

fn decimal(value: &str) -> Result<Decimal> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| Error::validation(format!("'{value}' is not a number")))
}

/// Parses explicit cost shares: `@alice=600, @bob=400`.
pub fn shares(value: &str) -> Result<Vec<CostShareInput>> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (user, amount) = part
                .split_once('=')
                .ok_or_else(|| Error::validation(format!("share '{part}' must look like @user=amount")))?;
            Ok(CostShareInput::new(user_ref(user)?, decimal(amount)?))
        })
        .collect()
}

/// Parses one meal spec: `breakfast/lunch/dinner` with an optional `+guests`,
/// e.g. `1/1/0.5+2`.
fn meal_counts(value: &str) -> Result<(Decimal, Decimal, Decimal, i32)> {
    let (counts, guests) = match value.split_once('+') {
        Some((counts, guests)) => (
            counts,
            guests
                .trim()
                .parse::<i32>()
                .map_err(|_| Error::validation(format!("'{guests}' is not a guest count")))?,
        ),
        None => (value, 0),
    };
    let parts: Vec<&str> = counts.split('/').collect();
    let [breakfast, lunch, dinner] = parts.as_slice() else {
        return Err(Error::validation(format!(
            "meals '{value}' must look like breakfast/lunch/dinner, e.g. 1/1/0.5"
        )));
    };
    Ok((decimal(breakfast)?, decimal(lunch)?, decimal(dinner)?, guests))
}

/// Parses a meal sheet for one day: `@alice=1/1/1; @bob=0/1/0.5+1`.
pub fn meal_batch(value: &str, day: NaiveDate) -> Result<Vec<MealEntry>> {
    value
        .split(';')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (user, counts) = part
                .split_once('=')
                .ok_or_else(|| Error::validation(format!("entry '{part}' must look like @user=1/1/1")))?;
            let (breakfast, lunch, dinner, guest_meals) = meal_counts(counts)?;
            Ok(MealEntry {
                user_id: user_ref(user)?,
                date: day,
                breakfast,
                lunch,
                dinner,
                guest_meals,
            })
        })
        .collect()
}
