//! Meal rate calculation.
//!
//! The month's approved bazar spend is the meal cost pool; dividing it by the
//! total meal units eaten gives one rate for the whole mess.

use crate::{
    core::allocator::{checked_sum, overflow},
    errors::Result,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Meal units recorded for one day: breakfast + lunch + dinner + guest meals.
#[must_use]
pub fn meal_units(breakfast: Decimal, lunch: Decimal, dinner: Decimal, guest_meals: i32) -> Decimal {
    breakfast + lunch + dinner + Decimal::from(guest_meals)
}

/// Result of a meal rate calculation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MealRateBreakdown {
    /// Sum of approved bazar amounts
    pub total_meal_cost: Decimal,
    /// Sum of meal units across all members
    pub total_meals: Decimal,
    /// `total_meal_cost / total_meals`, or zero when nobody ate
    pub meal_rate: Decimal,
    /// Meal units per member
    pub units_by_member: BTreeMap<String, Decimal>,
}

impl MealRateBreakdown {
    /// Meal units a member ate this month.
    #[must_use]
    pub fn units_for(&self, user_id: &str) -> Decimal {
        self.units_by_member
            .get(user_id)
            .copied()
            .unwrap_or_default()
    }

    /// What a member owes the meal account.
    pub fn meal_cost_for(&self, user_id: &str) -> Result<Decimal> {
        self.units_for(user_id)
            .checked_mul(self.meal_rate)
            .ok_or_else(|| overflow("meal cost"))
    }
}

/// Computes the meal rate from approved bazar amounts and per-row meal units.
///
/// `meals` may hold several rows per member (one per day); they are summed.
///
/// # Errors
/// `Validation` if a total leaves the decimal range.
pub fn calculate<B, M, S>(approved_bazar_amounts: B, meals: M) -> Result<MealRateBreakdown>
where
    B: IntoIterator<Item = Decimal>,
    M: IntoIterator<Item = (S, Decimal)>,
    S: Into<String>,
{
    let total_meal_cost = checked_sum(approved_bazar_amounts, "meal cost total")?;

    let mut units_by_member: BTreeMap<String, Decimal> = BTreeMap::new();
    for (user_id, units) in meals {
        let total = units_by_member.entry(user_id.into()).or_default();
        *total = total
            .checked_add(units)
            .ok_or_else(|| overflow("meal count"))?;
    }
    let total_meals = checked_sum(units_by_member.values().copied(), "meal count")?;

    let meal_rate = if total_meals.is_zero() {
        Decimal::ZERO
    } else {
        total_meal_cost
            .checked_div(total_meals)
            .ok_or_else(|| overflow("meal rate"))?
            .normalize()
    };

    Ok(MealRateBreakdown {
        total_meal_cost,
        total_meals,
        meal_rate,
        units_by_member,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_is_cost_over_meals() {
        let breakdown = calculate([dec!(1000), dec!(2000)], [("a", dec!(60))]).unwrap();
        assert_eq!(breakdown.total_meal_cost, dec!(3000));
        assert_eq!(breakdown.total_meals, dec!(60));
        assert_eq!(breakdown.meal_rate, dec!(50));
    }

    #[test]
    fn test_no_meals_means_zero_rate() {
        let none: [(&str, Decimal); 0] = [];
        let breakdown = calculate([dec!(3000)], none).unwrap();
        assert_eq!(breakdown.meal_rate, Decimal::ZERO);
        assert_eq!(breakdown.meal_cost_for("a").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_member_costs_follow_consumption() {
        let meals = [("a", dec!(10)), ("b", dec!(15)), ("a", dec!(15))];
        let breakdown = calculate([dec!(250), dec!(350)], meals).unwrap();
        assert_eq!(breakdown.total_meals, dec!(40));
        assert_eq!(breakdown.meal_rate, dec!(15));
        assert_eq!(breakdown.meal_cost_for("a").unwrap(), dec!(375));
        assert_eq!(breakdown.meal_cost_for("b").unwrap(), dec!(225));
        assert_eq!(breakdown.meal_cost_for("nobody").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_overflowing_totals_are_errors() {
        let huge = dec!(50000000000000000000000000000);
        let err = calculate([huge, huge], [("a", dec!(3))]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = calculate([dec!(100)], [("a", huge), ("a", huge)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // A tiny meal count pushes the rate past the decimal range
        let err = calculate([huge], [("a", dec!(0.5))]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_meal_units_include_guests() {
        assert_eq!(meal_units(dec!(1), dec!(0.5), dec!(1), 2), dec!(4.5));
        assert_eq!(meal_units(dec!(0), dec!(0), dec!(0), 0), Decimal::ZERO);
    }
}
