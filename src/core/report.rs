//! Report formatting - renders ledger data as plain text for chat replies.
//!
//! Framework-agnostic: every function takes core types and returns strings,
//! the bot layer only decides where to send them.

use crate::{
    core::{
        lock::{LockState, MonthLockStatus},
        meal::row_units,
        service_cost::ServiceCostRecord,
        settlement::{MemberSummary, MonthlySummary},
    },
    entities::{BazarModel, DailyMealModel, PaymentModel},
    errors::Result,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt::Write;

/// Formats an amount with the currency symbol: `৳1500.00`, `-৳20.50`.
#[must_use]
pub fn format_amount(symbol: &str, amount: Decimal) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-{symbol}{:.2}", amount.abs())
    } else {
        format!("{symbol}{:.2}", amount.abs())
    }
}

/// Formats a balance with an explicit sign: `+৳75.00`, `-৳500.00`.
#[must_use]
pub fn format_balance(symbol: &str, amount: Decimal) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-{symbol}{:.2}", amount.abs())
    } else {
        format!("+{symbol}{:.2}", amount.abs())
    }
}

/// Share of a debit that has been paid, as a percentage. A member who owes
/// nothing counts as fully paid, and so does one whose ratio leaves the
/// decimal range.
#[must_use]
pub fn paid_percent(paid: Decimal, owed: Decimal) -> f64 {
    if owed <= Decimal::ZERO {
        return 100.0;
    }
    paid.checked_div(owed)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|percent| percent.to_f64())
        .unwrap_or(100.0)
}

/// Text progress bar like `[████████░░] 80.0%`.
#[must_use]
pub fn format_progress_bar(percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped = percent.clamp(0.0, 100.0);

    // clamped is within [0, 100], so the product fits in [0, length]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!("[{}{}] {percent:.1}%", "█".repeat(filled), "░".repeat(empty))
}

/// One member's block in the monthly summary.
pub fn format_member_summary(symbol: &str, member: &MemberSummary) -> Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "**{}** - balance {}",
        member.name,
        format_balance(symbol, member.balance)
    )?;
    writeln!(
        out,
        "  House: share {} | paid {} | {}",
        format_amount(symbol, member.service_share),
        format_amount(symbol, member.house_paid),
        format_balance(symbol, member.house_balance)
    )?;
    writeln!(
        out,
        "  Meals: {} units | cost {} | paid {} | {}",
        member.total_meals.normalize(),
        format_amount(symbol, member.meal_cost),
        format_amount(symbol, member.meal_paid),
        format_balance(symbol, member.meal_balance)
    )?;
    if !member.bazar_spent.is_zero() {
        writeln!(
            out,
            "  Bazar bought: {}",
            format_amount(symbol, member.bazar_spent)
        )?;
    }
    write!(
        out,
        "  Paid {}",
        format_progress_bar(paid_percent(member.total_credit, member.total_debit), None)
    )?;
    Ok(out)
}

/// The whole monthly summary.
pub fn format_summary(symbol: &str, summary: &MonthlySummary) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "📊 **Summary for {}**", summary.month)?;
    writeln!(
        out,
        "Service costs: {} | Meal cost: {} | Meals: {} | Rate: {}/meal",
        format_amount(symbol, summary.total_service_cost),
        format_amount(symbol, summary.total_meal_cost),
        summary.total_meals.normalize(),
        format_amount(symbol, summary.meal_rate)
    )?;

    if summary.member_summaries.is_empty() {
        write!(out, "\nNo members to settle.")?;
        return Ok(out);
    }
    for member in summary.member_summaries.values() {
        write!(out, "\n{}\n", format_member_summary(symbol, member)?)?;
    }
    Ok(out)
}

/// One line describing a month's lock state.
#[must_use]
pub fn format_lock_status(status: &MonthLockStatus) -> String {
    match status.state {
        LockState::Unlocked => match status.unlock_expiry {
            Some(expiry) => format!(
                "🔓 {} is open until {}",
                status.month,
                expiry.format("%Y-%m-%d %H:%M UTC")
            ),
            None => format!("🔓 {} is open", status.month),
        },
        LockState::Locked => match &status.locked_by {
            Some(by) => format!("🔒 {} is locked (by <@{by}>)", status.month),
            None => format!("🔒 {} is locked", status.month),
        },
        LockState::UnlockRequested => format!(
            "🔒 {} is locked, unlock requested by <@{}>",
            status.month,
            status.requested_by.as_deref().unwrap_or("unknown")
        ),
    }
}

/// One service cost, with its shares if explicit.
#[must_use]
pub fn format_cost_line(symbol: &str, record: &ServiceCostRecord) -> String {
    let mut line = format!(
        "#{} {} - {} ({})",
        record.cost.id,
        record.cost.name,
        format_amount(symbol, record.cost.amount),
        record.cost.status
    );
    if record.shares.is_empty() {
        line.push_str(" split equally");
    } else {
        let shares: Vec<String> = record
            .shares
            .iter()
            .map(|s| format!("<@{}> {}", s.user_id, format_amount(symbol, s.amount)))
            .collect();
        line.push_str(&format!(" split: {}", shares.join(", ")));
    }
    line
}

/// One bazar entry.
#[must_use]
pub fn format_bazar_line(symbol: &str, entry: &BazarModel) -> String {
    let items = if entry.items.is_empty() {
        String::new()
    } else {
        format!(" | {}", entry.items)
    };
    format!(
        "#{} {} <@{}> {} ({}){items}",
        entry.id,
        entry.date,
        entry.buyer_id,
        format_amount(symbol, entry.amount),
        entry.status
    )
}

/// One payment.
#[must_use]
pub fn format_payment_line(symbol: &str, payment: &PaymentModel) -> String {
    format!(
        "#{} {} <@{}> {} {} ({})",
        payment.id,
        payment.month,
        payment.user_id,
        format_amount(symbol, payment.amount),
        payment.payment_type,
        payment.status
    )
}

/// One daily meal row.
#[must_use]
pub fn format_meal_line(row: &DailyMealModel) -> String {
    let guests = if row.guest_meals > 0 {
        format!(" +{} guest", row.guest_meals)
    } else {
        String::new()
    };
    format!(
        "{} <@{}> B {} / L {} / D {}{guests} = {}",
        row.date,
        row.user_id,
        row.breakfast.normalize(),
        row.lunch.normalize(),
        row.dinner.normalize(),
        row_units(row).normalize()
    )
}
