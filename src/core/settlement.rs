//! Monthly settlement - combines cost shares, meal costs and payments into
//! per-member balances.
//!
//! [`settle`] is pure; [`generate_monthly_summary`] loads one mess month
//! inside a single read transaction and hands it over. Nothing is cached, so
//! a summary always reflects every write committed before the call.

use crate::{
    core::{
        allocator::{SHARE_TOLERANCE, overflow},
        bazar::list_bazars,
        meal::{list_daily_meals, row_units},
        meal_rate::{self, MealRateBreakdown},
        mess::{MemberStatus, require_mess},
        month::Month,
        payment::{PaymentType, list_payments},
        service_cost::{ServiceCostRecord, list_service_costs},
        status::EntryStatus,
    },
    entities::{BazarModel, DailyMealModel, Member, MemberModel, PaymentModel, member},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, warn};

/// One member's position for the month.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MemberSummary {
    /// Discord user ID
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Meal units eaten
    pub total_meals: Decimal,
    /// `total_meals × meal_rate`
    pub meal_cost: Decimal,
    /// Sum of allocated service cost shares
    pub service_share: Decimal,
    /// Approved bazar purchases made; informational, not credited
    pub bazar_spent: Decimal,
    /// Approved house payments
    pub house_paid: Decimal,
    /// Approved meal payments
    pub meal_paid: Decimal,
    /// `house_paid + meal_paid`
    pub total_paid: Decimal,
    /// `service_share + meal_cost`
    pub total_debit: Decimal,
    /// `house_paid + meal_paid`
    pub total_credit: Decimal,
    /// `house_paid - service_share`
    pub house_balance: Decimal,
    /// `meal_paid - meal_cost`
    pub meal_balance: Decimal,
    /// `total_credit - total_debit`; positive means the mess owes the member
    pub balance: Decimal,
}

/// Settlement of one mess month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    /// Month settled
    pub month: Month,
    /// Sum of approved service costs
    pub total_service_cost: Decimal,
    /// Sum of approved bazar purchases
    pub total_meal_cost: Decimal,
    /// Cost of one meal unit
    pub meal_rate: Decimal,
    /// Meal units eaten by everyone
    pub total_meals: Decimal,
    /// Per-member positions keyed by user ID
    pub member_summaries: BTreeMap<String, MemberSummary>,
}

impl MonthlySummary {
    /// Approved house payments across all members.
    #[must_use]
    pub fn total_house_paid(&self) -> Decimal {
        self.member_summaries.values().map(|m| m.house_paid).sum()
    }

    /// Approved meal payments across all members.
    #[must_use]
    pub fn total_meal_paid(&self) -> Decimal {
        self.member_summaries.values().map(|m| m.meal_paid).sum()
    }

    /// How far the house balances stray from `paid - cost`.
    #[must_use]
    pub fn house_drift(&self) -> Decimal {
        let balances: Decimal = self.member_summaries.values().map(|m| m.house_balance).sum();
        balances - (self.total_house_paid() - self.total_service_cost)
    }

    /// How far the meal balances stray from `paid - cost`.
    #[must_use]
    pub fn meal_drift(&self) -> Decimal {
        let balances: Decimal = self.member_summaries.values().map(|m| m.meal_balance).sum();
        balances - (self.total_meal_paid() - self.total_meal_cost)
    }

    /// Whether both ledgers balance within the share tolerance.
    #[must_use]
    pub fn is_conserved(&self) -> bool {
        self.house_drift().abs() <= SHARE_TOLERANCE && self.meal_drift().abs() <= SHARE_TOLERANCE
    }
}

/// Everything recorded for one mess month.
#[derive(Debug, Clone, Default)]
pub struct SettlementInput {
    /// Every membership row of the mess
    pub members: Vec<MemberModel>,
    /// Service costs with their shares, any status
    pub costs: Vec<ServiceCostRecord>,
    /// Bazar entries, any status
    pub bazars: Vec<BazarModel>,
    /// Daily meal rows
    pub meals: Vec<DailyMealModel>,
    /// Payments, any status
    pub payments: Vec<PaymentModel>,
}

fn is_approved(status: &str) -> bool {
    status == EntryStatus::Approved.as_str()
}

fn add(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(what))
}

fn accumulate(total: &mut Decimal, value: Decimal, what: &str) -> Result<()> {
    *total = add(*total, value, what)?;
    Ok(())
}

fn amount_for(map: &BTreeMap<&str, Decimal>, user_id: &str) -> Decimal {
    map.get(user_id).copied().unwrap_or_default()
}

/// Settles a month.
///
/// Only approved costs, bazar entries and payments count. Active members are
/// always listed; anyone else appears once they have activity in the month,
/// so no amount drops out of the totals.
///
/// # Errors
/// `Validation` for a malformed stored record or a total that leaves the
/// decimal range.
pub fn settle(month: Month, input: &SettlementInput) -> Result<MonthlySummary> {
    let active: Vec<&str> = input
        .members
        .iter()
        .filter(|m| m.status == MemberStatus::Active.as_str())
        .map(|m| m.user_id.as_str())
        .collect();
    let names: BTreeMap<&str, &str> = input
        .members
        .iter()
        .map(|m| (m.user_id.as_str(), m.name.as_str()))
        .collect();

    let mut service_share: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut total_service_cost = Decimal::ZERO;
    for record in input.costs.iter().filter(|r| r.is_approved()) {
        total_service_cost = add(total_service_cost, record.cost.amount, "service cost total")?;
        let allocation = record.allocate(&active)?;
        if allocation.is_empty() {
            warn!(cost_id = record.cost.id, "Service cost has nobody to charge");
        }
        for (user_id, owed) in allocation {
            accumulate(service_share.entry(user_id).or_default(), owed, "service share")?;
        }
    }

    let approved_bazars: Vec<&BazarModel> =
        input.bazars.iter().filter(|b| is_approved(&b.status)).collect();
    let meals: MealRateBreakdown = meal_rate::calculate(
        approved_bazars.iter().map(|b| b.amount),
        input.meals.iter().map(|row| (row.user_id.clone(), row_units(row))),
    )?;

    let mut bazar_spent: BTreeMap<&str, Decimal> = BTreeMap::new();
    for entry in &approved_bazars {
        accumulate(
            bazar_spent.entry(entry.buyer_id.as_str()).or_default(),
            entry.amount,
            "bazar total",
        )?;
    }

    let mut house_paid: BTreeMap<&str, Decimal> = BTreeMap::new();
    let mut meal_paid: BTreeMap<&str, Decimal> = BTreeMap::new();
    for payment in input.payments.iter().filter(|p| is_approved(&p.status)) {
        let ledger = match payment.payment_type.parse::<PaymentType>()? {
            PaymentType::House => &mut house_paid,
            PaymentType::Meal => &mut meal_paid,
        };
        accumulate(
            ledger.entry(payment.user_id.as_str()).or_default(),
            payment.amount,
            "payment total",
        )?;
    }

    let users: BTreeSet<&str> = active
        .iter()
        .copied()
        .chain(service_share.keys().map(String::as_str))
        .chain(meals.units_by_member.keys().map(String::as_str))
        .chain(bazar_spent.keys().copied())
        .chain(house_paid.keys().copied())
        .chain(meal_paid.keys().copied())
        .collect();

    let mut member_summaries = BTreeMap::new();
    for user_id in users {
        let service_share = service_share.get(user_id).copied().unwrap_or_default();
        let meal_cost = meals.meal_cost_for(user_id)?;
        let house_paid = amount_for(&house_paid, user_id);
        let meal_paid = amount_for(&meal_paid, user_id);
        let total_debit = add(service_share, meal_cost, "member debit")?;
        let total_credit = add(house_paid, meal_paid, "member credit")?;
        let summary = MemberSummary {
            user_id: user_id.to_string(),
            name: names.get(user_id).copied().unwrap_or(user_id).to_string(),
            total_meals: meals.units_for(user_id),
            meal_cost,
            service_share,
            bazar_spent: amount_for(&bazar_spent, user_id),
            house_paid,
            meal_paid,
            total_paid: total_credit,
            total_debit,
            total_credit,
            house_balance: house_paid - service_share,
            meal_balance: meal_paid - meal_cost,
            balance: total_credit - total_debit,
        };
        member_summaries.insert(user_id.to_string(), summary);
    }

    Ok(MonthlySummary {
        month,
        total_service_cost,
        total_meal_cost: meals.total_meal_cost,
        meal_rate: meals.meal_rate,
        total_meals: meals.total_meals,
        member_summaries,
    })
}

/// Loads everything recorded for a mess month.
pub async fn load_month<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    month: Month,
) -> Result<SettlementInput> {
    Ok(SettlementInput {
        members: Member::find()
            .filter(member::Column::MessId.eq(mess_id))
            .order_by_asc(member::Column::UserId)
            .all(conn)
            .await?,
        costs: list_service_costs(conn, mess_id, month).await?,
        bazars: list_bazars(conn, mess_id, month).await?,
        meals: list_daily_meals(conn, mess_id, month).await?,
        payments: list_payments(conn, mess_id, month).await?,
    })
}

/// Computes the summary of a mess month from the store.
///
/// # Errors
/// - `Validation` if `month` is not `YYYY-MM`
/// - `Validation` if a stored total leaves the decimal range
/// - `NotFound` if the mess does not exist
#[instrument(skip(db))]
pub async fn generate_monthly_summary(
    db: &DatabaseConnection,
    mess_id: i64,
    month: &str,
) -> Result<MonthlySummary> {
    let month: Month = month.parse()?;

    let txn = db.begin().await?;
    require_mess(&txn, mess_id).await?;
    let input = load_month(&txn, mess_id, month).await?;
    txn.commit().await?;

    let summary = settle(month, &input)?;
    if !summary.is_conserved() {
        warn!(
            house_drift = %summary.house_drift(),
            meal_drift = %summary.meal_drift(),
            "Settlement does not balance"
        );
    }
    debug!(members = summary.member_summaries.len(), "Summary generated");
    Ok(summary)
}
