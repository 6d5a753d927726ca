//! Payment business logic - cash paid into the house and meal accounts.
//!
//! A manager recording a payment vouches for it, so it is approved at once.
//! A member recording their own payment waits for a manager to verify it.

use crate::{
    core::{
        allocator::check_amount,
        lock::ensure_unlocked,
        mess::{require_mess, require_participant},
        month::Month,
        roles::{Actor, Operation, authorize},
        status::EntryStatus,
    },
    entities::{Payment, PaymentModel, payment},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, instrument};

/// Ledger a payment counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    /// Rent and utilities
    House,
    /// Groceries
    Meal,
}

impl PaymentType {
    /// Stored form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Meal => "meal",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "house" => Ok(Self::House),
            "meal" => Ok(Self::Meal),
            other => Err(Error::validation(format!(
                "payment type must be 'house' or 'meal', got '{other}'"
            ))),
        }
    }
}

/// Input for [`submit_payment`].
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// Mess being paid
    pub mess_id: i64,
    /// Who paid; defaults to the caller
    pub user_id: Option<String>,
    /// Amount paid
    pub amount: Decimal,
    /// Account credited
    pub payment_type: PaymentType,
    /// Settlement month
    pub month: Month,
}

async fn find_payment<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    payment_id: i64,
) -> Result<PaymentModel> {
    Payment::find_by_id(payment_id)
        .one(conn)
        .await?
        .filter(|p| p.mess_id == mess_id)
        .ok_or_else(|| Error::not_found("Payment", payment_id))
}

fn status_of(payment: &PaymentModel) -> Result<EntryStatus> {
    payment.status.parse()
}

/// Records a payment.
///
/// # Errors
/// - `InvalidAmount` for a non-positive amount
/// - `Unauthorized` for non-members, or members paying for someone else
/// - `Validation` if the payer is not a member
/// - `Locked` if the month is locked
#[instrument(skip(db, actor, new), fields(actor = %actor.user_id, mess_id = new.mess_id, month = %new.month))]
pub async fn submit_payment(
    db: &DatabaseConnection,
    actor: &Actor,
    new: NewPayment,
) -> Result<PaymentModel> {
    authorize(actor, Operation::SubmitPayment)?;
    check_amount(new.amount)?;

    let payer = new.user_id.unwrap_or_else(|| actor.user_id.clone());
    let vouched = actor.is_manager();
    if payer != actor.user_id && !vouched {
        return Err(Error::Unauthorized {
            action: "record a payment for someone else",
            required: "admin, manager".to_string(),
        });
    }

    let txn = db.begin().await?;
    require_mess(&txn, new.mess_id).await?;
    ensure_unlocked(&txn, new.mess_id, new.month).await?;
    require_participant(&txn, new.mess_id, &payer).await?;

    let recorded = payment::ActiveModel {
        mess_id: Set(new.mess_id),
        user_id: Set(payer),
        amount: Set(new.amount),
        payment_type: Set(new.payment_type.as_str().to_string()),
        status: Set(EntryStatus::initial(vouched).as_str().to_string()),
        month: Set(new.month.to_string()),
        submitted_by: Set(actor.user_id.clone()),
        approved_by: Set(vouched.then(|| actor.user_id.clone())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(payment_id = recorded.id, status = %recorded.status, "Payment recorded");
    Ok(recorded)
}

async fn decide_payment(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    payment_id: i64,
    outcome: EntryStatus,
) -> Result<PaymentModel> {
    let txn = db.begin().await?;
    let found = find_payment(&txn, mess_id, payment_id).await?;
    ensure_unlocked(&txn, mess_id, found.month.parse()?).await?;

    let current = status_of(&found)?;
    if current == outcome {
        return Ok(found);
    }
    if current != EntryStatus::Pending {
        return Err(Error::validation(format!(
            "payment {payment_id} is already {current}"
        )));
    }

    let mut decided: payment::ActiveModel = found.into();
    decided.status = Set(outcome.as_str().to_string());
    decided.approved_by = Set(Some(actor.user_id.clone()));
    let decided = decided.update(&txn).await?;
    txn.commit().await?;

    info!(payment_id, status = %outcome, "Payment decided");
    Ok(decided)
}

/// Approves a pending payment. Verifying an approved payment is a no-op.
///
/// # Errors
/// `Validation` if the payment was rejected.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn verify_payment(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    payment_id: i64,
) -> Result<PaymentModel> {
    authorize(actor, Operation::VerifyPayment)?;
    decide_payment(db, actor, mess_id, payment_id, EntryStatus::Approved).await
}

/// Rejects a pending payment. Rejecting a rejected payment is a no-op.
///
/// # Errors
/// `Validation` if the payment was already approved.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn reject_payment(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    payment_id: i64,
) -> Result<PaymentModel> {
    authorize(actor, Operation::RejectPayment)?;
    decide_payment(db, actor, mess_id, payment_id, EntryStatus::Rejected).await
}

/// Every payment of a mess month, oldest first.
pub async fn list_payments<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    month: Month,
) -> Result<Vec<PaymentModel>> {
    Payment::find()
        .filter(payment::Column::MessId.eq(mess_id))
        .filter(payment::Column::Month.eq(month.to_string()))
        .order_by_asc(payment::Column::CreatedAt)
        .order_by_asc(payment::Column::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Payments of a mess month waiting for verification.
pub async fn list_pending_payments(
    db: &DatabaseConnection,
    mess_id: i64,
    month: Month,
) -> Result<Vec<PaymentModel>> {
    Payment::find()
        .filter(payment::Column::MessId.eq(mess_id))
        .filter(payment::Column::Month.eq(month.to_string()))
        .filter(payment::Column::Status.eq(EntryStatus::Pending.as_str()))
        .order_by_asc(payment::Column::CreatedAt)
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// A member's payment history across all months, newest first.
pub async fn list_member_payments(
    db: &DatabaseConnection,
    mess_id: i64,
    user_id: &str,
) -> Result<Vec<PaymentModel>> {
    Payment::find()
        .filter(payment::Column::MessId.eq(mess_id))
        .filter(payment::Column::UserId.eq(user_id))
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::lock;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    fn house(mess_id: i64, user_id: Option<&str>, amount: Decimal) -> NewPayment {
        NewPayment {
            mess_id,
            user_id: user_id.map(str::to_string),
            amount,
            payment_type: PaymentType::House,
            month: month("2024-03"),
        }
    }

    #[test]
    fn test_payment_type_parse() {
        assert_eq!("House".parse::<PaymentType>().unwrap(), PaymentType::House);
        assert_eq!("meal".parse::<PaymentType>().unwrap(), PaymentType::Meal);
        assert!("rent".parse::<PaymentType>().is_err());
    }

    #[tokio::test]
    async fn test_manager_payment_is_approved() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;

        let paid = submit_payment(&db, &mess.admin, house(mess.mess_id, Some("B"), dec!(500))).await?;
        assert_eq!(paid.user_id, "B");
        assert_eq!(paid.status, "approved");
        assert_eq!(paid.approved_by.as_deref(), Some("A"));
        Ok(())
    }

    #[tokio::test]
    async fn test_member_self_payment_needs_verification() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;

        let paid = submit_payment(&db, &mess.member, house(mess.mess_id, None, dec!(300))).await?;
        assert_eq!(paid.user_id, "B");
        assert_eq!(paid.status, "pending");
        assert!(paid.approved_by.is_none());
        assert_eq!(list_pending_payments(&db, mess.mess_id, month("2024-03")).await?.len(), 1);

        let err = verify_payment(&db, &mess.member, mess.mess_id, paid.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let verified = verify_payment(&db, &mess.admin, mess.mess_id, paid.id).await?;
        assert_eq!(verified.status, "approved");
        assert_eq!(verified.approved_by.as_deref(), Some("A"));
        // Retrying is harmless
        verify_payment(&db, &mess.admin, mess.mess_id, paid.id).await?;

        let err = reject_payment(&db, &mess.admin, mess.mess_id, paid.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        Ok(())
    }

    #[tokio::test]
    async fn test_member_cannot_pay_for_others() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let err = submit_payment(&db, &mess.member, house(mess.mess_id, Some("A"), dec!(100)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_payment_stays_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let paid = submit_payment(&db, &mess.member, house(mess.mess_id, None, dec!(300))).await?;

        reject_payment(&db, &mess.admin, mess.mess_id, paid.id).await?;
        let err = verify_payment(&db, &mess.admin, mess.mess_id, paid.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(list_pending_payments(&db, mess.mess_id, month("2024-03")).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_payment_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;

        let err = submit_payment(&db, &mess.admin, house(mess.mess_id, None, dec!(-1)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { .. }));

        let huge = dec!(50000000000000000000000000000);
        let err = submit_payment(&db, &mess.admin, house(mess.mess_id, None, huge))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = submit_payment(&db, &mess.admin, house(mess.mess_id, Some("Z"), dec!(10)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        Ok(())
    }

    #[tokio::test]
    async fn test_locked_month_rejects_payment() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        lock::lock_month(&db, &mess.admin, mess.mess_id, month("2024-03")).await?;

        let err = submit_payment(&db, &mess.admin, house(mess.mess_id, None, dec!(100)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Locked);
        Ok(())
    }

    #[tokio::test]
    async fn test_member_history() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        submit_payment(&db, &mess.admin, house(mess.mess_id, Some("B"), dec!(100))).await?;
        let mut april = house(mess.mess_id, Some("B"), dec!(200));
        april.month = month("2024-04");
        april.payment_type = PaymentType::Meal;
        submit_payment(&db, &mess.admin, april).await?;
        submit_payment(&db, &mess.admin, house(mess.mess_id, None, dec!(50))).await?;

        let history = list_member_payments(&db, mess.mess_id, "B").await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].amount, dec!(200));
        assert_eq!(list_payments(&db, mess.mess_id, month("2024-03")).await?.len(), 2);
        Ok(())
    }
}
