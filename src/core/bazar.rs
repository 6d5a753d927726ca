//! Bazar business logic - grocery purchases feeding the meal cost pool.
//!
//! Any member may record a purchase; it stays pending until a manager
//! approves it. Entries recorded by a manager are approved immediately. The
//! buyer may still edit or delete their own entry while it is pending.

use crate::{
    core::{
        allocator::check_amount,
        lock::ensure_unlocked,
        mess::{require_mess, require_participant},
        month::Month,
        roles::{Actor, Operation, authorize},
        status::EntryStatus,
    },
    entities::{Bazar, BazarModel, bazar},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Input for [`create_bazar`].
#[derive(Debug, Clone)]
pub struct NewBazar {
    /// Mess the purchase is for
    pub mess_id: i64,
    /// Who paid; defaults to the caller
    pub buyer_id: Option<String>,
    /// Amount spent
    pub amount: Decimal,
    /// What was bought
    pub items: String,
    /// Day of the purchase; its month is the settlement month
    pub date: NaiveDate,
}

/// Changes for [`update_bazar`]. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct BazarUpdate {
    /// New buyer (managers only)
    pub buyer_id: Option<String>,
    /// New amount
    pub amount: Option<Decimal>,
    /// New item list
    pub items: Option<String>,
    /// New purchase date
    pub date: Option<NaiveDate>,
}

fn for_someone_else() -> Error {
    Error::Unauthorized {
        action: "record a bazar entry for someone else",
        required: "admin, manager".to_string(),
    }
}

async fn find_bazar<C: ConnectionTrait>(conn: &C, mess_id: i64, bazar_id: i64) -> Result<BazarModel> {
    Bazar::find_by_id(bazar_id)
        .one(conn)
        .await?
        .filter(|entry| entry.mess_id == mess_id)
        .ok_or_else(|| Error::not_found("Bazar entry", bazar_id))
}

/// Managers may change any entry; the buyer may change their own entry while
/// it is still pending.
fn check_owner_or_manager(actor: &Actor, entry: &BazarModel, operation: Operation) -> Result<()> {
    if actor.is_manager() {
        return Ok(());
    }
    let owns = entry.buyer_id == actor.user_id || entry.created_by == actor.user_id;
    if actor.is_member() && owns && entry.status == EntryStatus::Pending.as_str() {
        return Ok(());
    }
    authorize(actor, operation)
}

/// Records a purchase.
///
/// # Errors
/// - `InvalidAmount` for a non-positive amount
/// - `Unauthorized` for non-members, or members recording for someone else
/// - `Validation` if the buyer is not a member
/// - `Locked` if the purchase month is locked
#[instrument(skip(db, actor, new), fields(actor = %actor.user_id, mess_id = new.mess_id))]
pub async fn create_bazar(db: &DatabaseConnection, actor: &Actor, new: NewBazar) -> Result<BazarModel> {
    authorize(actor, Operation::CreateBazar)?;
    check_amount(new.amount)?;

    let buyer_id = new.buyer_id.unwrap_or_else(|| actor.user_id.clone());
    if buyer_id != actor.user_id && !actor.is_manager() {
        return Err(for_someone_else());
    }
    let month = Month::of(new.date);

    let txn = db.begin().await?;
    require_mess(&txn, new.mess_id).await?;
    ensure_unlocked(&txn, new.mess_id, month).await?;
    require_participant(&txn, new.mess_id, &buyer_id).await?;

    let entry = bazar::ActiveModel {
        mess_id: Set(new.mess_id),
        buyer_id: Set(buyer_id),
        amount: Set(new.amount),
        items: Set(new.items.trim().to_string()),
        date: Set(new.date),
        month: Set(month.to_string()),
        status: Set(EntryStatus::initial(actor.is_manager()).as_str().to_string()),
        created_by: Set(actor.user_id.clone()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(bazar_id = entry.id, status = %entry.status, "Bazar entry recorded");
    Ok(entry)
}

/// Approves a pending entry. Approving an approved entry is a no-op.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn approve_bazar(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    bazar_id: i64,
) -> Result<BazarModel> {
    authorize(actor, Operation::ApproveBazar)?;

    let txn = db.begin().await?;
    let entry = find_bazar(&txn, mess_id, bazar_id).await?;
    ensure_unlocked(&txn, mess_id, entry.month.parse()?).await?;
    if entry.status == EntryStatus::Approved.as_str() {
        return Ok(entry);
    }

    let mut approved: bazar::ActiveModel = entry.into();
    approved.status = Set(EntryStatus::Approved.as_str().to_string());
    let approved = approved.update(&txn).await?;
    txn.commit().await?;
    Ok(approved)
}

/// Edits an entry. Moving it to another month requires both months to be
/// unlocked.
#[instrument(skip(db, actor, update), fields(actor = %actor.user_id))]
pub async fn update_bazar(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    bazar_id: i64,
    update: BazarUpdate,
) -> Result<BazarModel> {
    if let Some(amount) = update.amount {
        check_amount(amount)?;
    }

    let txn = db.begin().await?;
    let entry = find_bazar(&txn, mess_id, bazar_id).await?;
    check_owner_or_manager(actor, &entry, Operation::EditBazar)?;
    if let Some(buyer) = &update.buyer_id
        && *buyer != entry.buyer_id
        && !actor.is_manager()
    {
        return Err(for_someone_else());
    }

    let old_month: Month = entry.month.parse()?;
    ensure_unlocked(&txn, mess_id, old_month).await?;
    let new_month = update.date.map(Month::of);
    if let Some(new_month) = new_month
        && new_month != old_month
    {
        ensure_unlocked(&txn, mess_id, new_month).await?;
    }
    if let Some(buyer) = &update.buyer_id {
        require_participant(&txn, mess_id, buyer).await?;
    }

    let mut edited: bazar::ActiveModel = entry.into();
    if let Some(buyer) = update.buyer_id {
        edited.buyer_id = Set(buyer);
    }
    if let Some(amount) = update.amount {
        edited.amount = Set(amount);
    }
    if let Some(items) = update.items {
        edited.items = Set(items.trim().to_string());
    }
    if let (Some(date), Some(month)) = (update.date, new_month) {
        edited.date = Set(date);
        edited.month = Set(month.to_string());
    }
    let edited = edited.update(&txn).await?;

    txn.commit().await?;
    Ok(edited)
}

/// Deletes an entry.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn delete_bazar(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    bazar_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;
    let entry = find_bazar(&txn, mess_id, bazar_id).await?;
    check_owner_or_manager(actor, &entry, Operation::DeleteBazar)?;
    ensure_unlocked(&txn, mess_id, entry.month.parse()?).await?;

    entry.delete(&txn).await?;
    txn.commit().await?;
    info!(bazar_id, "Bazar entry deleted");
    Ok(())
}

/// Every entry of a mess month, by date.
pub async fn list_bazars<C: ConnectionTrait>(conn: &C, mess_id: i64, month: Month) -> Result<Vec<BazarModel>> {
    Bazar::find()
        .filter(bazar::Column::MessId.eq(mess_id))
        .filter(bazar::Column::Month.eq(month.to_string()))
        .order_by_asc(bazar::Column::Date)
        .order_by_asc(bazar::Column::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Entries of a mess month still waiting for approval.
pub async fn list_pending_bazars(
    db: &DatabaseConnection,
    mess_id: i64,
    month: Month,
) -> Result<Vec<BazarModel>> {
    Bazar::find()
        .filter(bazar::Column::MessId.eq(mess_id))
        .filter(bazar::Column::Month.eq(month.to_string()))
        .filter(bazar::Column::Status.eq(EntryStatus::Pending.as_str()))
        .order_by_asc(bazar::Column::Date)
        .order_by_asc(bazar::Column::Id)
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

    fn groceries(mess_id: i64, amount: Decimal) -> NewBazar {
        NewBazar {
            mess_id,
            buyer_id: None,
            amount,
            items: "rice, lentils".to_string(),
            date: date(2024, 3, 5),
        }
    }

    #[tokio::test]
    async fn test_manager_entry_is_approved() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;

        let entry = create_bazar(&db, &mess.admin, groceries(mess.mess_id, dec!(600))).await?;
        assert_eq!(entry.status, "approved");
        assert_eq!(entry.month, "2024-03");
        assert_eq!(entry.buyer_id, "A");
        Ok(())
    }

    #[tokio::test]
    async fn test_out_of_range_amount_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let huge = dec!(50000000000000000000000000000);

        let err = create_bazar(&db, &mess.admin, groceries(mess.mess_id, huge))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let entry = create_bazar(&db, &mess.admin, groceries(mess.mess_id, dec!(600))).await?;
        let update = BazarUpdate {
            amount: Some(huge),
            ..Default::default()
        };
        let err = update_bazar(&db, &mess.admin, mess.mess_id, entry.id, update)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let entries = list_bazars(&db, mess.mess_id, month("2024-03")).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, dec!(600));
        Ok(())
    }

    #[tokio::test]
    async fn test_member_entry_waits_for_approval() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;

        let entry = create_bazar(&db, &mess.member, groceries(mess.mess_id, dec!(250))).await?;
        assert_eq!(entry.status, "pending");
        let pending = list_pending_bazars(&db, mess.mess_id, month("2024-03")).await?;
        assert_eq!(pending.len(), 1);

        let err = approve_bazar(&db, &mess.member, mess.mess_id, entry.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        approve_bazar(&db, &mess.admin, mess.mess_id, entry.id).await?;
        assert!(list_pending_bazars(&db, mess.mess_id, month("2024-03")).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_member_cannot_record_for_others() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;

        let mut new = groceries(mess.mess_id, dec!(100));
        new.buyer_id = Some("A".to_string());
        let err = create_bazar(&db, &mess.member, new).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let mut new = groceries(mess.mess_id, dec!(100));
        new.buyer_id = Some("B".to_string());
        let entry = create_bazar(&db, &mess.admin, new).await?;
        assert_eq!(entry.buyer_id, "B");
        Ok(())
    }

    #[tokio::test]
    async fn test_owner_edits_only_while_pending() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let entry = create_bazar(&db, &mess.member, groceries(mess.mess_id, dec!(250))).await?;

        let edited = update_bazar(
            &db,
            &mess.member,
            mess.mess_id,
            entry.id,
            BazarUpdate {
                amount: Some(dec!(275)),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(edited.amount, dec!(275));

        approve_bazar(&db, &mess.admin, mess.mess_id, entry.id).await?;
        let err = update_bazar(
            &db,
            &mess.member,
            mess.mess_id,
            entry.id,
            BazarUpdate {
                amount: Some(dec!(300)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        let err = delete_bazar(&db, &mess.member, mess.mess_id, entry.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        // A manager can still correct it
        update_bazar(
            &db,
            &mess.admin,
            mess.mess_id,
            entry.id,
            BazarUpdate {
                amount: Some(dec!(300)),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_date_change_moves_month() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let entry = create_bazar(&db, &mess.admin, groceries(mess.mess_id, dec!(100))).await?;

        lock::lock_month(&db, &mess.admin, mess.mess_id, month("2024-04")).await?;
        let err = update_bazar(
            &db,
            &mess.admin,
            mess.mess_id,
            entry.id,
            BazarUpdate {
                date: Some(date(2024, 4, 2)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Locked);

        let moved = update_bazar(
            &db,
            &mess.admin,
            mess.mess_id,
            entry.id,
            BazarUpdate {
                date: Some(date(2024, 2, 28)),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(moved.month, "2024-02");
        assert!(list_bazars(&db, mess.mess_id, month("2024-03")).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_locked_month_rejects_bazar() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        lock::lock_month(&db, &mess.admin, mess.mess_id, month("2024-03")).await?;

        let err = create_bazar(&db, &mess.member, groceries(mess.mess_id, dec!(50)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Locked);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_own_pending_entry() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let entry = create_bazar(&db, &mess.member, groceries(mess.mess_id, dec!(80))).await?;

        delete_bazar(&db, &mess.member, mess.mess_id, entry.id).await?;
        assert!(list_bazars(&db, mess.mess_id, month("2024-03")).await?.is_empty());

        let err = delete_bazar(&db, &mess.admin, mess.mess_id, entry.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        Ok(())
    }
}
