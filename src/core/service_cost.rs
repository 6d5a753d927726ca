//! Service cost business logic - shared house bills and their shares.
//!
//! A cost is inserted together with its explicit shares in one transaction,
//! and share replacement deletes and re-inserts inside one transaction, so a
//! cost is never observed with a partial share list.

use crate::{
    core::{
        allocator::{self, Allocation, CostShareInput},
        lock::ensure_unlocked,
        mess::{require_mess, require_participant},
        month::Month,
        roles::{Actor, Operation, authorize},
        status::EntryStatus,
    },
    entities::{CostShare, ServiceCost, cost_share, service_cost},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Input for [`add_service_cost`].
#[derive(Debug, Clone)]
pub struct NewServiceCost {
    /// Mess the bill belongs to
    pub mess_id: i64,
    /// Month the bill is settled in
    pub month: Month,
    /// Bill name, e.g. "Rent"
    pub name: String,
    /// Total amount
    pub amount: Decimal,
    /// Explicit shares; empty means an equal split over active members
    pub shares: Vec<CostShareInput>,
    /// Record as approved straight away instead of pending
    pub approved: bool,
}

/// A service cost with its explicit shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCostRecord {
    /// The cost row
    pub cost: service_cost::Model,
    /// Explicit shares, empty for an equal split
    pub shares: Vec<cost_share::Model>,
}

impl ServiceCostRecord {
    /// Shares in allocator form.
    #[must_use]
    pub fn share_inputs(&self) -> Vec<CostShareInput> {
        self.shares
            .iter()
            .map(|s| CostShareInput::new(s.user_id.clone(), s.amount))
            .collect()
    }

    /// Whether the cost counts toward settlement.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.cost.status == EntryStatus::Approved.as_str()
    }

    /// What each member owes for this cost given the active member set.
    pub fn allocate<S: AsRef<str>>(&self, active_members: &[S]) -> Result<Allocation> {
        allocator::allocate(self.cost.amount, &self.share_inputs(), active_members)
    }
}

async fn find_cost<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    cost_id: i64,
) -> Result<service_cost::Model> {
    ServiceCost::find_by_id(cost_id)
        .one(conn)
        .await?
        .filter(|cost| cost.mess_id == mess_id)
        .ok_or_else(|| Error::not_found("Service cost", cost_id))
}

fn cost_month(cost: &service_cost::Model) -> Result<Month> {
    cost.month.parse()
}

async fn insert_shares<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    cost_id: i64,
    shares: &[CostShareInput],
) -> Result<Vec<cost_share::Model>> {
    let mut inserted = Vec::with_capacity(shares.len());
    for share in shares {
        require_participant(conn, mess_id, &share.user_id).await?;
        let model = cost_share::ActiveModel {
            cost_id: Set(cost_id),
            user_id: Set(share.user_id.clone()),
            amount: Set(share.amount),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        inserted.push(model);
    }
    Ok(inserted)
}

/// Records a service cost, with its explicit shares if any.
///
/// # Errors
/// - `InvalidAmount` for a non-positive amount
/// - `Validation` for a blank name, malformed shares or a share for a non-member
/// - `Unauthorized` unless the actor is a manager
/// - `Locked` if the month is locked
#[instrument(skip(db, actor, new), fields(actor = %actor.user_id, mess_id = new.mess_id, month = %new.month))]
pub async fn add_service_cost(
    db: &DatabaseConnection,
    actor: &Actor,
    new: NewServiceCost,
) -> Result<ServiceCostRecord> {
    authorize(actor, Operation::AddServiceCost)?;

    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::validation("cost name cannot be empty"));
    }
    allocator::check_amount(new.amount)?;
    if !new.shares.is_empty() {
        allocator::validate_shares(new.amount, &new.shares)?;
    }

    let txn = db.begin().await?;
    require_mess(&txn, new.mess_id).await?;
    ensure_unlocked(&txn, new.mess_id, new.month).await?;

    let cost = service_cost::ActiveModel {
        mess_id: Set(new.mess_id),
        month: Set(new.month.to_string()),
        name: Set(name.to_string()),
        amount: Set(new.amount),
        status: Set(EntryStatus::initial(new.approved).as_str().to_string()),
        created_by: Set(actor.user_id.clone()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let shares = insert_shares(&txn, new.mess_id, cost.id, &new.shares).await?;

    txn.commit().await?;
    info!(cost_id = cost.id, amount = %cost.amount, "Service cost added");
    Ok(ServiceCostRecord { cost, shares })
}

/// Approves a pending cost. Approving an approved cost is a no-op.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn approve_service_cost(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    cost_id: i64,
) -> Result<service_cost::Model> {
    authorize(actor, Operation::ApproveServiceCost)?;

    let txn = db.begin().await?;
    let cost = find_cost(&txn, mess_id, cost_id).await?;
    ensure_unlocked(&txn, mess_id, cost_month(&cost)?).await?;
    if cost.status == EntryStatus::Approved.as_str() {
        return Ok(cost);
    }

    let mut approved: service_cost::ActiveModel = cost.into();
    approved.status = Set(EntryStatus::Approved.as_str().to_string());
    let approved = approved.update(&txn).await?;
    txn.commit().await?;
    Ok(approved)
}

/// Replaces a cost's explicit shares. An empty list turns the cost back into
/// an equal split. The last write wins.
#[instrument(skip(db, actor, shares), fields(actor = %actor.user_id))]
pub async fn update_cost_shares(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    cost_id: i64,
    shares: Vec<CostShareInput>,
) -> Result<ServiceCostRecord> {
    authorize(actor, Operation::UpdateCostShares)?;

    let txn = db.begin().await?;
    let cost = find_cost(&txn, mess_id, cost_id).await?;
    if !shares.is_empty() {
        allocator::validate_shares(cost.amount, &shares)?;
    }
    ensure_unlocked(&txn, mess_id, cost_month(&cost)?).await?;

    CostShare::delete_many()
        .filter(cost_share::Column::CostId.eq(cost_id))
        .exec(&txn)
        .await?;
    let shares = insert_shares(&txn, mess_id, cost_id, &shares).await?;

    txn.commit().await?;
    info!(cost_id, shares = shares.len(), "Cost shares replaced");
    Ok(ServiceCostRecord { cost, shares })
}

/// Deletes a cost and its shares.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn delete_service_cost(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    cost_id: i64,
) -> Result<()> {
    authorize(actor, Operation::DeleteServiceCost)?;

    let txn = db.begin().await?;
    let cost = find_cost(&txn, mess_id, cost_id).await?;
    ensure_unlocked(&txn, mess_id, cost_month(&cost)?).await?;

    CostShare::delete_many()
        .filter(cost_share::Column::CostId.eq(cost_id))
        .exec(&txn)
        .await?;
    cost.delete(&txn).await?;

    txn.commit().await?;
    info!(cost_id, "Service cost deleted");
    Ok(())
}

/// All costs of a mess month with their shares, oldest first.
pub async fn list_service_costs<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    month: Month,
) -> Result<Vec<ServiceCostRecord>> {
    Ok(ServiceCost::find()
        .filter(service_cost::Column::MessId.eq(mess_id))
        .filter(service_cost::Column::Month.eq(month.to_string()))
        .order_by_asc(service_cost::Column::Id)
        .find_with_related(CostShare)
        .all(conn)
        .await?
        .into_iter()
        .map(|(cost, shares)| ServiceCostRecord { cost, shares })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::lock;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn rent(mess_id: i64, amount: Decimal, shares: Vec<CostShareInput>) -> NewServiceCost {
        NewServiceCost {
            mess_id,
            month: month("2024-03"),
            name: "Rent".to_string(),
            amount,
            shares,
            approved: true,
        }
    }

    #[tokio::test]
    async fn test_add_equal_split_cost() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;

        let record = add_service_cost(&db, &mess.admin, rent(mess.mess_id, dec!(1000), vec![])).await?;
        assert!(record.is_approved());
        assert!(record.shares.is_empty());

        let allocation = record.allocate(&["A", "B"])?;
        assert_eq!(allocation["A"], dec!(500));
        assert_eq!(allocation["B"], dec!(500));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_cost_with_shares() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;

        let shares = vec![
            CostShareInput::new("A", dec!(700)),
            CostShareInput::new("B", dec!(300)),
        ];
        add_service_cost(&db, &mess.admin, rent(mess.mess_id, dec!(1000), shares)).await?;

        let listed = list_service_costs(&db, mess.mess_id, month("2024-03")).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].shares.len(), 2);
        assert_eq!(listed[0].allocate(&["A", "B"])?["A"], dec!(700));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_cost_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;

        let err = add_service_cost(&db, &mess.admin, rent(mess.mess_id, dec!(0), vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { .. }));

        let bad_sum = vec![CostShareInput::new("A", dec!(800))];
        let err = add_service_cost(&db, &mess.admin, rent(mess.mess_id, dec!(1000), bad_sum))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let stranger = vec![CostShareInput::new("Z", dec!(1000))];
        let err = add_service_cost(&db, &mess.admin, rent(mess.mess_id, dec!(1000), stranger))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let huge = dec!(50000000000000000000000000000);
        let err = add_service_cost(&db, &mess.admin, rent(mess.mess_id, huge, vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Nothing was written by the failed attempts
        assert!(list_service_costs(&db, mess.mess_id, month("2024-03")).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_member_cannot_add_cost() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let err = add_service_cost(&db, &mess.member, rent(mess.mess_id, dec!(1000), vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        Ok(())
    }

    #[tokio::test]
    async fn test_pending_cost_then_approved() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;

        let mut new = rent(mess.mess_id, dec!(1000), vec![]);
        new.approved = false;
        let record = add_service_cost(&db, &mess.admin, new).await?;
        assert!(!record.is_approved());

        let approved = approve_service_cost(&db, &mess.admin, mess.mess_id, record.cost.id).await?;
        assert_eq!(approved.status, "approved");
        // Again is a no-op
        approve_service_cost(&db, &mess.admin, mess.mess_id, record.cost.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_shares_last_write_wins() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let record = add_service_cost(&db, &mess.admin, rent(mess.mess_id, dec!(900), vec![])).await?;
        let id = record.cost.id;

        update_cost_shares(
            &db,
            &mess.admin,
            mess.mess_id,
            id,
            vec![CostShareInput::new("A", dec!(900))],
        )
        .await?;
        update_cost_shares(
            &db,
            &mess.admin,
            mess.mess_id,
            id,
            vec![
                CostShareInput::new("A", dec!(400)),
                CostShareInput::new("B", dec!(500)),
            ],
        )
        .await?;

        let listed = list_service_costs(&db, mess.mess_id, month("2024-03")).await?;
        let allocation = listed[0].allocate(&["A", "B"])?;
        assert_eq!(allocation["A"], dec!(400));
        assert_eq!(allocation["B"], dec!(500));

        // Invalid replacement leaves the previous shares untouched
        let err = update_cost_shares(
            &db,
            &mess.admin,
            mess.mess_id,
            id,
            vec![CostShareInput::new("A", dec!(10))],
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let listed = list_service_costs(&db, mess.mess_id, month("2024-03")).await?;
        assert_eq!(listed[0].shares.len(), 2);

        // Clearing shares returns to an equal split
        update_cost_shares(&db, &mess.admin, mess.mess_id, id, vec![]).await?;
        let listed = list_service_costs(&db, mess.mess_id, month("2024-03")).await?;
        assert_eq!(listed[0].allocate(&["A", "B"])?["B"], dec!(450));
        Ok(())
    }

    #[tokio::test]
    async fn test_locked_month_rejects_cost_changes() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let record = add_service_cost(&db, &mess.admin, rent(mess.mess_id, dec!(1000), vec![])).await?;

        lock::lock_month(&db, &mess.admin, mess.mess_id, month("2024-03")).await?;

        let err = add_service_cost(&db, &mess.admin, rent(mess.mess_id, dec!(50), vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Locked);
        let err = delete_service_cost(&db, &mess.admin, mess.mess_id, record.cost.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Locked);

        lock::request_unlock(&db, &mess.member, mess.mess_id, month("2024-03")).await?;
        lock::decide_unlock(&db, &mess.admin, mess.mess_id, month("2024-03"), true, None).await?;
        add_service_cost(&db, &mess.admin, rent(mess.mess_id, dec!(50), vec![])).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cost() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let shares = vec![CostShareInput::new("A", dec!(100))];
        let record = add_service_cost(&db, &mess.admin, rent(mess.mess_id, dec!(100), shares)).await?;

        delete_service_cost(&db, &mess.admin, mess.mess_id, record.cost.id).await?;
        assert!(list_service_costs(&db, mess.mess_id, month("2024-03")).await?.is_empty());
        assert!(CostShare::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cost_from_another_mess_not_found() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<service_cost::Model>::new()])
            .into_connection();
        let admin = Actor::new("A", [crate::core::roles::Role::Admin]);
        let err = approve_service_cost(&db, &admin, 1, 42).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        Ok(())
    }
}
