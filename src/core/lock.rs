//! Month locking - freezes a month's ledger once it has been settled.
//!
//! State per (mess, month):
//!
//! ```text
//! unlocked --lock--> locked --request_unlock--> unlock_requested
//!    ^                  ^                              |
//!    |                  +----------- deny -------------+
//!    +--------------------------- approve -------------+
//! ```
//!
//! A missing record reads as unlocked. An unlock may carry an expiry, after
//! which the month reads as locked again without anyone writing to it.

use crate::{
    core::{
        mess::require_mess,
        month::Month,
        roles::{Actor, Operation, authorize},
    },
    entities::{MonthLock, month_lock},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Effective lock state of a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// Entries may be changed
    Unlocked,
    /// Entries are frozen
    Locked,
    /// Frozen, with an unlock request waiting for a manager
    UnlockRequested,
}

impl LockState {
    /// Reads the state a stored record is in at `now`.
    #[must_use]
    pub fn of(record: Option<&month_lock::Model>, now: DateTime<Utc>) -> Self {
        let Some(record) = record else {
            return Self::Unlocked;
        };
        if record.is_locked {
            if record.unlock_requested {
                Self::UnlockRequested
            } else {
                Self::Locked
            }
        } else if record.unlock_expiry.is_some_and(|expiry| expiry <= now) {
            Self::Locked
        } else {
            Self::Unlocked
        }
    }

    /// Whether mutations are refused.
    #[must_use]
    pub const fn is_locked(self) -> bool {
        !matches!(self, Self::Unlocked)
    }
}

/// Lock status of one mess month as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthLockStatus {
    /// Mess the status belongs to
    pub mess_id: i64,
    /// Month the status belongs to
    pub month: Month,
    /// Effective state right now
    pub state: LockState,
    /// Who last locked the month
    pub locked_by: Option<String>,
    /// When the month was last locked
    pub locked_at: Option<DateTime<Utc>>,
    /// Who asked for the pending unlock
    pub requested_by: Option<String>,
    /// When a granted unlock lapses
    pub unlock_expiry: Option<DateTime<Utc>>,
}

impl MonthLockStatus {
    fn from_record(
        mess_id: i64,
        month: Month,
        record: Option<&month_lock::Model>,
        now: DateTime<Utc>,
    ) -> Self {
        let state = LockState::of(record, now);
        Self {
            mess_id,
            month,
            state,
            locked_by: record.and_then(|r| r.locked_by.clone()),
            locked_at: record.and_then(|r| r.locked_at),
            requested_by: record
                .filter(|_| state == LockState::UnlockRequested)
                .and_then(|r| r.requested_by.clone()),
            unlock_expiry: record
                .filter(|_| state == LockState::Unlocked)
                .and_then(|r| r.unlock_expiry),
        }
    }

    /// Whether mutations are refused.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    /// Whether an unlock request is waiting.
    #[must_use]
    pub fn unlock_requested(&self) -> bool {
        self.state == LockState::UnlockRequested
    }
}

async fn find_record<C: ConnectionTrait>(
    conn: &C,
    mess_id: i64,
    month: Month,
) -> Result<Option<month_lock::Model>> {
    MonthLock::find()
        .filter(month_lock::Column::MessId.eq(mess_id))
        .filter(month_lock::Column::Month.eq(month.to_string()))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Fails with `Locked` when `month` is frozen for the mess.
///
/// Runs on whatever connection the guarded write uses, so the check and the
/// write share one transaction.
pub async fn ensure_unlocked<C: ConnectionTrait>(conn: &C, mess_id: i64, month: Month) -> Result<()> {
    let record = find_record(conn, mess_id, month).await?;
    if LockState::of(record.as_ref(), Utc::now()).is_locked() {
        return Err(Error::Locked {
            mess_id,
            month: month.to_string(),
        });
    }
    Ok(())
}

/// Writes a new version of the lock record, creating it if needed.
async fn save_record<C, F>(
    conn: &C,
    existing: Option<month_lock::Model>,
    mess_id: i64,
    month: Month,
    now: DateTime<Utc>,
    apply: F,
) -> Result<month_lock::Model>
where
    C: ConnectionTrait,
    F: FnOnce(&mut month_lock::ActiveModel),
{
    let is_new = existing.is_none();
    let mut record = existing.map_or_else(
        || month_lock::ActiveModel {
            mess_id: Set(mess_id),
            month: Set(month.to_string()),
            is_locked: Set(false),
            locked_by: Set(None),
            locked_at: Set(None),
            unlock_requested: Set(false),
            requested_by: Set(None),
            unlock_expiry: Set(None),
            ..Default::default()
        },
        Into::into,
    );
    apply(&mut record);
    record.updated_at = Set(now);

    if is_new {
        record.insert(conn).await.map_err(Into::into)
    } else {
        record.update(conn).await.map_err(Into::into)
    }
}

fn open_record(record: &mut month_lock::ActiveModel, now: DateTime<Utc>, window: Option<Duration>) {
    record.is_locked = Set(false);
    record.unlock_requested = Set(false);
    record.requested_by = Set(None);
    record.unlock_expiry = Set(window.map(|w| now + w));
}

/// Current lock status of a month.
pub async fn get_lock_status(
    db: &DatabaseConnection,
    mess_id: i64,
    month: Month,
) -> Result<MonthLockStatus> {
    require_mess(db, mess_id).await?;
    let record = find_record(db, mess_id, month).await?;
    Ok(MonthLockStatus::from_record(
        mess_id,
        month,
        record.as_ref(),
        Utc::now(),
    ))
}

/// Freezes a month. Locking a locked month refreshes who locked it and
/// drops any pending request.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn lock_month(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    month: Month,
) -> Result<MonthLockStatus> {
    authorize(actor, Operation::LockMonth)?;

    let txn = db.begin().await?;
    require_mess(&txn, mess_id).await?;
    let now = Utc::now();
    let existing = find_record(&txn, mess_id, month).await?;
    let saved = save_record(&txn, existing, mess_id, month, now, |record| {
        record.is_locked = Set(true);
        record.locked_by = Set(Some(actor.user_id.clone()));
        record.locked_at = Set(Some(now));
        record.unlock_requested = Set(false);
        record.requested_by = Set(None);
        record.unlock_expiry = Set(None);
    })
    .await?;
    txn.commit().await?;

    info!(mess_id, %month, "Month locked");
    Ok(MonthLockStatus::from_record(mess_id, month, Some(&saved), now))
}

/// Reopens a month directly. With a `window` the month relocks by itself
/// once it elapses.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn unlock_month(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    month: Month,
    window: Option<Duration>,
) -> Result<MonthLockStatus> {
    authorize(actor, Operation::UnlockMonth)?;

    let txn = db.begin().await?;
    require_mess(&txn, mess_id).await?;
    let now = Utc::now();
    let existing = find_record(&txn, mess_id, month).await?;
    let saved = save_record(&txn, existing, mess_id, month, now, |record| {
        open_record(record, now, window);
    })
    .await?;
    txn.commit().await?;

    info!(mess_id, %month, "Month unlocked");
    Ok(MonthLockStatus::from_record(mess_id, month, Some(&saved), now))
}

/// Asks a manager to reopen a locked month. Asking again while a request is
/// waiting changes nothing.
///
/// # Errors
/// `Validation` if the month is not locked.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn request_unlock(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    month: Month,
) -> Result<MonthLockStatus> {
    authorize(actor, Operation::RequestUnlock)?;

    let txn = db.begin().await?;
    require_mess(&txn, mess_id).await?;
    let now = Utc::now();
    let existing = find_record(&txn, mess_id, month).await?;

    let saved = match LockState::of(existing.as_ref(), now) {
        LockState::Unlocked => {
            return Err(Error::validation(format!("{month} is not locked")));
        }
        LockState::UnlockRequested => existing,
        LockState::Locked => Some(
            save_record(&txn, existing, mess_id, month, now, |record| {
                // An expired unlock is persisted as locked from here on
                record.is_locked = Set(true);
                record.unlock_requested = Set(true);
                record.requested_by = Set(Some(actor.user_id.clone()));
                record.unlock_expiry = Set(None);
            })
            .await?,
        ),
    };
    txn.commit().await?;

    info!(mess_id, %month, "Unlock requested");
    Ok(MonthLockStatus::from_record(
        mess_id,
        month,
        saved.as_ref(),
        now,
    ))
}

/// Grants or denies a pending unlock request. Granting reopens the month,
/// for `window` if given; denying leaves it locked.
///
/// # Errors
/// `Validation` if no request is waiting.
#[instrument(skip(db, actor), fields(actor = %actor.user_id))]
pub async fn decide_unlock(
    db: &DatabaseConnection,
    actor: &Actor,
    mess_id: i64,
    month: Month,
    approve: bool,
    window: Option<Duration>,
) -> Result<MonthLockStatus> {
    authorize(actor, Operation::DecideUnlock)?;

    let txn = db.begin().await?;
    require_mess(&txn, mess_id).await?;
    let now = Utc::now();
    let existing = find_record(&txn, mess_id, month).await?;
    if LockState::of(existing.as_ref(), now) != LockState::UnlockRequested {
        return Err(Error::validation(format!(
            "there is no unlock request for {month}"
        )));
    }

    let saved = save_record(&txn, existing, mess_id, month, now, |record| {
        if approve {
            open_record(record, now, window);
        } else {
            record.unlock_requested = Set(false);
            record.requested_by = Set(None);
        }
    })
    .await?;
    txn.commit().await?;

    info!(mess_id, %month, approve, "Unlock request decided");
    Ok(MonthLockStatus::from_record(mess_id, month, Some(&saved), now))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;

    fn record(is_locked: bool, requested: bool, expiry: Option<DateTime<Utc>>) -> month_lock::Model {
        month_lock::Model {
            id: 1,
            mess_id: 1,
            month: "2024-03".to_string(),
            is_locked,
            locked_by: Some("A".to_string()),
            locked_at: None,
            unlock_requested: requested,
            requested_by: None,
            unlock_expiry: expiry,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_state_derivation() {
        let now = Utc::now();
        assert_eq!(LockState::of(None, now), LockState::Unlocked);
        assert_eq!(
            LockState::of(Some(&record(true, false, None)), now),
            LockState::Locked
        );
        assert_eq!(
            LockState::of(Some(&record(true, true, None)), now),
            LockState::UnlockRequested
        );
        assert_eq!(
            LockState::of(Some(&record(false, false, None)), now),
            LockState::Unlocked
        );
    }

    #[test]
    fn test_expired_unlock_reads_locked() {
        let now = Utc::now();
        let later = now + Duration::hours(1);
        let open = record(false, false, Some(later));
        assert_eq!(LockState::of(Some(&open), now), LockState::Unlocked);
        assert_eq!(LockState::of(Some(&open), later), LockState::Locked);
        assert_eq!(
            LockState::of(Some(&open), later + Duration::seconds(1)),
            LockState::Locked
        );
    }

    #[tokio::test]
    async fn test_no_record_is_unlocked() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let status = get_lock_status(&db, mess.mess_id, month("2024-03")).await?;
        assert_eq!(status.state, LockState::Unlocked);
        ensure_unlocked(&db, mess.mess_id, month("2024-03")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_lock_blocks_until_request_approved() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let march = month("2024-03");

        lock_month(&db, &mess.admin, mess.mess_id, march).await?;
        let err = ensure_unlocked(&db, mess.mess_id, march).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Locked);

        // Other months are unaffected
        ensure_unlocked(&db, mess.mess_id, march.next()).await?;

        let status = request_unlock(&db, &mess.member, mess.mess_id, march).await?;
        assert!(status.unlock_requested());
        assert_eq!(status.requested_by.as_deref(), Some("B"));
        assert!(ensure_unlocked(&db, mess.mess_id, march).await.is_err());

        // Repeating the request is harmless
        request_unlock(&db, &mess.member, mess.mess_id, march).await?;

        let status = decide_unlock(&db, &mess.admin, mess.mess_id, march, true, None).await?;
        assert_eq!(status.state, LockState::Unlocked);
        ensure_unlocked(&db, mess.mess_id, march).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_denied_request_stays_locked() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let march = month("2024-03");

        lock_month(&db, &mess.admin, mess.mess_id, march).await?;
        request_unlock(&db, &mess.member, mess.mess_id, march).await?;
        let status = decide_unlock(&db, &mess.admin, mess.mess_id, march, false, None).await?;
        assert_eq!(status.state, LockState::Locked);

        // Nothing left to decide
        let err = decide_unlock(&db, &mess.admin, mess.mess_id, march, true, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        Ok(())
    }

    #[tokio::test]
    async fn test_request_on_unlocked_month_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let err = request_unlock(&db, &mess.member, mess.mess_id, month("2024-03"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        Ok(())
    }

    #[tokio::test]
    async fn test_member_cannot_lock_or_decide() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let march = month("2024-03");

        let err = lock_month(&db, &mess.member, mess.mess_id, march)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        lock_month(&db, &mess.admin, mess.mess_id, march).await?;
        request_unlock(&db, &mess.member, mess.mess_id, march).await?;
        let err = decide_unlock(&db, &mess.member, mess.mess_id, march, true, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        Ok(())
    }

    #[tokio::test]
    async fn test_unlock_window_relocks() -> Result<()> {
        let db = setup_test_db().await?;
        let mess = setup_mess(&db).await?;
        let march = month("2024-03");

        lock_month(&db, &mess.admin, mess.mess_id, march).await?;
        let status = unlock_month(
            &db,
            &mess.admin,
            mess.mess_id,
            march,
            Some(Duration::hours(48)),
        )
        .await?;
        assert_eq!(status.state, LockState::Unlocked);
        assert!(status.unlock_expiry.is_some());
        ensure_unlocked(&db, mess.mess_id, march).await?;

        // A window that has already elapsed reads as locked straight away
        unlock_month(
            &db,
            &mess.admin,
            mess.mess_id,
            march,
            Some(Duration::seconds(-1)),
        )
        .await?;
        let status = get_lock_status(&db, mess.mess_id, march).await?;
        assert_eq!(status.state, LockState::Locked);
        assert!(ensure_unlocked(&db, mess.mess_id, march).await.is_err());

        // and can be reopened through the normal request flow
        request_unlock(&db, &mess.member, mess.mess_id, march).await?;
        decide_unlock(&db, &mess.admin, mess.mess_id, march, true, None).await?;
        ensure_unlocked(&db, mess.mess_id, march).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_mess() -> Result<()> {
        let db = setup_test_db().await?;
        let err = get_lock_status(&db, 404, month("2024-03"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        Ok(())
    }
}
