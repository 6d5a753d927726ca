//! Shared test utilities for the mess ledger.
//!
//! This module provides helpers for setting up test databases and a small
//! mess with sensible defaults.
#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        mess,
        month::Month,
        roles::{Actor, Role},
    },
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A mess with two active members.
///
/// * `A` ("Alice") created it and is `admin` + `member`
/// * `B` ("User B") is a plain `member`
pub struct TestMess {
    /// ID of the mess
    pub mess_id: i64,
    /// Alice, the admin
    pub admin: Actor,
    /// B, a plain member
    pub member: Actor,
}

/// Creates the standard two-member test mess.
pub async fn setup_mess(db: &DatabaseConnection) -> Result<TestMess> {
    let created = mess::create_mess(db, "Test Mess", Some("guild-1".into()), "A", "Alice").await?;
    let admin = mess::actor_for(db, created.id, "A").await?;

    let mut test_mess = TestMess {
        mess_id: created.id,
        member: admin.clone(),
        admin,
    };
    test_mess.member = add_member(db, &test_mess, "B", &[]).await?;
    Ok(test_mess)
}

/// Adds an approved member with `member` plus `extra_roles` and returns their
/// actor.
pub async fn add_member(
    db: &DatabaseConnection,
    test_mess: &TestMess,
    user_id: &str,
    extra_roles: &[Role],
) -> Result<Actor> {
    mess::request_join(db, test_mess.mess_id, user_id, &format!("User {user_id}")).await?;
    mess::approve_member(db, &test_mess.admin, test_mess.mess_id, user_id).await?;
    for role in extra_roles {
        mess::assign_role(db, &test_mess.admin, test_mess.mess_id, user_id, *role).await?;
    }
    mess::actor_for(db, test_mess.mess_id, user_id).await
}

/// Parses a `YYYY-MM` month.
pub fn month(value: &str) -> Month {
    value.parse().unwrap()
}

/// Builds a calendar date.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
