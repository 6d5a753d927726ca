//! Approval status shared by service costs, bazar entries and payments.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a ledger entry is in its approval workflow.
///
/// Only `Approved` entries count toward settlement. `Rejected` is used by
/// payments only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Waiting for a manager
    Pending,
    /// Counts toward settlement
    Approved,
    /// Turned down by a manager
    Rejected,
}

impl EntryStatus {
    /// Stored form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Approved when the actor may approve, pending otherwise.
    #[must_use]
    pub const fn initial(auto_approve: bool) -> Self {
        if auto_approve {
            Self::Approved
        } else {
            Self::Pending
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::validation(format!("unknown status '{other}'"))),
        }
    }
}
