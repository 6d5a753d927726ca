//! Unified error type for the ledger engine and the bot layer.
//!
//! Domain failures fall into four kinds callers must be able to tell apart:
//! validation, not-found, authorization and locked-month. Everything else is
//! infrastructure (database, configuration, Discord).

use rust_decimal::Decimal;
use thiserror::Error;

/// Every error the crate can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or inconsistent input (bad month, shares not summing, ...)
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// An amount that must be positive was zero or negative
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// Unknown mess, member or ledger entry
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The caller's role set does not allow the operation
    #[error("Not allowed to {action}: requires one of [{required}]")]
    Unauthorized {
        /// Human-readable name of the operation
        action: &'static str,
        /// Comma separated list of roles that would have been accepted
        required: String,
    },

    /// Mutation attempted on a locked month
    #[error("Month {month} is locked for mess {mess_id}")]
    Locked {
        /// Mess whose ledger is locked
        mess_id: i64,
        /// Locked month (`YYYY-MM`)
        month: String,
    },

    /// Configuration file or value problem
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or unreadable environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Error while building a reply string
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Serenity/Poise framework error
    #[error("Discord framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Coarse classification of [`Error`] used by callers that only need to
/// react to the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input rejected before any write
    Validation,
    /// Referenced record does not exist
    NotFound,
    /// Caller lacks the required role
    Authorization,
    /// Month is locked against mutation
    Locked,
    /// Infrastructure failure
    Internal,
}

impl Error {
    /// Shorthand for building a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for building a [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidAmount { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::Locked { .. } => ErrorKind::Locked,
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::Fmt(_)
            | Self::Framework(_) => ErrorKind::Internal,
        }
    }

    /// True for failures caused by the caller's input or permissions, which
    /// the bot reports back verbatim instead of logging as faults.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
