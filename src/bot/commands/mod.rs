//! Discord command implementations organized by ledger area.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Bazar (grocery) entry commands
pub mod bazar;

/// Service cost commands
pub mod cost;

/// General utility commands
pub mod general;

/// Daily meal sheet commands
pub mod meals;

/// Mess membership and role commands
pub mod mess;

/// Month lock commands
pub mod month;

/// Payment commands
pub mod payment;

/// Monthly summary command
pub mod summary;

/// Choice types shared by several commands
pub mod choices;

// Export commands
pub use bazar::*;
pub use cost::*;
pub use general::*;
pub use meals::*;
pub use mess::*;
pub use month::*;
pub use payment::*;
pub use summary::*;
