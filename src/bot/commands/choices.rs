//! Fixed-choice slash command parameters.

use crate::core::{payment::PaymentType, roles::Role};

/// Role picker for `/mess role_add` and `/mess role_remove`.
#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum RoleChoice {
    /// Admin
    #[name = "admin"]
    Admin,
    /// Manager
    #[name = "manager"]
    Manager,
    /// Meal manager
    #[name = "meal_manager"]
    MealManager,
    /// Member
    #[name = "member"]
    Member,
}

impl From<RoleChoice> for Role {
    fn from(value: RoleChoice) -> Self {
        match value {
            RoleChoice::Admin => Self::Admin,
            RoleChoice::Manager => Self::Manager,
            RoleChoice::MealManager => Self::MealManager,
            RoleChoice::Member => Self::Member,
        }
    }
}

/// Payment account picker for `/payment add`.
#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum PaymentKind {
    /// House account (rent, utilities)
    #[name = "house"]
    House,
    /// Meal account (groceries)
    #[name = "meal"]
    Meal,
}

impl From<PaymentKind> for PaymentType {
    fn from(value: PaymentKind) -> Self {
        match value {
            PaymentKind::House => Self::House,
            PaymentKind::Meal => Self::Meal,
        }
    }
}
