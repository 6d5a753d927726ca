//! Cost allocation - turns a service cost into what each member owes.
//!
//! Pure functions only; callers load the cost, its shares and the active
//! member set and hand them in.

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, BTreeSet};

/// How far explicit shares may drift from the cost amount (0.1).
pub const SHARE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Smallest unit handed out when spreading a remainder (0.01).
const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest amount one ledger entry may carry (one trillion).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Error for arithmetic that left the decimal range.
pub fn overflow(what: &str) -> Error {
    Error::validation(format!("{what} is out of range"))
}

/// Sums `values`, failing instead of panicking on overflow.
pub fn checked_sum<I>(values: I, what: &str) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, |total, value| {
        total.checked_add(value).ok_or_else(|| overflow(what))
    })
}

/// Checks an entry amount: positive and at most [`MAX_AMOUNT`].
///
/// # Errors
/// `InvalidAmount` for zero or less, `Validation` above the limit.
pub fn check_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    if amount > MAX_AMOUNT {
        return Err(Error::validation(format!(
            "amount {amount} exceeds the limit of {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

/// Per-member amounts owed, keyed by user ID.
pub type Allocation = BTreeMap<String, Decimal>;

/// One explicitly assigned portion of a cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostShareInput {
    /// Member who owes the share
    pub user_id: String,
    /// Amount owed
    pub amount: Decimal,
}

impl CostShareInput {
    /// Convenience constructor.
    pub fn new(user_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
        }
    }
}

/// Checks that explicit shares are well formed and add up to `amount`.
///
/// # Errors
/// `Validation` for a blank user ID, a negative share, a repeated user ID or a
/// total outside [`SHARE_TOLERANCE`] of `amount`.
pub fn validate_shares(amount: Decimal, shares: &[CostShareInput]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for share in shares {
        if share.user_id.trim().is_empty() {
            return Err(Error::validation("share user ID cannot be empty"));
        }
        if share.amount.is_sign_negative() && !share.amount.is_zero() {
            return Err(Error::validation(format!(
                "share for {} is negative ({})",
                share.user_id, share.amount
            )));
        }
        if share.amount > MAX_AMOUNT {
            return Err(Error::validation(format!(
                "share for {} exceeds the limit of {MAX_AMOUNT}",
                share.user_id
            )));
        }
        if !seen.insert(share.user_id.as_str()) {
            return Err(Error::validation(format!(
                "user {} appears more than once in the shares",
                share.user_id
            )));
        }
    }

    let total = checked_sum(shares.iter().map(|share| share.amount), "share total")?;
    let gap = total.checked_sub(amount).ok_or_else(|| overflow("share total"))?;
    if gap.abs() > SHARE_TOLERANCE {
        return Err(Error::validation(format!(
            "shares add up to {total} but the cost is {amount}"
        )));
    }
    Ok(())
}

/// Splits `amount` equally across `members`.
///
/// Each member gets the equal share truncated to the cent. The leftover cents
/// go one at a time to members in user ID order, and anything below a cent
/// goes to the first member, so the result always sums to `amount` exactly.
/// Duplicate IDs are counted once; no members yields an empty allocation.
#[must_use]
pub fn split_equally<S: AsRef<str>>(amount: Decimal, members: &[S]) -> Allocation {
    let ordered: BTreeSet<&str> = members.iter().map(AsRef::as_ref).collect();
    if ordered.is_empty() {
        return Allocation::new();
    }

    let count = Decimal::from(ordered.len());
    let base = (amount / count).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let mut leftover = amount - base * count;

    let mut allocation: Allocation = ordered
        .iter()
        .map(|user_id| ((*user_id).to_string(), base))
        .collect();

    for owed in allocation.values_mut() {
        if leftover < CENT {
            break;
        }
        *owed += CENT;
        leftover -= CENT;
    }

    if !leftover.is_zero() {
        if let Some(first) = allocation.values_mut().next() {
            *first += leftover;
        }
    }

    allocation
}

/// Allocates a service cost.
///
/// Without explicit shares the amount is split equally across
/// `active_members`; with shares, the shares are validated and used as-is and
/// anyone not listed owes nothing.
///
/// # Errors
/// `InvalidAmount` when `amount` is not positive, or whatever
/// [`validate_shares`] reports.
pub fn allocate<S: AsRef<str>>(
    amount: Decimal,
    shares: &[CostShareInput],
    active_members: &[S],
) -> Result<Allocation> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }

    if shares.is_empty() {
        return Ok(split_equally(amount, active_members));
    }

    validate_shares(amount, shares)?;
    Ok(shares
        .iter()
        .map(|share| (share.user_id.clone(), share.amount))
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;
    use rust_decimal_macros::dec;

    fn total(allocation: &Allocation) -> Decimal {
        allocation.values().copied().sum()
    }

    #[test]
    fn test_even_split() {
        let allocation = split_equally(dec!(1000), &["a", "b"]);
        assert_eq!(allocation["a"], dec!(500));
        assert_eq!(allocation["b"], dec!(500));
    }

    #[test]
    fn test_remainder_goes_to_first_members() {
        let allocation = split_equally(dec!(100), &["c", "a", "b"]);
        assert_eq!(allocation["a"], dec!(33.34));
        assert_eq!(allocation["b"], dec!(33.33));
        assert_eq!(allocation["c"], dec!(33.33));
        assert_eq!(total(&allocation), dec!(100));

        let allocation = split_equally(dec!(0.05), &["a", "b", "c"]);
        assert_eq!(allocation["a"], dec!(0.02));
        assert_eq!(allocation["b"], dec!(0.02));
        assert_eq!(allocation["c"], dec!(0.01));
    }

    #[test]
    fn test_equal_split_never_leaks() {
        let amounts = [
            dec!(1),
            dec!(10),
            dec!(99.99),
            dec!(1234.567),
            dec!(0.001),
            dec!(7777.77),
        ];
        let members = ["m1", "m2", "m3", "m4", "m5", "m6", "m7"];
        for amount in amounts {
            for n in 1..=members.len() {
                let allocation = split_equally(amount, &members[..n]);
                assert_eq!(allocation.len(), n);
                assert_eq!(total(&allocation), amount, "{amount} over {n}");
            }
        }
    }

    #[test]
    fn test_sub_cent_residue_goes_to_first_member() {
        let allocation = split_equally(dec!(10.005), &["a", "b"]);
        assert_eq!(allocation["a"], dec!(5.005));
        assert_eq!(allocation["b"], dec!(5.00));
    }

    #[test]
    fn test_duplicate_members_counted_once() {
        let allocation = split_equally(dec!(90), &["a", "b", "a"]);
        assert_eq!(allocation.len(), 2);
        assert_eq!(allocation["a"], dec!(45));
    }

    #[test]
    fn test_no_active_members_allocates_nothing() {
        let none: [&str; 0] = [];
        assert!(allocate(dec!(500), &[], &none).unwrap().is_empty());
    }

    #[test]
    fn test_shares_within_tolerance_accepted() {
        let shares = vec![
            CostShareInput::new("a", dec!(600)),
            CostShareInput::new("b", dec!(399.95)),
        ];
        let allocation = allocate(dec!(1000), &shares, &["a", "b", "c"]).unwrap();
        assert_eq!(allocation["a"], dec!(600));
        assert_eq!(allocation["b"], dec!(399.95));
        assert!(!allocation.contains_key("c"));

        let exact_edge = vec![
            CostShareInput::new("a", dec!(500)),
            CostShareInput::new("b", dec!(499.9)),
        ];
        assert!(allocate(dec!(1000), &exact_edge, &["a", "b"]).is_ok());
    }

    #[test]
    fn test_shares_outside_tolerance_rejected() {
        let shares = vec![
            CostShareInput::new("a", dec!(600)),
            CostShareInput::new("b", dec!(399.8)),
        ];
        let err = allocate(dec!(1000), &shares, &["a", "b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let over = vec![CostShareInput::new("a", dec!(1000.2))];
        assert!(allocate(dec!(1000), &over, &["a"]).is_err());
    }

    #[test]
    fn test_malformed_shares_rejected() {
        let negative = vec![
            CostShareInput::new("a", dec!(1100)),
            CostShareInput::new("b", dec!(-100)),
        ];
        assert!(validate_shares(dec!(1000), &negative).is_err());

        let duplicate = vec![
            CostShareInput::new("a", dec!(500)),
            CostShareInput::new("a", dec!(500)),
        ];
        assert!(validate_shares(dec!(1000), &duplicate).is_err());

        let blank = vec![CostShareInput::new(" ", dec!(1000))];
        assert!(validate_shares(dec!(1000), &blank).is_err());
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let err = allocate(dec!(0), &[], &["a"]).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { .. }));
        assert!(allocate(dec!(-5), &[], &["a"]).is_err());
    }

    #[test]
    fn test_check_amount_bounds() {
        assert!(check_amount(dec!(0.01)).is_ok());
        assert!(check_amount(MAX_AMOUNT).is_ok());
        assert_eq!(MAX_AMOUNT, dec!(1_000_000_000_000));

        assert!(matches!(
            check_amount(Decimal::ZERO).unwrap_err(),
            Error::InvalidAmount { .. }
        ));
        let err = check_amount(dec!(50000000000000000000000000000)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_huge_shares_rejected_without_panic() {
        let huge = vec![
            CostShareInput::new("a", dec!(50000000000000000000000000000)),
            CostShareInput::new("b", dec!(50000000000000000000000000000)),
        ];
        let err = validate_shares(dec!(1000), &huge).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_checked_sum_reports_overflow() {
        assert_eq!(checked_sum([dec!(1), dec!(2.5)], "total").unwrap(), dec!(3.5));
        let err = checked_sum([Decimal::MAX, Decimal::MAX], "total").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
