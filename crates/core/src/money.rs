//! Integer money arithmetic.
//!
//! Amounts are `u64` minor currency units (cents). Surcharges per kilogram use
//! the same unit.

use crate::error::{DomainError, DomainResult};

/// `quantity × unit_price`, rejecting overflow.
pub fn line_total(quantity: u32, unit_price: u64) -> DomainResult<u64> {
    unit_price
        .checked_mul(u64::from(quantity))
        .ok_or_else(|| DomainError::validation("line total overflows"))
}

/// Sum of amounts, rejecting overflow.
pub fn sum_amounts(amounts: impl IntoIterator<Item = u64>) -> DomainResult<u64> {
    amounts.into_iter().try_fold(0u64, |acc, a| {
        acc.checked_add(a)
            .ok_or_else(|| DomainError::validation("amount total overflows"))
    })
}

/// Render minor units as `"30.00 EUR"` for messages and logs.
pub fn format_minor(amount: u64, currency: &str) -> String {
    format!("{}.{:02} {}", amount / 100, amount % 100, currency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_multiplies() {
        assert_eq!(line_total(3, 1_000).unwrap(), 3_000);
        assert_eq!(line_total(0, 1_000).unwrap(), 0);
    }

    #[test]
    fn overflow_is_validation_error() {
        assert!(matches!(
            line_total(2, u64::MAX),
            Err(DomainError::Validation(_))
        ));
        assert!(sum_amounts([u64::MAX, 1]).is_err());
    }

    #[test]
    fn format_minor_pads_cents() {
        assert_eq!(format_minor(3_005, "EUR"), "30.05 EUR");
    }
}
