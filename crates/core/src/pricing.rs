//! Order pricing: line subtotals, the free-shipping threshold and totals.
//!
//! All amounts are `rust_decimal::Decimal` in the shop's single currency.

use rust_decimal::Decimal;
use serde::Serialize;

/// Subtotals up to and including this amount pay for shipping.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(2000, 0, 0, false, 0);

/// Flat shipping fee charged at or below [`FREE_SHIPPING_THRESHOLD`].
pub const SHIPPING_FEE: Decimal = Decimal::from_parts(300, 0, 0, false, 0);

/// Largest amount a stored money column holds (`NUMERIC(10, 2)`): 99 999 999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Decimal places money is stored with.
pub const MONEY_SCALE: u32 = 2;

/// One priced line: unit price snapshot times quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl PricedLine {
    /// Unit price times quantity, or `None` if that leaves `Decimal`'s range.
    #[must_use]
    pub fn amount(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// An order whose total cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("order total exceeds the maximum of {max}", max = MAX_AMOUNT)]
pub struct CostOverflow;

/// Computed cost breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderCosts {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total_cost: Decimal,
}

/// Shipping fee for a given line subtotal.
#[must_use]
pub fn shipping_for(subtotal: Decimal) -> Decimal {
    if subtotal <= FREE_SHIPPING_THRESHOLD {
        SHIPPING_FEE
    } else {
        Decimal::ZERO
    }
}

/// Price an order from its lines.
///
/// # Errors
///
/// Returns [`CostOverflow`] when the total is above [`MAX_AMOUNT`], including
/// line amounts too large for `Decimal` itself.
pub fn order_costs(lines: &[PricedLine]) -> Result<OrderCosts, CostOverflow> {
    let subtotal = lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, line| {
            line.amount().and_then(|amount| acc.checked_add(amount))
        })
        .ok_or(CostOverflow)?;
    let shipping_cost = shipping_for(subtotal);
    let total_cost = subtotal
        .checked_add(shipping_cost)
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or(CostOverflow)?;
    Ok(OrderCosts {
        subtotal,
        shipping_cost,
        total_cost,
    })
}

/// A client-declared amount disagreeing with the computed one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("declared {field} {declared} does not match computed {computed}")]
pub struct CostMismatch {
    pub field: &'static str,
    pub declared: Decimal,
    pub computed: Decimal,
}

impl OrderCosts {
    /// Check client-declared shipping and total against the computed values.
    ///
    /// Missing declarations are accepted; present ones must match exactly
    /// (scale is ignored, so `300` equals `300.00`).
    ///
    /// # Errors
    ///
    /// Returns the first [`CostMismatch`] found.
    pub fn verify_declared(
        &self,
        shipping: Option<Decimal>,
        total: Option<Decimal>,
    ) -> Result<(), CostMismatch> {
        let checks = [
            ("shippingPrice", shipping, self.shipping_cost),
            ("totalPrice", total, self.total_cost),
        ];
        for (field, declared, computed) in checks {
            if let Some(declared) = declared
                && declared != computed
            {
                return Err(CostMismatch {
                    field,
                    declared,
                    computed,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn line(price: Decimal, quantity: i32) -> PricedLine {
        PricedLine {
            unit_price: price,
            quantity,
        }
    }

    #[test]
    fn test_shipping_charged_at_threshold() {
        assert_eq!(shipping_for(dec("2000")), dec("300"));
        assert_eq!(shipping_for(dec("2000.00")), dec("300"));
        assert_eq!(shipping_for(dec("0")), dec("300"));
    }

    #[test]
    fn test_shipping_free_above_threshold() {
        assert_eq!(shipping_for(dec("2000.01")), Decimal::ZERO);
    }

    #[test]
    fn test_order_costs_small_order() {
        let costs = order_costs(&[line(dec("100"), 3)]).unwrap();
        assert_eq!(costs.subtotal, dec("300"));
        assert_eq!(costs.shipping_cost, dec("300"));
        assert_eq!(costs.total_cost, dec("600"));
    }

    #[test]
    fn test_order_costs_large_order() {
        let costs = order_costs(&[line(dec("999.50"), 2), line(dec("10"), 1)]).unwrap();
        assert_eq!(costs.subtotal, dec("2009"));
        assert_eq!(costs.shipping_cost, Decimal::ZERO);
        assert_eq!(costs.total_cost, dec("2009"));
    }

    #[test]
    fn test_max_amount_matches_column() {
        assert_eq!(MAX_AMOUNT, dec("99999999.99"));
        assert_eq!(MAX_AMOUNT.scale(), MONEY_SCALE);
    }

    #[test]
    fn test_order_costs_overflow_is_an_error() {
        let huge = dec("79228162514264337593543950335");
        assert_eq!(line(huge, 2).amount(), None);
        assert_eq!(order_costs(&[line(huge, 2)]), Err(CostOverflow));
        assert_eq!(order_costs(&[line(huge, 1), line(huge, 1)]), Err(CostOverflow));
    }

    #[test]
    fn test_order_costs_bounded_by_column() {
        let costs = order_costs(&[line(dec("49999999.99"), 2)]).unwrap();
        assert_eq!(costs.total_cost, MAX_AMOUNT - dec("0.01"));

        assert_eq!(order_costs(&[line(MAX_AMOUNT, 2)]), Err(CostOverflow));
    }

    #[test]
    fn test_verify_declared() {
        let costs = order_costs(&[line(dec("100"), 3)]).unwrap();
        assert!(costs.verify_declared(None, None).is_ok());
        assert!(costs.verify_declared(Some(dec("300.00")), Some(dec("600"))).is_ok());

        let err = costs.verify_declared(Some(dec("0")), None).unwrap_err();
        assert_eq!(err.field, "shippingPrice");

        let err = costs.verify_declared(None, Some(dec("300"))).unwrap_err();
        assert_eq!(err.field, "totalPrice");
        assert_eq!(err.computed, dec("600"));
    }
}
