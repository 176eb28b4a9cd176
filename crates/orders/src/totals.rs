//! Order financial totals.
//!
//! ```text
//! subtotal  = Σ qty·rate
//! tax_total = Σ qty·rate·tax_rate/100
//! Percent:  total = (subtotal + tax_total)·(1 − value/100) + shipping_fee
//! Fixed:    total = subtotal + tax_total − value + shipping_fee
//! None:     total = subtotal + tax_total + shipping_fee
//! ```
//!
//! Discount constraints are validated, never clamped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult};

/// Order-level discount.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Discount {
    #[default]
    None,
    /// Percentage in `0..=100` applied to subtotal + tax.
    Percent(Decimal),
    /// Absolute amount, at most subtotal + tax + shipping.
    Fixed(Decimal),
}

/// Header-level pricing inputs.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub discount: Discount,
    pub shipping_fee: Decimal,
}

/// Per-line amounts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub amount: Decimal,
    pub tax_amount: Decimal,
}

/// Pricing inputs of one line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub quantity: i64,
    pub rate: Decimal,
    /// Percentage, e.g. `10` for 10%.
    pub tax_rate: Decimal,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    /// Amount taken off by the discount.
    pub discount_amount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

fn too_large() -> DomainError {
    DomainError::validation("order amount is too large")
}

fn mul(a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_mul(b).ok_or_else(too_large)
}

fn add(a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_add(b).ok_or_else(too_large)
}

pub fn line_amounts(line: PricedLine) -> DomainResult<LineAmounts> {
    if line.rate.is_sign_negative() {
        return Err(DomainError::validation("rate cannot be negative"));
    }
    if line.tax_rate.is_sign_negative() {
        return Err(DomainError::validation("tax rate cannot be negative"));
    }
    let amount = mul(Decimal::from(line.quantity), line.rate)?;
    Ok(LineAmounts {
        amount,
        tax_amount: mul(amount, line.tax_rate)? / HUNDRED,
    })
}

pub fn compute_totals(
    lines: impl IntoIterator<Item = PricedLine>,
    pricing: Pricing,
) -> DomainResult<OrderTotals> {
    if pricing.shipping_fee.is_sign_negative() {
        return Err(DomainError::validation("shipping fee cannot be negative"));
    }

    let mut subtotal = Decimal::ZERO;
    let mut tax_total = Decimal::ZERO;
    for line in lines {
        let amounts = line_amounts(line)?;
        subtotal = add(subtotal, amounts.amount)?;
        tax_total = add(tax_total, amounts.tax_amount)?;
    }

    let gross = add(subtotal, tax_total)?;
    let discount_amount = match pricing.discount {
        Discount::None => Decimal::ZERO,
        Discount::Percent(value) => {
            if value.is_sign_negative() || value > HUNDRED {
                return Err(DomainError::validation(format!(
                    "percent discount must be between 0 and 100 (got {value})"
                )));
            }
            mul(gross, value)? / HUNDRED
        }
        Discount::Fixed(value) => {
            if value.is_sign_negative() {
                return Err(DomainError::validation("fixed discount cannot be negative"));
            }
            let ceiling = add(gross, pricing.shipping_fee)?;
            if value > ceiling {
                return Err(DomainError::validation(format!(
                    "fixed discount {value} exceeds order amount {ceiling}"
                )));
            }
            value
        }
    };

    Ok(OrderTotals {
        subtotal,
        tax_total,
        discount_amount,
        shipping_fee: pricing.shipping_fee,
        total: add(gross - discount_amount, pricing.shipping_fee)?,
    })
}
