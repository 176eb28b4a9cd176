use wareflow_core::{DomainError, DomainResult, ensure_positive};

use crate::status::FulfillmentStatus;

/// An order line with an ordered quantity and one monotonically increasing
/// counter per fulfillment dimension.
pub trait FulfillmentLine {
    type Dimension: Copy + Eq + core::fmt::Display + 'static;

    /// Every dimension tracked for this order type.
    const DIMENSIONS: &'static [Self::Dimension];

    fn ordered(&self) -> i64;

    fn fulfilled(&self, dimension: Self::Dimension) -> i64;
}

fn checked_sum(mut values: impl Iterator<Item = i64>, what: &str) -> DomainResult<i64> {
    values.try_fold(0i64, |acc, v| {
        acc.checked_add(v)
            .ok_or_else(|| DomainError::validation(format!("{what} quantity of the order is too large")))
    })
}

/// Aggregate status of one dimension across all active lines.
pub fn dimension_status<L: FulfillmentLine>(
    lines: &[L],
    dimension: L::Dimension,
) -> DomainResult<FulfillmentStatus> {
    let ordered = checked_sum(lines.iter().map(L::ordered), "ordered")?;
    let fulfilled = checked_sum(lines.iter().map(|l| l.fulfilled(dimension)), "fulfilled")?;
    Ok(FulfillmentStatus::derive(fulfilled, ordered))
}

/// True when every dimension of the order type is complete.
pub fn all_complete<L: FulfillmentLine>(lines: &[L]) -> DomainResult<bool> {
    if lines.is_empty() {
        return Ok(false);
    }
    for dimension in L::DIMENSIONS {
        if dimension_status(lines, *dimension)? != FulfillmentStatus::Complete {
            return Ok(false);
        }
    }
    Ok(true)
}

fn started_dimensions<L: FulfillmentLine>(line: &L) -> Vec<String> {
    L::DIMENSIONS
        .iter()
        .filter(|d| line.fulfilled(**d) != 0)
        .map(|d| d.to_string())
        .collect()
}

/// A line can only be removed while all of its counters are zero.
pub fn ensure_removable<L: FulfillmentLine>(line: &L) -> DomainResult<()> {
    let started = started_dimensions(line);
    if !started.is_empty() {
        return Err(DomainError::invalid_state(format!(
            "cannot remove a line already {}",
            started.join("/")
        )));
    }
    Ok(())
}

/// Growing a line is always allowed; shrinking only while all of its
/// counters are zero.
pub fn ensure_resizable<L: FulfillmentLine>(line: &L, new_quantity: i64) -> DomainResult<()> {
    ensure_positive(new_quantity, "line quantity")?;
    if new_quantity >= line.ordered() {
        return Ok(());
    }
    let started = started_dimensions(line);
    if !started.is_empty() {
        return Err(DomainError::invalid_state(format!(
            "cannot shrink a line already {}",
            started.join("/")
        )));
    }
    Ok(())
}
