//! Order status engine.
//!
//! Order headers are never the source of truth: line counters are. This crate
//! derives per-dimension fulfillment status, the overall lifecycle status and
//! the financial totals from lines, and guards line edits against counters
//! that already moved. Pure functions only.

pub mod line;
pub mod status;
pub mod totals;

pub use line::{FulfillmentLine, all_complete, dimension_status, ensure_removable, ensure_resizable};
pub use status::{FulfillmentStatus, OrderStatus};
pub use totals::{Discount, LineAmounts, OrderTotals, Pricing, PricedLine, compute_totals, line_amounts};
