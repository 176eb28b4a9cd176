//! Inventory bookkeeping primitives.
//!
//! Three components with no knowledge of orders:
//! - [`StockLedger`]: per-item quantity buckets
//! - [`BatchAllocator`]: FIFO lots per item
//! - [`LocationInventory`]: per-shelf counters
//!
//! Each component is an extension trait over a storage port (`ItemStore`,
//! `BatchStore`, `LocationStore`), so any backend implementing the port gets
//! the algorithms. Callers run them inside their own unit of work.

pub mod batch;
pub mod item;
pub mod location;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{Batch, BatchAllocator, BatchConsumption, BatchId, BatchStore};
pub use item::{ItemStock, ItemStore, StockLedger, StockLevels};
pub use location::{Location, LocationInventory, LocationStore};
