//! In-memory transactional warehouse store.
//!
//! Rows carry a version bumped on every committed write. A [`Transaction`]
//! records the version of every row it reads and `commit()` rejects the whole
//! unit of work with `Conflict` if any of them moved in the meantime. Rows of
//! unrelated items and locations never conflict.
//!
//! Intended for tests/dev and as the reference host for the storage ports.

mod table;
mod transaction;

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use wareflow_core::{DomainError, DomainResult, ItemId, LocationId, TenantId};
use wareflow_inventory::{Batch, BatchId, ItemStock, Location};
use wareflow_picking::{PickingOrder, PickingOrderId};
use wareflow_purchasing::{PurchaseOrder, PurchaseOrderId};
use wareflow_sales::{SalesOrder, SalesOrderId};

use table::Table;

pub use transaction::{Committed, Transaction};

#[derive(Debug, Default)]
struct Tables {
    stock: Table<(TenantId, ItemId), ItemStock>,
    batches: Table<(TenantId, BatchId), Batch>,
    locations: Table<(TenantId, LocationId), Location>,
    sales_orders: Table<(TenantId, SalesOrderId), SalesOrder>,
    sales_numbers: Table<(TenantId, String), SalesOrderId>,
    purchase_orders: Table<(TenantId, PurchaseOrderId), PurchaseOrder>,
    purchase_numbers: Table<(TenantId, String), PurchaseOrderId>,
    picking_orders: Table<(TenantId, PickingOrderId), PickingOrder>,
    picking_counters: Table<TenantId, u64>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    /// Store-wide batch creation order; FIFO follows it.
    batch_sequence: AtomicU64,
}

/// Shared handle; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWarehouseStore {
    inner: Arc<Shared>,
}

impl InMemoryWarehouseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a unit of work. Dropping it without `commit()` discards it.
    pub fn begin(&self) -> Transaction {
        Transaction::new(self.clone())
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .tables
            .read()
            .map_err(|_| DomainError::persistence("store lock poisoned"))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .tables
            .write()
            .map_err(|_| DomainError::persistence("store lock poisoned"))
    }

    fn batch_sequence(&self) -> &AtomicU64 {
        &self.inner.batch_sequence
    }
}
