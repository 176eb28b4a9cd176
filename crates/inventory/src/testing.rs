//! Minimal map-backed store for unit tests of the bookkeeping components.

use std::cell::Cell;
use std::collections::HashMap;

use wareflow_core::{DomainResult, ItemId, LocationId, TenantId};

use crate::batch::{Batch, BatchId, BatchStore};
use crate::item::{ItemStock, ItemStore};
use crate::location::{Location, LocationStore};

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    stock: HashMap<(TenantId, ItemId), ItemStock>,
    batches: HashMap<(TenantId, BatchId), Batch>,
    locations: HashMap<(TenantId, LocationId), Location>,
    sequence: Cell<u64>,
}

impl ItemStore for MemoryStore {
    fn load_stock(&self, tenant_id: TenantId, item_id: ItemId) -> DomainResult<ItemStock> {
        Ok(self
            .stock
            .get(&(tenant_id, item_id))
            .cloned()
            .unwrap_or_else(|| ItemStock::empty(tenant_id, item_id)))
    }

    fn save_stock(&mut self, stock: ItemStock) -> DomainResult<()> {
        self.stock.insert((stock.tenant_id, stock.item_id), stock);
        Ok(())
    }
}

impl BatchStore for MemoryStore {
    fn next_batch_sequence(&self) -> u64 {
        let next = self.sequence.get() + 1;
        self.sequence.set(next);
        next
    }

    fn find_batch(&self, tenant_id: TenantId, batch_id: BatchId) -> DomainResult<Option<Batch>> {
        Ok(self.batches.get(&(tenant_id, batch_id)).cloned())
    }

    fn batches_for_item(&self, tenant_id: TenantId, item_id: ItemId) -> DomainResult<Vec<Batch>> {
        Ok(self
            .batches
            .values()
            .filter(|b| b.tenant_id == tenant_id && b.item_id == item_id)
            .cloned()
            .collect())
    }

    fn save_batch(&mut self, batch: Batch) -> DomainResult<()> {
        self.batches.insert((batch.tenant_id, batch.id), batch);
        Ok(())
    }
}

impl LocationStore for MemoryStore {
    fn find_location(
        &self,
        tenant_id: TenantId,
        location_id: LocationId,
    ) -> DomainResult<Option<Location>> {
        Ok(self.locations.get(&(tenant_id, location_id)).cloned())
    }

    fn save_location(&mut self, location: Location) -> DomainResult<()> {
        self.locations.insert((location.tenant_id, location.id), location);
        Ok(())
    }
}
