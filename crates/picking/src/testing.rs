//! Map-backed unit of work for orchestrator tests.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;

use wareflow_core::{BayId, CustomerId, DomainResult, ItemId, LocationId, TenantId};
use wareflow_inventory::{
    Batch, BatchAllocator, BatchId, BatchStore, ItemStock, ItemStore, Location, LocationInventory,
    LocationStore, StockLedger,
};
use wareflow_orders::Pricing;
use wareflow_sales::{CreateSalesOrder, NewSalesLine, SalesOrder, SalesOrderId, SalesOrderStore};

use crate::order::{PickingOrder, PickingOrderId, PickingOrderStore};

#[derive(Debug)]
pub(crate) struct MemoryUnit {
    pub tenant_id: TenantId,
    stock: HashMap<ItemId, ItemStock>,
    batches: HashMap<BatchId, Batch>,
    locations: HashMap<LocationId, Location>,
    sales_orders: HashMap<SalesOrderId, SalesOrder>,
    picking_orders: HashMap<PickingOrderId, PickingOrder>,
    batch_sequence: std::cell::Cell<u64>,
    picking_sequence: u64,
}

impl Default for MemoryUnit {
    fn default() -> Self {
        Self {
            tenant_id: TenantId::new(),
            stock: HashMap::new(),
            batches: HashMap::new(),
            locations: HashMap::new(),
            sales_orders: HashMap::new(),
            picking_orders: HashMap::new(),
            batch_sequence: std::cell::Cell::new(0),
            picking_sequence: 0,
        }
    }
}

impl ItemStore for MemoryUnit {
    fn load_stock(&self, tenant_id: TenantId, item_id: ItemId) -> DomainResult<ItemStock> {
        Ok(self
            .stock
            .get(&item_id)
            .cloned()
            .unwrap_or_else(|| ItemStock::empty(tenant_id, item_id)))
    }

    fn save_stock(&mut self, stock: ItemStock) -> DomainResult<()> {
        self.stock.insert(stock.item_id, stock);
        Ok(())
    }
}

impl BatchStore for MemoryUnit {
    fn next_batch_sequence(&self) -> u64 {
        let next = self.batch_sequence.get() + 1;
        self.batch_sequence.set(next);
        next
    }

    fn find_batch(&self, _tenant_id: TenantId, batch_id: BatchId) -> DomainResult<Option<Batch>> {
        Ok(self.batches.get(&batch_id).cloned())
    }

    fn batches_for_item(&self, _tenant_id: TenantId, item_id: ItemId) -> DomainResult<Vec<Batch>> {
        Ok(self.batches.values().filter(|b| b.item_id == item_id).cloned().collect())
    }

    fn save_batch(&mut self, batch: Batch) -> DomainResult<()> {
        self.batches.insert(batch.id, batch);
        Ok(())
    }
}

impl LocationStore for MemoryUnit {
    fn find_location(&self, _tenant_id: TenantId, location_id: LocationId) -> DomainResult<Option<Location>> {
        Ok(self.locations.get(&location_id).cloned())
    }

    fn save_location(&mut self, location: Location) -> DomainResult<()> {
        self.locations.insert(location.id, location);
        Ok(())
    }
}

impl SalesOrderStore for MemoryUnit {
    fn find_sales_order(&self, _tenant_id: TenantId, order_id: SalesOrderId) -> DomainResult<Option<SalesOrder>> {
        Ok(self.sales_orders.get(&order_id).cloned())
    }

    fn find_sales_order_by_number(&self, _tenant_id: TenantId, number: &str) -> DomainResult<Option<SalesOrder>> {
        Ok(self.sales_orders.values().find(|o| o.number() == number).cloned())
    }

    fn save_sales_order(&mut self, order: SalesOrder) -> DomainResult<()> {
        self.sales_orders.insert(order.id_typed(), order);
        Ok(())
    }
}

impl PickingOrderStore for MemoryUnit {
    fn next_picking_number(&mut self, _tenant_id: TenantId) -> DomainResult<u64> {
        self.picking_sequence += 1;
        Ok(self.picking_sequence)
    }

    fn find_picking_order(
        &self,
        _tenant_id: TenantId,
        picking_order_id: PickingOrderId,
    ) -> DomainResult<Option<PickingOrder>> {
        Ok(self.picking_orders.get(&picking_order_id).cloned())
    }

    fn save_picking_order(&mut self, order: PickingOrder) -> DomainResult<()> {
        self.picking_orders.insert(order.id, order);
        Ok(())
    }
}

pub(crate) fn tracked(_tenant_id: TenantId, _item_id: ItemId) -> DomainResult<bool> {
    Ok(true)
}

pub(crate) fn untracked(_tenant_id: TenantId, _item_id: ItemId) -> DomainResult<bool> {
    Ok(false)
}

/// Receive `qty` of the item on a fresh shelf, as one new batch.
pub(crate) fn seed_shelf(unit: &mut MemoryUnit, item_id: ItemId, qty: i64) -> LocationId {
    let tenant_id = unit.tenant_id;
    let location_id = LocationId::new();
    unit.ensure_location(tenant_id, location_id, BayId::new(), 100).unwrap();
    unit.receive_stock(tenant_id, item_id, qty).unwrap();
    unit.create_batch(tenant_id, item_id, location_id, qty, None, Utc::now()).unwrap();
    unit.receive_at_location(tenant_id, location_id, qty).unwrap();
    location_id
}

pub(crate) fn draft_order(unit: &mut MemoryUnit, lines: &[(ItemId, i64)]) -> SalesOrder {
    let order = SalesOrder::create(CreateSalesOrder {
        tenant_id: unit.tenant_id,
        order_id: SalesOrderId::new(),
        number: format!("SO-{}", unit.sales_orders.len() + 1),
        customer_id: CustomerId::new(),
        lines: lines
            .iter()
            .map(|(item_id, quantity)| NewSalesLine {
                item_id: *item_id,
                quantity: *quantity,
                rate: Decimal::ONE,
                tax_id: None,
                tax_rate: Decimal::ZERO,
            })
            .collect(),
        pricing: Pricing::default(),
        occurred_at: Utc::now(),
    })
    .unwrap();
    unit.save_sales_order(order.clone()).unwrap();
    order
}

pub(crate) fn confirmed_order(unit: &mut MemoryUnit, lines: &[(ItemId, i64)]) -> SalesOrder {
    let mut order = draft_order(unit, lines);
    order.confirm(Utc::now()).unwrap();
    unit.save_sales_order(order.clone()).unwrap();
    order
}
