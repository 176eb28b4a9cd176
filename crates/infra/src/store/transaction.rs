use std::cell::RefCell;
use std::sync::atomic::Ordering;

use wareflow_core::{DomainResult, ItemId, LocationId, TenantId};
use wareflow_events::HistoryEvent;
use wareflow_inventory::{Batch, BatchId, BatchStore, ItemStock, ItemStore, Location, LocationStore};
use wareflow_picking::{PickingOrder, PickingOrderId, PickingOrderStore};
use wareflow_purchasing::{PurchaseOrder, PurchaseOrderId, PurchaseOrderStore};
use wareflow_sales::{SalesOrder, SalesOrderId, SalesOrderStore};

use super::table::TableTx;
use super::{InMemoryWarehouseStore, Tables};

#[derive(Debug, Default)]
struct Pending {
    stock: TableTx<(TenantId, ItemId), ItemStock>,
    batches: TableTx<(TenantId, BatchId), Batch>,
    locations: TableTx<(TenantId, LocationId), Location>,
    sales_orders: TableTx<(TenantId, SalesOrderId), SalesOrder>,
    sales_numbers: TableTx<(TenantId, String), SalesOrderId>,
    purchase_orders: TableTx<(TenantId, PurchaseOrderId), PurchaseOrder>,
    purchase_numbers: TableTx<(TenantId, String), PurchaseOrderId>,
    picking_orders: TableTx<(TenantId, PickingOrderId), PickingOrder>,
    picking_counters: TableTx<TenantId, u64>,
}

impl Pending {
    fn validate(&self, tables: &Tables) -> DomainResult<()> {
        self.stock.validate(&tables.stock, "item stock")?;
        self.batches.validate(&tables.batches, "batch")?;
        self.locations.validate(&tables.locations, "location")?;
        self.sales_orders.validate(&tables.sales_orders, "sales order")?;
        self.sales_numbers.validate(&tables.sales_numbers, "sales order number")?;
        self.purchase_orders.validate(&tables.purchase_orders, "purchase order")?;
        self.purchase_numbers.validate(&tables.purchase_numbers, "purchase order number")?;
        self.picking_orders.validate(&tables.picking_orders, "picking order")?;
        self.picking_counters.validate(&tables.picking_counters, "picking number counter")?;
        Ok(())
    }

    fn apply(self, tables: &mut Tables) -> usize {
        self.stock.apply(&mut tables.stock)
            + self.batches.apply(&mut tables.batches)
            + self.locations.apply(&mut tables.locations)
            + self.sales_orders.apply(&mut tables.sales_orders)
            + self.sales_numbers.apply(&mut tables.sales_numbers)
            + self.purchase_orders.apply(&mut tables.purchase_orders)
            + self.purchase_numbers.apply(&mut tables.purchase_numbers)
            + self.picking_orders.apply(&mut tables.picking_orders)
            + self.picking_counters.apply(&mut tables.picking_counters)
    }
}

/// Result of a successful commit.
#[derive(Debug)]
pub struct Committed {
    pub rows_written: usize,
    /// Notifications queued by the unit of work, in order.
    pub events: Vec<HistoryEvent>,
}

/// One unit of work over an [`InMemoryWarehouseStore`].
///
/// Implements every storage port, so the bookkeeping components run on it
/// directly. Nothing is visible to other transactions before `commit()`.
#[derive(Debug)]
pub struct Transaction {
    store: InMemoryWarehouseStore,
    pending: RefCell<Pending>,
    events: Vec<HistoryEvent>,
}

impl Transaction {
    pub(super) fn new(store: InMemoryWarehouseStore) -> Self {
        Self {
            store,
            pending: RefCell::new(Pending::default()),
            events: Vec::new(),
        }
    }

    /// Queue a notification to publish once this unit of work commits.
    pub fn record(&mut self, event: HistoryEvent) {
        self.events.push(event);
    }

    /// Validate every row read against the committed versions, then apply
    /// all writes atomically. On `Conflict` nothing is applied.
    pub fn commit(self) -> DomainResult<Committed> {
        let Transaction {
            store,
            pending,
            events,
        } = self;
        let pending = pending.into_inner();

        let mut tables = store.write()?;
        pending.validate(&tables)?;
        let rows_written = pending.apply(&mut tables);

        Ok(Committed {
            rows_written,
            events,
        })
    }

    fn read<T>(&self, f: impl FnOnce(&Tables, &mut Pending) -> T) -> DomainResult<T> {
        let tables = self.store.read()?;
        let mut pending = self.pending.borrow_mut();
        Ok(f(&*tables, &mut *pending))
    }

    fn pending(&mut self) -> &mut Pending {
        self.pending.get_mut()
    }
}

impl ItemStore for Transaction {
    fn load_stock(&self, tenant_id: TenantId, item_id: ItemId) -> DomainResult<ItemStock> {
        let stock = self.read(|tables, pending| pending.stock.get(&tables.stock, &(tenant_id, item_id)))?;
        Ok(stock.unwrap_or_else(|| ItemStock::empty(tenant_id, item_id)))
    }

    fn save_stock(&mut self, stock: ItemStock) -> DomainResult<()> {
        self.pending().stock.put_entity(stock);
        Ok(())
    }
}

impl BatchStore for Transaction {
    fn next_batch_sequence(&self) -> u64 {
        self.store.batch_sequence().fetch_add(1, Ordering::SeqCst) + 1
    }

    fn find_batch(&self, tenant_id: TenantId, batch_id: BatchId) -> DomainResult<Option<Batch>> {
        self.read(|tables, pending| pending.batches.get(&tables.batches, &(tenant_id, batch_id)))
    }

    fn batches_for_item(&self, tenant_id: TenantId, item_id: ItemId) -> DomainResult<Vec<Batch>> {
        self.read(|tables, pending| {
            pending
                .batches
                .scan(&tables.batches, |b| b.tenant_id == tenant_id && b.item_id == item_id)
        })
    }

    fn save_batch(&mut self, batch: Batch) -> DomainResult<()> {
        self.pending().batches.put_entity(batch);
        Ok(())
    }
}

impl LocationStore for Transaction {
    fn find_location(&self, tenant_id: TenantId, location_id: LocationId) -> DomainResult<Option<Location>> {
        self.read(|tables, pending| pending.locations.get(&tables.locations, &(tenant_id, location_id)))
    }

    fn save_location(&mut self, location: Location) -> DomainResult<()> {
        self.pending().locations.put_entity(location);
        Ok(())
    }
}

impl SalesOrderStore for Transaction {
    fn find_sales_order(&self, tenant_id: TenantId, order_id: SalesOrderId) -> DomainResult<Option<SalesOrder>> {
        self.read(|tables, pending| pending.sales_orders.get(&tables.sales_orders, &(tenant_id, order_id)))
    }

    fn find_sales_order_by_number(&self, tenant_id: TenantId, number: &str) -> DomainResult<Option<SalesOrder>> {
        self.read(|tables, pending| {
            pending
                .sales_numbers
                .get(&tables.sales_numbers, &(tenant_id, number.to_string()))
                .and_then(|id| pending.sales_orders.get(&tables.sales_orders, &(tenant_id, id)))
        })
    }

    fn save_sales_order(&mut self, order: SalesOrder) -> DomainResult<()> {
        let tenant_id = order.tenant_id();
        let pending = self.pending();
        pending
            .sales_numbers
            .put((tenant_id, order.number().to_string()), order.id_typed());
        pending.sales_orders.put_entity(order);
        Ok(())
    }
}

impl PurchaseOrderStore for Transaction {
    fn find_purchase_order(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    ) -> DomainResult<Option<PurchaseOrder>> {
        self.read(|tables, pending| {
            pending
                .purchase_orders
                .get(&tables.purchase_orders, &(tenant_id, order_id))
        })
    }

    fn find_purchase_order_by_number(
        &self,
        tenant_id: TenantId,
        number: &str,
    ) -> DomainResult<Option<PurchaseOrder>> {
        self.read(|tables, pending| {
            pending
                .purchase_numbers
                .get(&tables.purchase_numbers, &(tenant_id, number.to_string()))
                .and_then(|id| pending.purchase_orders.get(&tables.purchase_orders, &(tenant_id, id)))
        })
    }

    fn save_purchase_order(&mut self, order: PurchaseOrder) -> DomainResult<()> {
        let tenant_id = order.tenant_id();
        let pending = self.pending();
        pending
            .purchase_numbers
            .put((tenant_id, order.number().to_string()), order.id_typed());
        pending.purchase_orders.put_entity(order);
        Ok(())
    }
}

impl PickingOrderStore for Transaction {
    fn next_picking_number(&mut self, tenant_id: TenantId) -> DomainResult<u64> {
        let current = self.read(|tables, pending| {
            pending.picking_counters.get(&tables.picking_counters, &tenant_id)
        })?;
        let next = current.unwrap_or(0) + 1;
        self.pending().picking_counters.put(tenant_id, next);
        Ok(next)
    }

    fn find_picking_order(
        &self,
        tenant_id: TenantId,
        picking_order_id: PickingOrderId,
    ) -> DomainResult<Option<PickingOrder>> {
        self.read(|tables, pending| {
            pending
                .picking_orders
                .get(&tables.picking_orders, &(tenant_id, picking_order_id))
        })
    }

    fn save_picking_order(&mut self, order: PickingOrder) -> DomainResult<()> {
        self.pending().picking_orders.put_entity(order);
        Ok(())
    }
}
