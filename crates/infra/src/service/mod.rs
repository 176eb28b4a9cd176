//! Top-level warehouse operations.
//!
//! Every operation runs as one unit of work:
//!
//! ```text
//! begin transaction
//!   -> master-data checks, bookkeeping components, order status engine
//!   -> queue history notifications
//! commit (optimistic version check; Conflict aborts everything)
//!   -> publish notifications (failures go to the outbox)
//! ```
//!
//! Any error before commit drops the transaction, so no partial mutation is
//! ever visible and nothing is published.

mod purchasing;
mod sales;

pub use purchasing::{NewPurchaseOrder, PurchaseLineInput, Receipt};
pub use sales::{NewSalesOrder, SalesLineInput};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use wareflow_core::{DomainError, DomainResult, ItemId, LocationId, TenantId, UserId, ensure_positive};
use wareflow_events::{EventBus, HistoryEvent, HistoryEventType};
use wareflow_inventory::{
    Batch, BatchAllocator, BatchStore, ItemStore, Location, LocationInventory, StockLedger,
    StockLevels,
};
use wareflow_picking::{PickingOrder, PickingOrderId, PickingOrderStore};
use wareflow_purchasing::{PurchaseOrder, PurchaseOrderId, PurchaseOrderStore};
use wareflow_sales::{SalesOrder, SalesOrderId, SalesOrderStore};

use crate::config::EngineConfig;
use crate::master_data::MasterData;
use crate::outbox::Outbox;
use crate::store::{InMemoryWarehouseStore, Transaction};

/// Who is acting, and for which tenant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub tenant_id: TenantId,
    pub actor: UserId,
}

impl Context {
    pub fn new(tenant_id: TenantId, actor: UserId) -> Self {
        Self { tenant_id, actor }
    }

    fn event(
        &self,
        event_type: HistoryEventType,
        reference_id: impl Into<Uuid>,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> HistoryEvent {
        HistoryEvent::new(event_type, reference_id, description, self.actor, self.tenant_id, at)
    }
}

/// Quantity for one order line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuantity<L> {
    pub line_id: L,
    pub quantity: i64,
}

/// Facade composing the bookkeeping components, the order status engine
/// and picking over one store.
#[derive(Debug)]
pub struct WarehouseService<B, M> {
    store: InMemoryWarehouseStore,
    master: M,
    bus: B,
    outbox: Outbox<HistoryEvent>,
    config: EngineConfig,
}

impl<B, M> WarehouseService<B, M>
where
    B: EventBus<HistoryEvent>,
    M: MasterData,
{
    pub fn new(store: InMemoryWarehouseStore, master: M, bus: B, config: EngineConfig) -> Self {
        let outbox = Outbox::new(config.notifications.outbox_capacity);
        Self {
            store,
            master,
            bus,
            outbox,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &InMemoryWarehouseStore {
        &self.store
    }

    /// Stock arrival outside of a purchase order (e.g. a count correction).
    #[instrument(skip(self, ctx, reason), fields(tenant_id = %ctx.tenant_id))]
    pub fn adjust_stock_in(
        &self,
        ctx: &Context,
        item_id: ItemId,
        location_id: Option<LocationId>,
        quantity: i64,
        reason: &str,
    ) -> DomainResult<StockLevels> {
        let at = Utc::now();
        self.run("adjust_stock_in", |tx| {
            let levels = self.stock_in(tx, ctx.tenant_id, item_id, location_id, quantity, None, at)?;
            tx.record(ctx.event(
                HistoryEventType::StockAdjusted,
                item_id,
                format!("received {quantity} of item {item_id}: {reason}"),
                at,
            ));
            Ok(levels)
        })
    }

    pub fn item_levels(&self, ctx: &Context, item_id: ItemId) -> DomainResult<StockLevels> {
        self.master.item(ctx.tenant_id, item_id)?;
        Ok(self.store.begin().load_stock(ctx.tenant_id, item_id)?.levels)
    }

    /// Batches of an item in FIFO order.
    pub fn batches_for_item(&self, ctx: &Context, item_id: ItemId) -> DomainResult<Vec<Batch>> {
        let mut batches = self.store.begin().batches_for_item(ctx.tenant_id, item_id)?;
        batches.sort_by_key(|b| (b.sequence, b.created_at));
        Ok(batches)
    }

    pub fn location(&self, ctx: &Context, location_id: LocationId) -> DomainResult<Location> {
        self.store.begin().location(ctx.tenant_id, location_id)
    }

    pub fn sales_order(&self, ctx: &Context, order_id: SalesOrderId) -> DomainResult<SalesOrder> {
        self.store.begin().load_sales_order(ctx.tenant_id, order_id)
    }

    pub fn purchase_order(&self, ctx: &Context, order_id: PurchaseOrderId) -> DomainResult<PurchaseOrder> {
        self.store.begin().load_purchase_order(ctx.tenant_id, order_id)
    }

    pub fn picking_order(&self, ctx: &Context, picking_order_id: PickingOrderId) -> DomainResult<PickingOrder> {
        self.store.begin().load_picking_order(ctx.tenant_id, picking_order_id)
    }

    /// Re-publish notifications kept after failed publishes. Returns how many
    /// were delivered; the rest stay queued.
    pub fn flush_outbox(&self) -> usize {
        let mut delivered = 0;
        for event in self.outbox.drain() {
            if self.try_publish(event) {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn pending_notifications(&self) -> usize {
        self.outbox.len()
    }

    /// Run `work` in a fresh transaction, commit it, then publish what it queued.
    fn run<T>(
        &self,
        operation: &'static str,
        work: impl FnOnce(&mut Transaction) -> DomainResult<T>,
    ) -> DomainResult<T> {
        let mut tx = self.store.begin();
        let value = match work(&mut tx) {
            Ok(value) => value,
            Err(err) => {
                warn!(operation, error = %err, "unit of work aborted");
                return Err(err);
            }
        };

        let committed = match tx.commit() {
            Ok(committed) => committed,
            Err(err) => {
                warn!(operation, error = %err, "commit rejected");
                return Err(err);
            }
        };
        info!(
            operation,
            rows_written = committed.rows_written,
            notifications = committed.events.len(),
            "unit of work committed"
        );

        if self.config.notifications.enabled {
            for event in committed.events {
                self.try_publish(event);
            }
        }
        Ok(value)
    }

    fn try_publish(&self, event: HistoryEvent) -> bool {
        match self.bus.publish(event.clone()) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    event_type = %event.event_type,
                    reference_id = %event.reference_id,
                    error = ?err,
                    "notification publish failed, kept in outbox"
                );
                if let Some(dropped) = self.outbox.push(event) {
                    warn!(
                        event_type = %dropped.event_type,
                        reference_id = %dropped.reference_id,
                        "outbox full, oldest notification dropped"
                    );
                }
                false
            }
        }
    }

    /// Ledger receipt plus, for location-tracked items, a new batch and the
    /// shelf counters.
    #[allow(clippy::too_many_arguments)]
    fn stock_in(
        &self,
        tx: &mut Transaction,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: Option<LocationId>,
        quantity: i64,
        reference_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> DomainResult<StockLevels> {
        ensure_positive(quantity, "received quantity")?;
        let item = self.master.item(tenant_id, item_id)?;
        match (item.track_location, location_id) {
            (true, Some(location_id)) => {
                let record = self.master.location(tenant_id, location_id)?;
                self.master.bay(tenant_id, record.bay_id)?;
                tx.ensure_location(tenant_id, location_id, record.bay_id, record.capacity)?;
                tx.receive_at_location(tenant_id, location_id, quantity)?;
                tx.create_batch(tenant_id, item_id, location_id, quantity, reference_id, at)?;
            }
            (true, None) => {
                return Err(DomainError::validation(format!(
                    "item {item_id} is stocked per location; a location is required"
                )));
            }
            (false, Some(_)) => {
                return Err(DomainError::validation(format!(
                    "item {item_id} is not stocked per location; no location allowed"
                )));
            }
            (false, None) => {}
        }
        tx.receive_stock(tenant_id, item_id, quantity)
    }

    fn tracks_location(&self, tenant_id: TenantId, item_id: ItemId) -> DomainResult<bool> {
        Ok(self.master.item(tenant_id, item_id)?.track_location)
    }
}
