use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, ItemId, LocationId, TenantId, ensure_positive};
use wareflow_inventory::{BatchAllocator, BatchStore, ItemStore, LocationInventory, LocationStore, StockLedger};
use wareflow_sales::{SalesOrder, SalesOrderId, SalesOrderLineId, SalesOrderStore};

use crate::order::{
    PickingOrder, PickingOrderId, PickingOrderItem, PickingOrderLog, PickingOrderStore,
    PickingStatus, aggregate_details,
};

/// Whether an item is stocked per location (and therefore per batch).
pub trait ItemTracking {
    fn tracks_location(&self, tenant_id: TenantId, item_id: ItemId) -> DomainResult<bool>;
}

impl<F> ItemTracking for F
where
    F: Fn(TenantId, ItemId) -> DomainResult<bool>,
{
    fn tracks_location(&self, tenant_id: TenantId, item_id: ItemId) -> DomainResult<bool> {
        self(tenant_id, item_id)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRequest {
    pub sales_order_line_id: SalesOrderLineId,
    pub quantity: i64,
}

/// Command: pick explicit quantities of one sales order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePickingOrder {
    pub tenant_id: TenantId,
    pub picking_order_id: PickingOrderId,
    pub number_prefix: String,
    pub sales_order_id: SalesOrderId,
    pub lines: Vec<PickRequest>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: pick the full remaining demand of several sales orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBatchPickingOrder {
    pub tenant_id: TenantId,
    pub picking_order_id: PickingOrderId,
    pub number_prefix: String,
    pub sales_order_ids: Vec<SalesOrderId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: operator confirms stock taken from a shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmLocationPick {
    pub tenant_id: TenantId,
    pub picking_order_id: PickingOrderId,
    pub location_id: LocationId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Picking over any unit of work that hosts every store it touches.
///
/// Operations write through the unit of work as they go. On error the
/// caller must discard the unit of work; nothing here undoes earlier steps.
pub trait PickingOrchestrator:
    ItemStore + BatchStore + LocationStore + SalesOrderStore + PickingOrderStore
{
    /// Single-order form.
    fn create_picking_order(
        &mut self,
        tracking: &impl ItemTracking,
        cmd: CreatePickingOrder,
    ) -> DomainResult<PickingOrder> {
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("picking order needs at least one line"));
        }
        let order = self.load_sales_order(cmd.tenant_id, cmd.sales_order_id)?;
        self.allocate_picks(
            tracking,
            cmd.tenant_id,
            cmd.picking_order_id,
            &cmd.number_prefix,
            vec![(order, cmd.lines)],
            cmd.occurred_at,
        )
    }

    /// Batch form: every line of every order is requested at its full
    /// remaining quantity. Lines with nothing left are skipped.
    fn create_batch_picking_order(
        &mut self,
        tracking: &impl ItemTracking,
        cmd: CreateBatchPickingOrder,
    ) -> DomainResult<PickingOrder> {
        if cmd.sales_order_ids.is_empty() {
            return Err(DomainError::validation("batch picking needs at least one sales order"));
        }
        let mut demand = Vec::with_capacity(cmd.sales_order_ids.len());
        for (idx, order_id) in cmd.sales_order_ids.iter().enumerate() {
            if cmd.sales_order_ids[..idx].contains(order_id) {
                return Err(DomainError::validation(format!(
                    "sales order {order_id} listed twice"
                )));
            }
            let order = self.load_sales_order(cmd.tenant_id, *order_id)?;
            let requests: Vec<PickRequest> = order
                .lines()
                .iter()
                .filter(|l| l.remaining_to_pick() > 0)
                .map(|l| PickRequest {
                    sales_order_line_id: l.id,
                    quantity: l.remaining_to_pick(),
                })
                .collect();
            if !requests.is_empty() {
                demand.push((order, requests));
            }
        }
        self.allocate_picks(
            tracking,
            cmd.tenant_id,
            cmd.picking_order_id,
            &cmd.number_prefix,
            demand,
            cmd.occurred_at,
        )
    }

    /// Confirm `quantity` of an item physically taken from a location.
    ///
    /// Bounded by the detail's open quantity, the item's picking bucket and
    /// the location's reserved stock, in that order. The confirmed units
    /// become packable on the sales-order lines they were reserved for.
    fn confirm_pick_from_location(&mut self, cmd: ConfirmLocationPick) -> DomainResult<PickingOrder> {
        ensure_positive(cmd.quantity, "confirmed quantity")?;
        let mut order = self.load_picking_order(cmd.tenant_id, cmd.picking_order_id)?;
        let shares = order.confirm_detail(cmd.location_id, cmd.item_id, cmd.quantity, cmd.occurred_at)?;
        self.advance_to_packing(cmd.tenant_id, cmd.item_id, cmd.quantity)?;
        self.confirm_picked(cmd.tenant_id, cmd.location_id, cmd.quantity)?;
        for share in shares {
            let mut sales_order = self.load_sales_order(cmd.tenant_id, share.sales_order_id)?;
            sales_order.record_pick_confirmed(share.sales_order_line_id, share.quantity, cmd.occurred_at)?;
            self.save_sales_order(sales_order)?;
        }
        self.save_picking_order(order.clone())?;
        Ok(order)
    }

    #[doc(hidden)]
    fn allocate_picks(
        &mut self,
        tracking: &impl ItemTracking,
        tenant_id: TenantId,
        picking_order_id: PickingOrderId,
        number_prefix: &str,
        demand: Vec<(SalesOrder, Vec<PickRequest>)>,
        at: DateTime<Utc>,
    ) -> DomainResult<PickingOrder> {
        let mut items = Vec::new();
        let mut logs = Vec::new();
        let mut sales_order_ids = Vec::with_capacity(demand.len());

        for (mut order, requests) in demand {
            let order_id = order.id_typed();
            order.status().ensure_fulfillable()?;
            for request in &requests {
                ensure_positive(request.quantity, "pick quantity")?;
                let line = order.line(request.sales_order_line_id)?;
                if line.remaining_to_pick() < request.quantity {
                    return Err(DomainError::invalid_state(format!(
                        "line {}: cannot pick {} with only {} left to pick",
                        line.id,
                        request.quantity,
                        line.remaining_to_pick()
                    )));
                }
            }

            for request in requests {
                let line_id = request.sales_order_line_id;
                let qty = request.quantity;
                let item_id = order.line(line_id)?.item_id;
                let tracked = tracking.tracks_location(tenant_id, item_id)?;

                if tracked {
                    for consumption in self.allocate_fifo(tenant_id, item_id, qty)? {
                        self.reserve_can_pick(tenant_id, consumption.location_id, consumption.quantity)?;
                        logs.push(PickingOrderLog {
                            sales_order_id: order_id,
                            sales_order_line_id: line_id,
                            item_id,
                            location_id: consumption.location_id,
                            batch_id: consumption.batch_id,
                            quantity: consumption.quantity,
                        });
                    }
                }

                self.reserve_for_picking(tenant_id, item_id, qty)?;
                order.record_picked(line_id, qty, at)?;
                if !tracked {
                    // No shelf to confirm against.
                    self.advance_to_packing(tenant_id, item_id, qty)?;
                    order.record_pick_confirmed(line_id, qty, at)?;
                }
                items.push(PickingOrderItem {
                    sales_order_id: order_id,
                    sales_order_line_id: line_id,
                    item_id,
                    quantity: qty,
                    location_tracked: tracked,
                });
            }

            self.save_sales_order(order)?;
            sales_order_ids.push(order_id);
        }

        if items.is_empty() {
            return Err(DomainError::validation("nothing left to pick"));
        }

        let details = aggregate_details(&logs);
        let sequence = self.next_picking_number(tenant_id)?;
        let picking_order = PickingOrder {
            id: picking_order_id,
            tenant_id,
            number: format!("{number_prefix}-{sequence:06}"),
            sales_order_ids,
            status: PickingStatus::derive(&details),
            items,
            logs,
            details,
            created_at: at,
            updated_at: at,
        };
        self.save_picking_order(picking_order.clone())?;
        Ok(picking_order)
    }
}

impl<T> PickingOrchestrator for T where
    T: ItemStore + BatchStore + LocationStore + SalesOrderStore + PickingOrderStore + ?Sized
{
}
