use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use wareflow_core::{CustomerId, DomainError, DomainResult, ItemId, LocationId, TaxId, TenantId};
use wareflow_events::{EventBus, HistoryEvent, HistoryEventType};
use wareflow_inventory::StockLedger;
use wareflow_orders::Pricing;
use wareflow_picking::{
    ConfirmLocationPick, CreateBatchPickingOrder, CreatePickingOrder, PickRequest,
    PickingOrchestrator, PickingOrder, PickingOrderId,
};
use wareflow_sales::{
    CreateSalesOrder, NewSalesLine, SalesLineUpdate, SalesOrder, SalesOrderId, SalesOrderLineId,
    SalesOrderStore,
};

use super::{Context, LineQuantity, WarehouseService};
use crate::master_data::MasterData;

/// Line as submitted by a caller; the tax rate is resolved from master data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesLineInput {
    pub item_id: ItemId,
    pub quantity: i64,
    pub rate: Decimal,
    pub tax_id: Option<TaxId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSalesOrder {
    pub number: String,
    pub customer_id: CustomerId,
    pub lines: Vec<SalesLineInput>,
    pub pricing: Pricing,
}

impl<B, M> WarehouseService<B, M>
where
    B: EventBus<HistoryEvent>,
    M: MasterData,
{
    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id, number = %input.number))]
    pub fn create_sales_order(&self, ctx: &Context, input: NewSalesOrder) -> DomainResult<SalesOrder> {
        let at = Utc::now();
        self.master.customer(ctx.tenant_id, input.customer_id)?;
        let lines = input
            .lines
            .into_iter()
            .map(|line| self.resolve_sales_line(ctx.tenant_id, line))
            .collect::<DomainResult<Vec<_>>>()?;

        self.run("create_sales_order", |tx| {
            if tx.find_sales_order_by_number(ctx.tenant_id, &input.number)?.is_some() {
                return Err(DomainError::conflict(format!(
                    "sales order number {} already in use",
                    input.number
                )));
            }
            let order = SalesOrder::create(CreateSalesOrder {
                tenant_id: ctx.tenant_id,
                order_id: SalesOrderId::new(),
                number: input.number.clone(),
                customer_id: input.customer_id,
                lines,
                pricing: input.pricing,
                occurred_at: at,
            })?;
            tx.save_sales_order(order.clone())?;
            tx.record(ctx.event(
                HistoryEventType::SalesOrderCreated,
                order.id_typed().0,
                format!("sales order {} created", order.number()),
                at,
            ));
            Ok(order)
        })
    }

    #[instrument(skip(self, ctx, line), fields(tenant_id = %ctx.tenant_id))]
    pub fn add_sales_line(
        &self,
        ctx: &Context,
        order_id: SalesOrderId,
        line: SalesLineInput,
    ) -> DomainResult<SalesOrderLineId> {
        let line = self.resolve_sales_line(ctx.tenant_id, line)?;
        self.update_sales("add_sales_line", ctx, order_id, |order, at| order.add_line(line, at))
    }

    #[instrument(skip(self, ctx, change), fields(tenant_id = %ctx.tenant_id))]
    pub fn update_sales_line(
        &self,
        ctx: &Context,
        order_id: SalesOrderId,
        line_id: SalesOrderLineId,
        change: SalesLineInput,
    ) -> DomainResult<SalesOrder> {
        let resolved = self.resolve_sales_line(ctx.tenant_id, change)?;
        self.update_sales("update_sales_line", ctx, order_id, |order, at| {
            if order.line(line_id)?.item_id != resolved.item_id {
                return Err(DomainError::validation("a line's item cannot be changed"));
            }
            order.update_line(
                line_id,
                SalesLineUpdate {
                    quantity: resolved.quantity,
                    rate: resolved.rate,
                    tax_id: resolved.tax_id,
                    tax_rate: resolved.tax_rate,
                },
                at,
            )?;
            Ok(order.clone())
        })
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub fn remove_sales_line(
        &self,
        ctx: &Context,
        order_id: SalesOrderId,
        line_id: SalesOrderLineId,
    ) -> DomainResult<SalesOrder> {
        self.update_sales("remove_sales_line", ctx, order_id, |order, at| {
            order.remove_line(line_id, at)?;
            Ok(order.clone())
        })
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub fn update_sales_order_pricing(
        &self,
        ctx: &Context,
        order_id: SalesOrderId,
        pricing: Pricing,
    ) -> DomainResult<SalesOrder> {
        self.update_sales("update_sales_order_pricing", ctx, order_id, |order, at| {
            order.set_pricing(pricing, at)?;
            Ok(order.clone())
        })
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub fn confirm_sales_order(&self, ctx: &Context, order_id: SalesOrderId) -> DomainResult<SalesOrder> {
        let at = Utc::now();
        self.run("confirm_sales_order", |tx| {
            let mut order = tx.load_sales_order(ctx.tenant_id, order_id)?;
            order.confirm(at)?;
            tx.save_sales_order(order.clone())?;
            tx.record(ctx.event(
                HistoryEventType::SalesOrderConfirmed,
                order_id.0,
                format!("sales order {} confirmed", order.number()),
                at,
            ));
            Ok(order)
        })
    }

    /// Pick explicit quantities of one sales order.
    #[instrument(skip(self, ctx, lines), fields(tenant_id = %ctx.tenant_id))]
    pub fn create_picking_order(
        &self,
        ctx: &Context,
        order_id: SalesOrderId,
        lines: Vec<PickRequest>,
    ) -> DomainResult<PickingOrder> {
        let at = Utc::now();
        let tracking = |tenant_id: TenantId, item_id: ItemId| -> DomainResult<bool> {
            self.tracks_location(tenant_id, item_id)
        };
        self.run("create_picking_order", |tx| {
            let picking = tx.create_picking_order(
                &tracking,
                CreatePickingOrder {
                    tenant_id: ctx.tenant_id,
                    picking_order_id: PickingOrderId::new(),
                    number_prefix: self.config.picking.number_prefix.clone(),
                    sales_order_id: order_id,
                    lines,
                    occurred_at: at,
                },
            )?;
            record_picking_created(tx, ctx, &picking, at);
            Ok(picking)
        })
    }

    /// Pick the full remaining demand of several sales orders at once.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub fn create_batch_picking_order(
        &self,
        ctx: &Context,
        order_ids: Vec<SalesOrderId>,
    ) -> DomainResult<PickingOrder> {
        let at = Utc::now();
        let tracking = |tenant_id: TenantId, item_id: ItemId| -> DomainResult<bool> {
            self.tracks_location(tenant_id, item_id)
        };
        self.run("create_batch_picking_order", |tx| {
            let picking = tx.create_batch_picking_order(
                &tracking,
                CreateBatchPickingOrder {
                    tenant_id: ctx.tenant_id,
                    picking_order_id: PickingOrderId::new(),
                    number_prefix: self.config.picking.number_prefix.clone(),
                    sales_order_ids: order_ids,
                    occurred_at: at,
                },
            )?;
            record_picking_created(tx, ctx, &picking, at);
            Ok(picking)
        })
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub fn confirm_pick_from_location(
        &self,
        ctx: &Context,
        picking_order_id: PickingOrderId,
        location_id: LocationId,
        item_id: ItemId,
        quantity: i64,
    ) -> DomainResult<PickingOrder> {
        let at = Utc::now();
        self.run("confirm_pick_from_location", |tx| {
            let picking = tx.confirm_pick_from_location(ConfirmLocationPick {
                tenant_id: ctx.tenant_id,
                picking_order_id,
                location_id,
                item_id,
                quantity,
                occurred_at: at,
            })?;
            tx.record(ctx.event(
                HistoryEventType::PickConfirmed,
                picking_order_id.0,
                format!(
                    "picked {quantity} of item {item_id} at location {location_id} for {}",
                    picking.number
                ),
                at,
            ));
            Ok(picking)
        })
    }

    /// Packing is bounded by what each line has picked.
    #[instrument(skip(self, ctx, lines), fields(tenant_id = %ctx.tenant_id))]
    pub fn pack_sales_order(
        &self,
        ctx: &Context,
        order_id: SalesOrderId,
        lines: Vec<LineQuantity<SalesOrderLineId>>,
    ) -> DomainResult<SalesOrder> {
        let at = Utc::now();
        self.run("pack_sales_order", |tx| {
            let mut order = tx.load_sales_order(ctx.tenant_id, order_id)?;
            for line in &lines {
                order.record_packed(line.line_id, line.quantity, at)?;
            }
            tx.save_sales_order(order.clone())?;
            tx.record(ctx.event(
                HistoryEventType::SalesOrderPacked,
                order_id.0,
                format!("sales order {} packed ({} lines)", order.number(), lines.len()),
                at,
            ));
            Ok(order)
        })
    }

    /// Shipping is bounded by what each line has packed; shipped stock leaves
    /// the item's packing bucket.
    #[instrument(skip(self, ctx, lines), fields(tenant_id = %ctx.tenant_id))]
    pub fn ship_sales_order(
        &self,
        ctx: &Context,
        order_id: SalesOrderId,
        lines: Vec<LineQuantity<SalesOrderLineId>>,
    ) -> DomainResult<SalesOrder> {
        let at = Utc::now();
        self.run("ship_sales_order", |tx| {
            let mut order = tx.load_sales_order(ctx.tenant_id, order_id)?;
            for line in &lines {
                order.record_shipped(line.line_id, line.quantity, at)?;
                let item_id = order.line(line.line_id)?.item_id;
                tx.ship_out(ctx.tenant_id, item_id, line.quantity)?;
            }
            tx.save_sales_order(order.clone())?;
            tx.record(ctx.event(
                HistoryEventType::SalesOrderShipped,
                order_id.0,
                format!("sales order {} shipped ({} lines)", order.number(), lines.len()),
                at,
            ));
            Ok(order)
        })
    }

    #[instrument(skip(self, ctx, lines), fields(tenant_id = %ctx.tenant_id))]
    pub fn invoice_sales_order(
        &self,
        ctx: &Context,
        order_id: SalesOrderId,
        lines: Vec<LineQuantity<SalesOrderLineId>>,
    ) -> DomainResult<SalesOrder> {
        let at = Utc::now();
        self.run("invoice_sales_order", |tx| {
            let mut order = tx.load_sales_order(ctx.tenant_id, order_id)?;
            for line in &lines {
                order.record_invoiced(line.line_id, line.quantity, at)?;
            }
            tx.save_sales_order(order.clone())?;
            tx.record(ctx.event(
                HistoryEventType::SalesOrderInvoiced,
                order_id.0,
                format!("sales order {} invoiced ({} lines)", order.number(), lines.len()),
                at,
            ));
            Ok(order)
        })
    }

    fn resolve_sales_line(&self, tenant_id: TenantId, line: SalesLineInput) -> DomainResult<NewSalesLine> {
        self.master.item(tenant_id, line.item_id)?;
        Ok(NewSalesLine {
            item_id: line.item_id,
            quantity: line.quantity,
            rate: line.rate,
            tax_id: line.tax_id,
            tax_rate: self.master.tax_rate(tenant_id, line.tax_id)?,
        })
    }

    /// Load, change and save one sales order, recording an update notification.
    fn update_sales<T>(
        &self,
        operation: &'static str,
        ctx: &Context,
        order_id: SalesOrderId,
        change: impl FnOnce(&mut SalesOrder, chrono::DateTime<Utc>) -> DomainResult<T>,
    ) -> DomainResult<T> {
        let at = Utc::now();
        self.run(operation, |tx| {
            let mut order = tx.load_sales_order(ctx.tenant_id, order_id)?;
            let value = change(&mut order, at)?;
            tx.record(ctx.event(
                HistoryEventType::SalesOrderUpdated,
                order_id.0,
                format!("sales order {} updated ({operation})", order.number()),
                at,
            ));
            tx.save_sales_order(order)?;
            Ok(value)
        })
    }
}

fn record_picking_created(
    tx: &mut crate::store::Transaction,
    ctx: &Context,
    picking: &PickingOrder,
    at: chrono::DateTime<Utc>,
) {
    tx.record(ctx.event(
        HistoryEventType::PickingOrderCreated,
        picking.id.0,
        format!(
            "picking order {} created for {} sales order(s)",
            picking.number,
            picking.sales_order_ids.len()
        ),
        at,
    ));
}
