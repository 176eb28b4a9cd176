use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use wareflow_core::{DomainError, DomainResult, ItemId, LocationId, TaxId, TenantId, VendorId};
use wareflow_events::{EventBus, HistoryEvent, HistoryEventType};
use wareflow_orders::Pricing;
use wareflow_purchasing::{
    CreatePurchaseOrder, NewPurchaseLine, PurchaseLineUpdate, PurchaseOrder, PurchaseOrderId,
    PurchaseOrderLineId, PurchaseOrderStore,
};

use super::{Context, LineQuantity, WarehouseService};
use crate::master_data::MasterData;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLineInput {
    pub item_id: ItemId,
    pub quantity: i64,
    pub rate: Decimal,
    pub tax_id: Option<TaxId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseOrder {
    pub number: String,
    pub vendor_id: VendorId,
    pub lines: Vec<PurchaseLineInput>,
    pub pricing: Pricing,
}

/// Quantity of a line received, and where it was put away. Items that are
/// not stocked per location take no location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub line_id: PurchaseOrderLineId,
    pub quantity: i64,
    pub location_id: Option<LocationId>,
}

impl<B, M> WarehouseService<B, M>
where
    B: EventBus<HistoryEvent>,
    M: MasterData,
{
    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id, number = %input.number))]
    pub fn create_purchase_order(&self, ctx: &Context, input: NewPurchaseOrder) -> DomainResult<PurchaseOrder> {
        let at = Utc::now();
        self.master.vendor(ctx.tenant_id, input.vendor_id)?;
        let lines = input
            .lines
            .into_iter()
            .map(|line| self.resolve_purchase_line(ctx.tenant_id, line))
            .collect::<DomainResult<Vec<_>>>()?;

        self.run("create_purchase_order", |tx| {
            if tx.find_purchase_order_by_number(ctx.tenant_id, &input.number)?.is_some() {
                return Err(DomainError::conflict(format!(
                    "purchase order number {} already in use",
                    input.number
                )));
            }
            let order = PurchaseOrder::create(CreatePurchaseOrder {
                tenant_id: ctx.tenant_id,
                order_id: PurchaseOrderId::new(),
                number: input.number.clone(),
                vendor_id: input.vendor_id,
                lines,
                pricing: input.pricing,
                occurred_at: at,
            })?;
            tx.save_purchase_order(order.clone())?;
            tx.record(ctx.event(
                HistoryEventType::PurchaseOrderCreated,
                order.id_typed().0,
                format!("purchase order {} created", order.number()),
                at,
            ));
            Ok(order)
        })
    }

    #[instrument(skip(self, ctx, line), fields(tenant_id = %ctx.tenant_id))]
    pub fn add_purchase_line(
        &self,
        ctx: &Context,
        order_id: PurchaseOrderId,
        line: PurchaseLineInput,
    ) -> DomainResult<PurchaseOrderLineId> {
        let line = self.resolve_purchase_line(ctx.tenant_id, line)?;
        self.update_purchase("add_purchase_line", ctx, order_id, |order, at| order.add_line(line, at))
    }

    #[instrument(skip(self, ctx, change), fields(tenant_id = %ctx.tenant_id))]
    pub fn update_purchase_line(
        &self,
        ctx: &Context,
        order_id: PurchaseOrderId,
        line_id: PurchaseOrderLineId,
        change: PurchaseLineInput,
    ) -> DomainResult<PurchaseOrder> {
        let resolved = self.resolve_purchase_line(ctx.tenant_id, change)?;
        self.update_purchase("update_purchase_line", ctx, order_id, |order, at| {
            if order.line(line_id)?.item_id != resolved.item_id {
                return Err(DomainError::validation("a line's item cannot be changed"));
            }
            order.update_line(
                line_id,
                PurchaseLineUpdate {
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
    pub fn remove_purchase_line(
        &self,
        ctx: &Context,
        order_id: PurchaseOrderId,
        line_id: PurchaseOrderLineId,
    ) -> DomainResult<PurchaseOrder> {
        self.update_purchase("remove_purchase_line", ctx, order_id, |order, at| {
            order.remove_line(line_id, at)?;
            Ok(order.clone())
        })
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub fn update_purchase_order_pricing(
        &self,
        ctx: &Context,
        order_id: PurchaseOrderId,
        pricing: Pricing,
    ) -> DomainResult<PurchaseOrder> {
        self.update_purchase("update_purchase_order_pricing", ctx, order_id, |order, at| {
            order.set_pricing(pricing, at)?;
            Ok(order.clone())
        })
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub fn confirm_purchase_order(&self, ctx: &Context, order_id: PurchaseOrderId) -> DomainResult<PurchaseOrder> {
        let at = Utc::now();
        self.run("confirm_purchase_order", |tx| {
            let mut order = tx.load_purchase_order(ctx.tenant_id, order_id)?;
            order.confirm(at)?;
            tx.save_purchase_order(order.clone())?;
            tx.record(ctx.event(
                HistoryEventType::PurchaseOrderConfirmed,
                order_id.0,
                format!("purchase order {} confirmed", order.number()),
                at,
            ));
            Ok(order)
        })
    }

    /// Receive goods against purchase order lines: ledger receipt, and for
    /// location-tracked items a new batch on the named shelf.
    #[instrument(skip(self, ctx, receipts), fields(tenant_id = %ctx.tenant_id))]
    pub fn receive_purchase_order(
        &self,
        ctx: &Context,
        order_id: PurchaseOrderId,
        receipts: Vec<Receipt>,
    ) -> DomainResult<PurchaseOrder> {
        let at = Utc::now();
        self.run("receive_purchase_order", |tx| {
            let mut order = tx.load_purchase_order(ctx.tenant_id, order_id)?;
            for receipt in &receipts {
                order.record_received(receipt.line_id, receipt.quantity, at)?;
                let item_id = order.line(receipt.line_id)?.item_id;
                self.stock_in(
                    tx,
                    ctx.tenant_id,
                    item_id,
                    receipt.location_id,
                    receipt.quantity,
                    Some(Uuid::from(receipt.line_id.0)),
                    at,
                )?;
            }
            tx.save_purchase_order(order.clone())?;
            tx.record(ctx.event(
                HistoryEventType::PurchaseOrderReceived,
                order_id.0,
                format!("purchase order {} received ({} lines)", order.number(), receipts.len()),
                at,
            ));
            Ok(order)
        })
    }

    #[instrument(skip(self, ctx, lines), fields(tenant_id = %ctx.tenant_id))]
    pub fn bill_purchase_order(
        &self,
        ctx: &Context,
        order_id: PurchaseOrderId,
        lines: Vec<LineQuantity<PurchaseOrderLineId>>,
    ) -> DomainResult<PurchaseOrder> {
        let at = Utc::now();
        self.run("bill_purchase_order", |tx| {
            let mut order = tx.load_purchase_order(ctx.tenant_id, order_id)?;
            for line in &lines {
                order.record_billed(line.line_id, line.quantity, at)?;
            }
            tx.save_purchase_order(order.clone())?;
            tx.record(ctx.event(
                HistoryEventType::PurchaseOrderBilled,
                order_id.0,
                format!("purchase order {} billed ({} lines)", order.number(), lines.len()),
                at,
            ));
            Ok(order)
        })
    }

    fn resolve_purchase_line(&self, tenant_id: TenantId, line: PurchaseLineInput) -> DomainResult<NewPurchaseLine> {
        self.master.item(tenant_id, line.item_id)?;
        Ok(NewPurchaseLine {
            item_id: line.item_id,
            quantity: line.quantity,
            rate: line.rate,
            tax_id: line.tax_id,
            tax_rate: self.master.tax_rate(tenant_id, line.tax_id)?,
        })
    }

    fn update_purchase<T>(
        &self,
        operation: &'static str,
        ctx: &Context,
        order_id: PurchaseOrderId,
        change: impl FnOnce(&mut PurchaseOrder, DateTime<Utc>) -> DomainResult<T>,
    ) -> DomainResult<T> {
        let at = Utc::now();
        self.run(operation, |tx| {
            let mut order = tx.load_purchase_order(ctx.tenant_id, order_id)?;
            let value = change(&mut order, at)?;
            tx.record(ctx.event(
                HistoryEventType::PurchaseOrderUpdated,
                order_id.0,
                format!("purchase order {} updated ({operation})", order.number()),
                at,
            ));
            tx.save_purchase_order(order)?;
            Ok(value)
        })
    }
}
