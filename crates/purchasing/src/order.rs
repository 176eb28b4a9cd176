use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, ItemId, TaxId, TenantId, VendorId, ensure_positive};
use wareflow_orders::{
    FulfillmentLine, FulfillmentStatus, OrderStatus, OrderTotals, PricedLine, Pricing,
    all_complete, compute_totals, dimension_status, ensure_removable, ensure_resizable,
    line_amounts,
};

wareflow_core::aggregate_id!(
    /// Purchase order identifier (tenant-scoped via `tenant_id`).
    PurchaseOrderId
);

wareflow_core::aggregate_id!(PurchaseOrderLineId);

/// Fulfillment dimensions of a purchase order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseDimension {
    Receiving,
    Billing,
}

impl core::fmt::Display for PurchaseDimension {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            PurchaseDimension::Receiving => "received",
            PurchaseDimension::Billing => "billed",
        })
    }
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: PurchaseOrderLineId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub rate: Decimal,
    pub tax_id: Option<TaxId>,
    pub tax_rate: Decimal,
    pub amount: Decimal,
    pub tax_amount: Decimal,
    pub quantity_received: i64,
    pub quantity_billed: i64,
}

impl PurchaseOrderLine {
    pub fn remaining_to_receive(&self) -> i64 {
        self.quantity - self.quantity_received
    }

    fn priced(&self) -> PricedLine {
        PricedLine {
            quantity: self.quantity,
            rate: self.rate,
            tax_rate: self.tax_rate,
        }
    }
}

impl FulfillmentLine for PurchaseOrderLine {
    type Dimension = PurchaseDimension;

    const DIMENSIONS: &'static [PurchaseDimension] =
        &[PurchaseDimension::Receiving, PurchaseDimension::Billing];

    fn ordered(&self) -> i64 {
        self.quantity
    }

    fn fulfilled(&self, dimension: PurchaseDimension) -> i64 {
        match dimension {
            PurchaseDimension::Receiving => self.quantity_received,
            PurchaseDimension::Billing => self.quantity_billed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseLine {
    pub item_id: ItemId,
    pub quantity: i64,
    pub rate: Decimal,
    pub tax_id: Option<TaxId>,
    pub tax_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLineUpdate {
    pub quantity: i64,
    pub rate: Decimal,
    pub tax_id: Option<TaxId>,
    pub tax_rate: Decimal,
}

/// Command: CreatePurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub number: String,
    pub vendor_id: VendorId,
    pub lines: Vec<NewPurchaseLine>,
    pub pricing: Pricing,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    tenant_id: TenantId,
    number: String,
    vendor_id: VendorId,
    status: OrderStatus,
    receive_status: FulfillmentStatus,
    billing_status: FulfillmentStatus,
    lines: Vec<PurchaseOrderLine>,
    pricing: Pricing,
    totals: OrderTotals,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn create(cmd: CreatePurchaseOrder) -> DomainResult<Self> {
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("order number cannot be empty"));
        }
        let mut order = Self {
            id: cmd.order_id,
            tenant_id: cmd.tenant_id,
            number: cmd.number,
            vendor_id: cmd.vendor_id,
            status: OrderStatus::Draft,
            receive_status: FulfillmentStatus::NotStarted,
            billing_status: FulfillmentStatus::NotStarted,
            lines: Vec::new(),
            pricing: cmd.pricing,
            totals: OrderTotals::default(),
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        };
        for line in cmd.lines {
            order.lines.push(Self::build_line(line)?);
        }
        order.recompute()?;
        Ok(order)
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn vendor_id(&self) -> VendorId {
        self.vendor_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn receive_status(&self) -> FulfillmentStatus {
        self.receive_status
    }

    pub fn billing_status(&self) -> FulfillmentStatus {
        self.billing_status
    }

    pub fn lines(&self) -> &[PurchaseOrderLine] {
        &self.lines
    }

    pub fn line(&self, line_id: PurchaseOrderLineId) -> DomainResult<&PurchaseOrderLine> {
        self.lines
            .iter()
            .find(|l| l.id == line_id)
            .ok_or_else(|| DomainError::not_found("purchase order line", line_id))
    }

    pub fn pricing(&self) -> Pricing {
        self.pricing
    }

    pub fn totals(&self) -> OrderTotals {
        self.totals
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn add_line(&mut self, line: NewPurchaseLine, at: DateTime<Utc>) -> DomainResult<PurchaseOrderLineId> {
        let line = Self::build_line(line)?;
        let id = line.id;
        self.mutate(at, |order| {
            order.lines.push(line);
            Ok(())
        })?;
        Ok(id)
    }

    pub fn update_line(
        &mut self,
        line_id: PurchaseOrderLineId,
        update: PurchaseLineUpdate,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.mutate(at, |order| {
            let line = order.line_mut(line_id)?;
            ensure_resizable(&*line, update.quantity)?;
            line.quantity = update.quantity;
            line.rate = update.rate;
            line.tax_id = update.tax_id;
            line.tax_rate = update.tax_rate;
            Ok(())
        })
    }

    pub fn remove_line(&mut self, line_id: PurchaseOrderLineId, at: DateTime<Utc>) -> DomainResult<()> {
        self.mutate(at, |order| {
            ensure_removable(order.line(line_id)?)?;
            order.lines.retain(|l| l.id != line_id);
            Ok(())
        })
    }

    pub fn set_pricing(&mut self, pricing: Pricing, at: DateTime<Utc>) -> DomainResult<()> {
        self.mutate(at, |order| {
            order.pricing = pricing;
            Ok(())
        })
    }

    pub fn confirm(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot confirm order without lines"));
        }
        self.mutate(at, |order| {
            order.status = order.status.confirm()?;
            Ok(())
        })
    }

    pub fn record_received(&mut self, line_id: PurchaseOrderLineId, qty: i64, at: DateTime<Utc>) -> DomainResult<()> {
        self.record(line_id, qty, at, PurchaseDimension::Receiving)
    }

    pub fn record_billed(&mut self, line_id: PurchaseOrderLineId, qty: i64, at: DateTime<Utc>) -> DomainResult<()> {
        self.record(line_id, qty, at, PurchaseDimension::Billing)
    }

    fn record(
        &mut self,
        line_id: PurchaseOrderLineId,
        qty: i64,
        at: DateTime<Utc>,
        dimension: PurchaseDimension,
    ) -> DomainResult<()> {
        ensure_positive(qty, "quantity")?;
        self.status.ensure_fulfillable()?;
        self.mutate(at, |order| {
            let line = order.line_mut(line_id)?;
            let current = line.fulfilled(dimension);
            if qty > line.quantity - current {
                return Err(DomainError::invalid_state(format!(
                    "line {line_id}: {qty} more {dimension} would exceed ordered {} (already {current})",
                    line.quantity
                )));
            }
            match dimension {
                PurchaseDimension::Receiving => line.quantity_received += qty,
                PurchaseDimension::Billing => line.quantity_billed += qty,
            }
            Ok(())
        })
    }

    fn build_line(line: NewPurchaseLine) -> DomainResult<PurchaseOrderLine> {
        ensure_positive(line.quantity, "line quantity")?;
        Ok(PurchaseOrderLine {
            id: PurchaseOrderLineId::new(),
            item_id: line.item_id,
            quantity: line.quantity,
            rate: line.rate,
            tax_id: line.tax_id,
            tax_rate: line.tax_rate,
            amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            quantity_received: 0,
            quantity_billed: 0,
        })
    }

    fn line_mut(&mut self, line_id: PurchaseOrderLineId) -> DomainResult<&mut PurchaseOrderLine> {
        self.lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| DomainError::not_found("purchase order line", line_id))
    }

    fn mutate(
        &mut self,
        at: DateTime<Utc>,
        change: impl FnOnce(&mut Self) -> DomainResult<()>,
    ) -> DomainResult<()> {
        let mut next = self.clone();
        change(&mut next)?;
        next.recompute()?;
        next.updated_at = at;
        *self = next;
        Ok(())
    }

    fn recompute(&mut self) -> DomainResult<()> {
        self.totals = compute_totals(self.lines.iter().map(PurchaseOrderLine::priced), self.pricing)?;
        for line in &mut self.lines {
            let amounts = line_amounts(line.priced())?;
            line.amount = amounts.amount;
            line.tax_amount = amounts.tax_amount;
        }
        self.receive_status = dimension_status(&self.lines, PurchaseDimension::Receiving)?;
        self.billing_status = dimension_status(&self.lines, PurchaseDimension::Billing)?;
        self.status = self.status.reconcile(all_complete(&self.lines)?);
        Ok(())
    }
}

impl wareflow_core::Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Storage port for purchase orders.
pub trait PurchaseOrderStore {
    fn find_purchase_order(
        &self,
        tenant_id: TenantId,
        order_id: PurchaseOrderId,
    ) -> DomainResult<Option<PurchaseOrder>>;

    fn find_purchase_order_by_number(
        &self,
        tenant_id: TenantId,
        number: &str,
    ) -> DomainResult<Option<PurchaseOrder>>;

    fn save_purchase_order(&mut self, order: PurchaseOrder) -> DomainResult<()>;

    fn load_purchase_order(&self, tenant_id: TenantId, order_id: PurchaseOrderId) -> DomainResult<PurchaseOrder> {
        self.find_purchase_order(tenant_id, order_id)?
            .ok_or_else(|| DomainError::not_found("purchase order", order_id))
    }
}
