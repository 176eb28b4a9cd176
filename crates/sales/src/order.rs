use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wareflow_core::{CustomerId, DomainError, DomainResult, ItemId, TaxId, TenantId, ensure_positive};
use wareflow_orders::{
    FulfillmentLine, FulfillmentStatus, OrderStatus, OrderTotals, PricedLine, Pricing,
    all_complete, compute_totals, dimension_status, ensure_removable, ensure_resizable,
    line_amounts,
};

wareflow_core::aggregate_id!(
    /// Sales order identifier (tenant-scoped via `tenant_id`).
    SalesOrderId
);

wareflow_core::aggregate_id!(SalesOrderLineId);

/// Fulfillment dimensions of a sales order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesDimension {
    Picking,
    Packing,
    Shipping,
    Invoicing,
}

impl core::fmt::Display for SalesDimension {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            SalesDimension::Picking => "picked",
            SalesDimension::Packing => "packed",
            SalesDimension::Shipping => "shipped",
            SalesDimension::Invoicing => "invoiced",
        })
    }
}

/// Order line: item, ordered quantity, pricing and fulfillment counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderLine {
    pub id: SalesOrderLineId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub rate: Decimal,
    pub tax_id: Option<TaxId>,
    pub tax_rate: Decimal,
    pub amount: Decimal,
    pub tax_amount: Decimal,
    pub quantity_picked: i64,
    /// Part of `quantity_picked` confirmed at the shelf (or untracked).
    #[serde(default)]
    pub quantity_pick_confirmed: i64,
    pub quantity_packed: i64,
    pub quantity_shipped: i64,
    pub quantity_invoiced: i64,
}

impl SalesOrderLine {
    /// Demand not yet covered by a picking order.
    pub fn remaining_to_pick(&self) -> i64 {
        self.quantity - self.quantity_picked
    }

    fn priced(&self) -> PricedLine {
        PricedLine {
            quantity: self.quantity,
            rate: self.rate,
            tax_rate: self.tax_rate,
        }
    }
}

impl FulfillmentLine for SalesOrderLine {
    type Dimension = SalesDimension;

    const DIMENSIONS: &'static [SalesDimension] = &[
        SalesDimension::Picking,
        SalesDimension::Packing,
        SalesDimension::Shipping,
        SalesDimension::Invoicing,
    ];

    fn ordered(&self) -> i64 {
        self.quantity
    }

    fn fulfilled(&self, dimension: SalesDimension) -> i64 {
        match dimension {
            SalesDimension::Picking => self.quantity_picked,
            SalesDimension::Packing => self.quantity_packed,
            SalesDimension::Shipping => self.quantity_shipped,
            SalesDimension::Invoicing => self.quantity_invoiced,
        }
    }
}

/// New line request. `tax_rate` is the resolved rate of `tax_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSalesLine {
    pub item_id: ItemId,
    pub quantity: i64,
    pub rate: Decimal,
    pub tax_id: Option<TaxId>,
    pub tax_rate: Decimal,
}

/// Replacement values for an existing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesLineUpdate {
    pub quantity: i64,
    pub rate: Decimal,
    pub tax_id: Option<TaxId>,
    pub tax_rate: Decimal,
}

/// Command: CreateSalesOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSalesOrder {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub number: String,
    pub customer_id: CustomerId,
    pub lines: Vec<NewSalesLine>,
    pub pricing: Pricing,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: SalesOrder.
///
/// Every mutation runs on a copy and is only kept when the recomputed header
/// (totals, dimension statuses, lifecycle) is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    id: SalesOrderId,
    tenant_id: TenantId,
    number: String,
    customer_id: CustomerId,
    status: OrderStatus,
    picking_status: FulfillmentStatus,
    packing_status: FulfillmentStatus,
    shipping_status: FulfillmentStatus,
    invoice_status: FulfillmentStatus,
    lines: Vec<SalesOrderLine>,
    pricing: Pricing,
    totals: OrderTotals,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SalesOrder {
    pub fn create(cmd: CreateSalesOrder) -> DomainResult<Self> {
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("order number cannot be empty"));
        }
        let mut order = Self {
            id: cmd.order_id,
            tenant_id: cmd.tenant_id,
            number: cmd.number,
            customer_id: cmd.customer_id,
            status: OrderStatus::Draft,
            picking_status: FulfillmentStatus::NotStarted,
            packing_status: FulfillmentStatus::NotStarted,
            shipping_status: FulfillmentStatus::NotStarted,
            invoice_status: FulfillmentStatus::NotStarted,
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

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn dimension_status(&self, dimension: SalesDimension) -> FulfillmentStatus {
        match dimension {
            SalesDimension::Picking => self.picking_status,
            SalesDimension::Packing => self.packing_status,
            SalesDimension::Shipping => self.shipping_status,
            SalesDimension::Invoicing => self.invoice_status,
        }
    }

    pub fn lines(&self) -> &[SalesOrderLine] {
        &self.lines
    }

    pub fn line(&self, line_id: SalesOrderLineId) -> DomainResult<&SalesOrderLine> {
        self.lines
            .iter()
            .find(|l| l.id == line_id)
            .ok_or_else(|| DomainError::not_found("sales order line", line_id))
    }

    pub fn pricing(&self) -> Pricing {
        self.pricing
    }

    pub fn totals(&self) -> OrderTotals {
        self.totals
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn add_line(&mut self, line: NewSalesLine, at: DateTime<Utc>) -> DomainResult<SalesOrderLineId> {
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
        line_id: SalesOrderLineId,
        update: SalesLineUpdate,
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

    pub fn remove_line(&mut self, line_id: SalesOrderLineId, at: DateTime<Utc>) -> DomainResult<()> {
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

    /// Demand covered by a new picking order.
    pub fn record_picked(&mut self, line_id: SalesOrderLineId, qty: i64, at: DateTime<Utc>) -> DomainResult<()> {
        self.record(line_id, qty, at, "picked", |l| l.quantity, |l| &mut l.quantity_picked)
    }

    /// Picked units physically taken; bounded by what was picked.
    pub fn record_pick_confirmed(
        &mut self,
        line_id: SalesOrderLineId,
        qty: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.record(line_id, qty, at, "pick-confirmed", |l| l.quantity_picked, |l| {
            &mut l.quantity_pick_confirmed
        })
    }

    /// Packing is bounded by confirmed picks.
    pub fn record_packed(&mut self, line_id: SalesOrderLineId, qty: i64, at: DateTime<Utc>) -> DomainResult<()> {
        self.record(line_id, qty, at, "packed", |l| l.quantity_pick_confirmed, |l| &mut l.quantity_packed)
    }

    /// Shipping is bounded by what was packed.
    pub fn record_shipped(&mut self, line_id: SalesOrderLineId, qty: i64, at: DateTime<Utc>) -> DomainResult<()> {
        self.record(line_id, qty, at, "shipped", |l| l.quantity_packed, |l| &mut l.quantity_shipped)
    }

    pub fn record_invoiced(&mut self, line_id: SalesOrderLineId, qty: i64, at: DateTime<Utc>) -> DomainResult<()> {
        self.record(line_id, qty, at, "invoiced", |l| l.quantity, |l| &mut l.quantity_invoiced)
    }

    fn record(
        &mut self,
        line_id: SalesOrderLineId,
        qty: i64,
        at: DateTime<Utc>,
        counter_name: &str,
        ceiling: impl Fn(&SalesOrderLine) -> i64,
        counter: impl Fn(&mut SalesOrderLine) -> &mut i64,
    ) -> DomainResult<()> {
        ensure_positive(qty, "quantity")?;
        self.status.ensure_fulfillable()?;
        self.mutate(at, |order| {
            let line = order.line_mut(line_id)?;
            let limit = ceiling(&*line);
            let current = *counter(line);
            // `current + qty` can overflow for caller-supplied quantities.
            if qty > limit - current {
                return Err(DomainError::invalid_state(format!(
                    "line {line_id}: {qty} more {counter_name} would exceed {limit} (already {current})"
                )));
            }
            *counter(line) += qty;
            Ok(())
        })
    }

    fn build_line(line: NewSalesLine) -> DomainResult<SalesOrderLine> {
        ensure_positive(line.quantity, "line quantity")?;
        Ok(SalesOrderLine {
            id: SalesOrderLineId::new(),
            item_id: line.item_id,
            quantity: line.quantity,
            rate: line.rate,
            tax_id: line.tax_id,
            tax_rate: line.tax_rate,
            amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            quantity_picked: 0,
            quantity_pick_confirmed: 0,
            quantity_packed: 0,
            quantity_shipped: 0,
            quantity_invoiced: 0,
        })
    }

    fn line_mut(&mut self, line_id: SalesOrderLineId) -> DomainResult<&mut SalesOrderLine> {
        self.lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| DomainError::not_found("sales order line", line_id))
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

    /// Re-derive the header from the lines.
    fn recompute(&mut self) -> DomainResult<()> {
        self.totals = compute_totals(self.lines.iter().map(SalesOrderLine::priced), self.pricing)?;
        for line in &mut self.lines {
            let amounts = line_amounts(line.priced())?;
            line.amount = amounts.amount;
            line.tax_amount = amounts.tax_amount;
        }
        self.picking_status = dimension_status(&self.lines, SalesDimension::Picking)?;
        self.packing_status = dimension_status(&self.lines, SalesDimension::Packing)?;
        self.shipping_status = dimension_status(&self.lines, SalesDimension::Shipping)?;
        self.invoice_status = dimension_status(&self.lines, SalesDimension::Invoicing)?;
        self.status = self.status.reconcile(all_complete(&self.lines)?);
        Ok(())
    }
}

impl wareflow_core::Entity for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Storage port for sales orders.
pub trait SalesOrderStore {
    fn find_sales_order(&self, tenant_id: TenantId, order_id: SalesOrderId) -> DomainResult<Option<SalesOrder>>;

    fn find_sales_order_by_number(&self, tenant_id: TenantId, number: &str) -> DomainResult<Option<SalesOrder>>;

    fn save_sales_order(&mut self, order: SalesOrder) -> DomainResult<()>;

    fn load_sales_order(&self, tenant_id: TenantId, order_id: SalesOrderId) -> DomainResult<SalesOrder> {
        self.find_sales_order(tenant_id, order_id)?
            .ok_or_else(|| DomainError::not_found("sales order", order_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use wareflow_orders::Discount;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn new_line(quantity: i64) -> NewSalesLine {
        NewSalesLine {
            item_id: ItemId::new(),
            quantity,
            rate: dec!(10),
            tax_id: None,
            tax_rate: dec!(10),
        }
    }

    fn order_with(lines: Vec<NewSalesLine>, pricing: Pricing) -> DomainResult<SalesOrder> {
        SalesOrder::create(CreateSalesOrder {
            tenant_id: TenantId::new(),
            order_id: SalesOrderId::new(),
            number: "SO-1".to_string(),
            customer_id: CustomerId::new(),
            lines,
            pricing,
            occurred_at: now(),
        })
    }

    fn confirmed(quantity: i64) -> (SalesOrder, SalesOrderLineId) {
        let mut order = order_with(vec![new_line(quantity)], Pricing::default()).unwrap();
        order.confirm(now()).unwrap();
        let line_id = order.lines()[0].id;
        (order, line_id)
    }

    fn fulfil(order: &mut SalesOrder, line_id: SalesOrderLineId, qty: i64) {
        order.record_picked(line_id, qty, now()).unwrap();
        order.record_pick_confirmed(line_id, qty, now()).unwrap();
        order.record_packed(line_id, qty, now()).unwrap();
        order.record_shipped(line_id, qty, now()).unwrap();
        order.record_invoiced(line_id, qty, now()).unwrap();
    }

    #[test]
    fn create_computes_totals() {
        let order = order_with(
            vec![new_line(3)],
            Pricing {
                discount: Discount::Percent(dec!(10)),
                shipping_fee: dec!(5),
            },
        )
        .unwrap();

        assert_eq!(order.status(), OrderStatus::Draft);
        assert_eq!(order.lines()[0].amount, dec!(30));
        assert_eq!(order.lines()[0].tax_amount, dec!(3));
        assert_eq!(order.totals().total, dec!(34.7));
    }

    #[test]
    fn create_rejects_discount_above_order_amount() {
        let err = order_with(
            vec![new_line(3)],
            Pricing {
                discount: Discount::Fixed(dec!(50)),
                shipping_fee: dec!(5),
            },
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn picking_requires_confirmation() {
        let mut order = order_with(vec![new_line(3)], Pricing::default()).unwrap();
        let line_id = order.lines()[0].id;
        let err = order.record_picked(line_id, 1, now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn confirm_without_lines_fails() {
        let mut order = order_with(vec![], Pricing::default()).unwrap();
        assert!(matches!(order.confirm(now()), Err(DomainError::Validation(_))));
    }

    #[test]
    fn picking_beyond_remaining_demand_is_rejected() {
        let (mut order, line_id) = confirmed(3);
        order.record_picked(line_id, 2, now()).unwrap();
        let err = order.record_picked(line_id, 2, now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert_eq!(order.line(line_id).unwrap().quantity_picked, 2);
    }

    #[test]
    fn packing_is_bounded_by_confirmed_picks() {
        let (mut order, line_id) = confirmed(3);
        order.record_picked(line_id, 2, now()).unwrap();

        let err = order.record_packed(line_id, 1, now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));

        order.record_pick_confirmed(line_id, 1, now()).unwrap();
        assert!(order.record_packed(line_id, 2, now()).is_err());
        order.record_packed(line_id, 1, now()).unwrap();
        assert_eq!(order.dimension_status(SalesDimension::Packing), FulfillmentStatus::Partial);
    }

    #[test]
    fn pick_confirmation_is_bounded_by_picked() {
        let (mut order, line_id) = confirmed(3);
        order.record_picked(line_id, 2, now()).unwrap();
        assert!(matches!(
            order.record_pick_confirmed(line_id, 3, now()),
            Err(DomainError::InvalidState(_))
        ));
        order.record_pick_confirmed(line_id, 2, now()).unwrap();
        assert_eq!(order.line(line_id).unwrap().quantity_pick_confirmed, 2);
    }

    #[test]
    fn huge_quantities_are_rejected_without_overflow() {
        let (mut order, line_id) = confirmed(3);
        order.record_invoiced(line_id, 1, now()).unwrap();

        let err = order.record_invoiced(line_id, i64::MAX, now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert_eq!(order.line(line_id).unwrap().quantity_invoiced, 1);
    }

    #[test]
    fn ordered_quantities_that_overflow_are_rejected() {
        let err = order_with(vec![new_line(i64::MAX), new_line(i64::MAX)], Pricing::default())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let (mut order, _) = confirmed(1);
        let before = order.clone();
        assert!(matches!(
            order.add_line(new_line(i64::MAX), now()),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(order, before);
    }

    #[test]
    fn line_with_picked_quantity_cannot_shrink() {
        let (mut order, line_id) = confirmed(3);
        order.record_picked(line_id, 2, now()).unwrap();

        let shrink = SalesLineUpdate {
            quantity: 1,
            rate: dec!(10),
            tax_id: None,
            tax_rate: dec!(10),
        };
        assert!(matches!(
            order.update_line(line_id, shrink, now()),
            Err(DomainError::InvalidState(_))
        ));

        let grow = SalesLineUpdate {
            quantity: 5,
            rate: dec!(10),
            tax_id: None,
            tax_rate: dec!(10),
        };
        order.update_line(line_id, grow, now()).unwrap();
        assert_eq!(order.line(line_id).unwrap().quantity, 5);
        assert_eq!(order.totals().subtotal, dec!(50));
    }

    #[test]
    fn picked_line_cannot_be_removed() {
        let (mut order, line_id) = confirmed(3);
        order.record_picked(line_id, 1, now()).unwrap();
        assert!(matches!(
            order.remove_line(line_id, now()),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn order_closes_when_every_dimension_completes() {
        let (mut order, line_id) = confirmed(2);
        order.record_picked(line_id, 2, now()).unwrap();
        order.record_pick_confirmed(line_id, 2, now()).unwrap();
        order.record_packed(line_id, 2, now()).unwrap();
        order.record_shipped(line_id, 2, now()).unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);

        order.record_invoiced(line_id, 2, now()).unwrap();
        assert_eq!(order.status(), OrderStatus::Closed);
    }

    #[test]
    fn closed_order_regresses_when_a_line_grows() {
        let (mut order, line_id) = confirmed(2);
        fulfil(&mut order, line_id, 2);
        assert_eq!(order.status(), OrderStatus::Closed);

        order
            .update_line(
                line_id,
                SalesLineUpdate {
                    quantity: 4,
                    rate: dec!(10),
                    tax_id: None,
                    tax_rate: dec!(10),
                },
                now(),
            )
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.dimension_status(SalesDimension::Picking), FulfillmentStatus::Partial);
    }

    #[test]
    fn failed_mutation_leaves_order_untouched() {
        let mut order = order_with(
            vec![new_line(3), new_line(3)],
            Pricing {
                discount: Discount::Fixed(dec!(60)),
                shipping_fee: Decimal::ZERO,
            },
        )
        .unwrap();
        let before = order.clone();
        let second = order.lines()[1].id;

        // Removing a line would push the fixed discount above the order amount.
        let err = order.remove_line(second, now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(order, before);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: the order is closed exactly when all four dimensions are
        /// complete.
        #[test]
        fn closed_iff_all_dimensions_complete(
            quantity in 1i64..20,
            picked in 0i64..20,
            packed in 0i64..20,
            shipped in 0i64..20,
            invoiced in 0i64..20,
        ) {
            let (mut order, line_id) = confirmed(quantity);
            let picked = picked.min(quantity);
            let packed = packed.min(picked);
            let shipped = shipped.min(packed);
            let invoiced = invoiced.min(quantity);
            if picked > 0 {
                order.record_picked(line_id, picked, now()).unwrap();
                order.record_pick_confirmed(line_id, picked, now()).unwrap();
            }
            if packed > 0 { order.record_packed(line_id, packed, now()).unwrap(); }
            if shipped > 0 { order.record_shipped(line_id, shipped, now()).unwrap(); }
            if invoiced > 0 { order.record_invoiced(line_id, invoiced, now()).unwrap(); }

            let complete = [
                SalesDimension::Picking,
                SalesDimension::Packing,
                SalesDimension::Shipping,
                SalesDimension::Invoicing,
            ]
            .iter()
            .all(|d| order.dimension_status(*d) == FulfillmentStatus::Complete);
            prop_assert_eq!(order.status() == OrderStatus::Closed, complete);
        }
    }
}
