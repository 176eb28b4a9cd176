use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, ItemId, LocationId, TenantId};
use wareflow_inventory::BatchId;
use wareflow_sales::{SalesOrderId, SalesOrderLineId};

wareflow_core::aggregate_id!(
    /// Picking order identifier (tenant-scoped via `tenant_id`).
    PickingOrderId
);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickingStatus {
    Pending,
    PartiallyPicked,
    FullyPicked,
}

impl PickingStatus {
    /// Status implied by the confirmation counters of the details.
    pub fn derive(details: &[PickingOrderDetail]) -> Self {
        if details.iter().all(PickingOrderDetail::is_complete) {
            PickingStatus::FullyPicked
        } else if details.iter().all(|d| d.quantity_picked == 0) {
            PickingStatus::Pending
        } else {
            PickingStatus::PartiallyPicked
        }
    }
}

/// Mirror of one sales-order line pick request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickingOrderItem {
    pub sales_order_id: SalesOrderId,
    pub sales_order_line_id: SalesOrderLineId,
    pub item_id: ItemId,
    pub quantity: i64,
    /// False for items without location tracking; those skip the shelf
    /// confirmation step.
    pub location_tracked: bool,
}

/// One batch consumption made for a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickingOrderLog {
    pub sales_order_id: SalesOrderId,
    pub sales_order_line_id: SalesOrderLineId,
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub batch_id: BatchId,
    pub quantity: i64,
}

/// Pick instruction per (location, item), confirmed by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickingOrderDetail {
    pub location_id: LocationId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub quantity_picked: i64,
}

impl PickingOrderDetail {
    pub fn remaining(&self) -> i64 {
        self.quantity - self.quantity_picked
    }

    pub fn is_complete(&self) -> bool {
        self.quantity_picked == self.quantity
    }
}

/// Group logs by (location, item), keeping first-seen order.
pub fn aggregate_details(logs: &[PickingOrderLog]) -> Vec<PickingOrderDetail> {
    let mut details: Vec<PickingOrderDetail> = Vec::new();
    for log in logs {
        match details
            .iter_mut()
            .find(|d| d.location_id == log.location_id && d.item_id == log.item_id)
        {
            Some(detail) => detail.quantity += log.quantity,
            None => details.push(PickingOrderDetail {
                location_id: log.location_id,
                item_id: log.item_id,
                quantity: log.quantity,
                quantity_picked: 0,
            }),
        }
    }
    details
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickingOrder {
    pub id: PickingOrderId,
    pub tenant_id: TenantId,
    pub number: String,
    pub sales_order_ids: Vec<SalesOrderId>,
    pub status: PickingStatus,
    pub items: Vec<PickingOrderItem>,
    pub logs: Vec<PickingOrderLog>,
    pub details: Vec<PickingOrderDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PickingOrder {
    pub fn detail(&self, location_id: LocationId, item_id: ItemId) -> DomainResult<&PickingOrderDetail> {
        self.details
            .iter()
            .find(|d| d.location_id == location_id && d.item_id == item_id)
            .ok_or_else(|| {
                DomainError::not_found("picking order detail", format!("{location_id}/{item_id}"))
            })
    }

    /// Count `qty` as confirmed on the (location, item) detail and attribute
    /// it to the sales-order lines whose logs reserved that shelf, in log order.
    pub fn confirm_detail(
        &mut self,
        location_id: LocationId,
        item_id: ItemId,
        qty: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<ConfirmedShare>> {
        let detail = self
            .details
            .iter_mut()
            .find(|d| d.location_id == location_id && d.item_id == item_id)
            .ok_or_else(|| {
                DomainError::not_found("picking order detail", format!("{location_id}/{item_id}"))
            })?;
        if qty > detail.remaining() {
            return Err(DomainError::invalid_state(format!(
                "cannot confirm {qty} at location {location_id}: only {} left to pick",
                detail.remaining()
            )));
        }
        let mut skip = detail.quantity_picked;
        detail.quantity_picked += qty;

        let mut left = qty;
        let mut shares: Vec<ConfirmedShare> = Vec::new();
        for log in self
            .logs
            .iter()
            .filter(|l| l.location_id == location_id && l.item_id == item_id)
        {
            if left == 0 {
                break;
            }
            let already = skip.min(log.quantity);
            skip -= already;
            let take = (log.quantity - already).min(left);
            if take == 0 {
                continue;
            }
            left -= take;
            match shares
                .iter_mut()
                .find(|s| s.sales_order_line_id == log.sales_order_line_id)
            {
                Some(share) => share.quantity += take,
                None => shares.push(ConfirmedShare {
                    sales_order_id: log.sales_order_id,
                    sales_order_line_id: log.sales_order_line_id,
                    quantity: take,
                }),
            }
        }

        self.status = PickingStatus::derive(&self.details);
        self.updated_at = at;
        Ok(shares)
    }
}

impl wareflow_core::Entity for PickingOrder {
    type Id = PickingOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Part of a shelf confirmation that belongs to one sales-order line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedShare {
    pub sales_order_id: SalesOrderId,
    pub sales_order_line_id: SalesOrderLineId,
    pub quantity: i64,
}

/// Storage port for picking orders.
pub trait PickingOrderStore {
    /// Next value of the tenant's picking-number counter, starting at 1.
    fn next_picking_number(&mut self, tenant_id: TenantId) -> DomainResult<u64>;

    fn find_picking_order(
        &self,
        tenant_id: TenantId,
        picking_order_id: PickingOrderId,
    ) -> DomainResult<Option<PickingOrder>>;

    fn save_picking_order(&mut self, order: PickingOrder) -> DomainResult<()>;

    fn load_picking_order(
        &self,
        tenant_id: TenantId,
        picking_order_id: PickingOrderId,
    ) -> DomainResult<PickingOrder> {
        self.find_picking_order(tenant_id, picking_order_id)?
            .ok_or_else(|| DomainError::not_found("picking order", picking_order_id))
    }
}
