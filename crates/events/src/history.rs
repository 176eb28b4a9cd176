//! History notifications emitted after a committed unit of work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wareflow_core::{TenantId, UserId};

/// What kind of change a [`HistoryEvent`] records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventType {
    StockAdjusted,
    SalesOrderCreated,
    SalesOrderUpdated,
    SalesOrderConfirmed,
    SalesOrderPacked,
    SalesOrderShipped,
    SalesOrderInvoiced,
    PickingOrderCreated,
    PickConfirmed,
    PurchaseOrderCreated,
    PurchaseOrderUpdated,
    PurchaseOrderConfirmed,
    PurchaseOrderReceived,
    PurchaseOrderBilled,
}

impl HistoryEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryEventType::StockAdjusted => "inventory.stock.adjusted",
            HistoryEventType::SalesOrderCreated => "sales.order.created",
            HistoryEventType::SalesOrderUpdated => "sales.order.updated",
            HistoryEventType::SalesOrderConfirmed => "sales.order.confirmed",
            HistoryEventType::SalesOrderPacked => "sales.order.packed",
            HistoryEventType::SalesOrderShipped => "sales.order.shipped",
            HistoryEventType::SalesOrderInvoiced => "sales.order.invoiced",
            HistoryEventType::PickingOrderCreated => "picking.order.created",
            HistoryEventType::PickConfirmed => "picking.order.pick_confirmed",
            HistoryEventType::PurchaseOrderCreated => "purchasing.order.created",
            HistoryEventType::PurchaseOrderUpdated => "purchasing.order.updated",
            HistoryEventType::PurchaseOrderConfirmed => "purchasing.order.confirmed",
            HistoryEventType::PurchaseOrderReceived => "purchasing.order.received",
            HistoryEventType::PurchaseOrderBilled => "purchasing.order.billed",
        }
    }
}

impl core::fmt::Display for HistoryEventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured notification describing one committed business change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub event_type: HistoryEventType,
    /// Id of the entity the change is about (order, picking order, item).
    pub reference_id: Uuid,
    pub description: String,
    pub actor: UserId,
    pub tenant_id: TenantId,
    pub occurred_at: DateTime<Utc>,
}

impl HistoryEvent {
    pub fn new(
        event_type: HistoryEventType,
        reference_id: impl Into<Uuid>,
        description: impl Into<String>,
        actor: UserId,
        tenant_id: TenantId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type,
            reference_id: reference_id.into(),
            description: description.into(),
            actor,
            tenant_id,
            occurred_at,
        }
    }
}
