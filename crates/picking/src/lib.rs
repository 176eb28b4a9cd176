//! Picking work orders.
//!
//! [`PickingOrchestrator`] turns sales-order demand into batch and location
//! consumption inside the caller's unit of work and records the result as a
//! [`PickingOrder`].

pub mod orchestrator;
pub mod order;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{
    ConfirmLocationPick, CreateBatchPickingOrder, CreatePickingOrder, ItemTracking, PickRequest,
    PickingOrchestrator,
};
pub use order::{
    ConfirmedShare, PickingOrder, PickingOrderDetail, PickingOrderId, PickingOrderItem, PickingOrderLog,
    PickingOrderStore, PickingStatus, aggregate_details,
};
