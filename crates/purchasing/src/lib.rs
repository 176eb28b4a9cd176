//! Purchase orders (inbound supply).
//!
//! Receiving and billing counters per line; the header is derived from them.

pub mod order;

pub use order::{
    CreatePurchaseOrder, NewPurchaseLine, PurchaseDimension, PurchaseLineUpdate, PurchaseOrder,
    PurchaseOrderId, PurchaseOrderLine, PurchaseOrderLineId, PurchaseOrderStore,
};
