//! Sales orders (outbound demand).
//!
//! Business rules only: lines, fulfillment counters and the derived header.
//! Storage goes through [`SalesOrderStore`].

pub mod order;

pub use order::{
    CreateSalesOrder, NewSalesLine, SalesDimension, SalesLineUpdate, SalesOrder, SalesOrderId,
    SalesOrderLine, SalesOrderLineId, SalesOrderStore,
};
