//! Infrastructure layer: transactional store, master data, configuration
//! and the warehouse service facade.

pub mod config;
pub mod master_data;
pub mod outbox;
pub mod service;
pub mod store;


pub use config::{ConfigLoadError, EngineConfig, NotificationConfig, PickingConfig};
pub use master_data::{
    BayRecord, CustomerRecord, InMemoryMasterData, ItemRecord, LocationRecord, MasterData,
    PartyRecord, TaxRecord, VendorRecord,
};
pub use outbox::Outbox;
pub use service::{
    Context, LineQuantity, NewPurchaseOrder, NewSalesOrder, PurchaseLineInput, Receipt,
    SalesLineInput, WarehouseService,
};
pub use store::{Committed, InMemoryWarehouseStore, Transaction};
