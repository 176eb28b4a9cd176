//! `wareflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by every warehouse
//! module: identifiers, the error taxonomy and row versioning. No IO.

pub mod entity;
pub mod error;
pub mod id;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, ensure_positive};
pub use id::{AggregateId, BayId, CustomerId, ItemId, LocationId, TaxId, TenantId, UserId, VendorId};
pub use version::ExpectedVersion;
