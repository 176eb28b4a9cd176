//! Entity trait: identity + continuity across state changes.

use crate::id::TenantId;

/// Entity marker + minimal interface.
///
/// Every persisted row in the warehouse engine is an entity scoped to a
/// tenant; storage adapters key rows by `(tenant_id, id)`.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Tenant (organization) owning this entity.
    fn tenant_id(&self) -> TenantId;
}
