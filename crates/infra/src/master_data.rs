//! Master-data lookups.
//!
//! Items, locations, bays, customers, vendors and taxes are maintained
//! elsewhere; the engine only needs to resolve them by id.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wareflow_core::{BayId, CustomerId, DomainError, DomainResult, ItemId, LocationId, TaxId, TenantId, VendorId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub name: String,
    /// Stock of this item is held per location and per batch.
    pub track_location: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BayRecord {
    pub id: BayId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: LocationId,
    pub bay_id: BayId,
    pub capacity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRecord<Id> {
    pub id: Id,
    pub name: String,
}

pub type CustomerRecord = PartyRecord<CustomerId>;
pub type VendorRecord = PartyRecord<VendorId>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRecord {
    pub id: TaxId,
    pub name: String,
    /// Percentage, e.g. `10` for 10%.
    pub rate: Decimal,
}

/// Read-only master-data port. Every lookup fails with `NotFound` for
/// unknown (or other-tenant) ids.
pub trait MasterData: Send + Sync {
    fn item(&self, tenant_id: TenantId, id: ItemId) -> DomainResult<ItemRecord>;
    fn bay(&self, tenant_id: TenantId, id: BayId) -> DomainResult<BayRecord>;
    fn location(&self, tenant_id: TenantId, id: LocationId) -> DomainResult<LocationRecord>;
    fn customer(&self, tenant_id: TenantId, id: CustomerId) -> DomainResult<CustomerRecord>;
    fn vendor(&self, tenant_id: TenantId, id: VendorId) -> DomainResult<VendorRecord>;
    fn tax(&self, tenant_id: TenantId, id: TaxId) -> DomainResult<TaxRecord>;

    /// Rate of an optional tax; no tax means a zero rate.
    fn tax_rate(&self, tenant_id: TenantId, id: Option<TaxId>) -> DomainResult<Decimal> {
        match id {
            Some(id) => Ok(self.tax(tenant_id, id)?.rate),
            None => Ok(Decimal::ZERO),
        }
    }
}

impl<M: MasterData + ?Sized> MasterData for std::sync::Arc<M> {
    fn item(&self, tenant_id: TenantId, id: ItemId) -> DomainResult<ItemRecord> {
        (**self).item(tenant_id, id)
    }

    fn bay(&self, tenant_id: TenantId, id: BayId) -> DomainResult<BayRecord> {
        (**self).bay(tenant_id, id)
    }

    fn location(&self, tenant_id: TenantId, id: LocationId) -> DomainResult<LocationRecord> {
        (**self).location(tenant_id, id)
    }

    fn customer(&self, tenant_id: TenantId, id: CustomerId) -> DomainResult<CustomerRecord> {
        (**self).customer(tenant_id, id)
    }

    fn vendor(&self, tenant_id: TenantId, id: VendorId) -> DomainResult<VendorRecord> {
        (**self).vendor(tenant_id, id)
    }

    fn tax(&self, tenant_id: TenantId, id: TaxId) -> DomainResult<TaxRecord> {
        (**self).tax(tenant_id, id)
    }
}

/// Tenant-keyed record map.
#[derive(Debug)]
struct Records<K, V> {
    inner: RwLock<HashMap<(TenantId, K), V>>,
}

impl<K, V> Default for Records<K, V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Records<K, V>
where
    K: Copy + Eq + Hash + core::fmt::Display,
    V: Clone,
{
    fn get(&self, tenant_id: TenantId, key: K, entity: &'static str) -> DomainResult<V> {
        let map = self
            .inner
            .read()
            .map_err(|_| DomainError::persistence("master data lock poisoned"))?;
        map.get(&(tenant_id, key))
            .cloned()
            .ok_or_else(|| DomainError::not_found(entity, key))
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, key), value);
        }
    }
}

/// In-memory master data for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryMasterData {
    items: Records<ItemId, ItemRecord>,
    bays: Records<BayId, BayRecord>,
    locations: Records<LocationId, LocationRecord>,
    customers: Records<CustomerId, CustomerRecord>,
    vendors: Records<VendorId, VendorRecord>,
    taxes: Records<TaxId, TaxRecord>,
}

impl InMemoryMasterData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_item(&self, tenant_id: TenantId, record: ItemRecord) {
        self.items.upsert(tenant_id, record.id, record);
    }

    pub fn register_bay(&self, tenant_id: TenantId, record: BayRecord) {
        self.bays.upsert(tenant_id, record.id, record);
    }

    pub fn register_location(&self, tenant_id: TenantId, record: LocationRecord) {
        self.locations.upsert(tenant_id, record.id, record);
    }

    pub fn register_customer(&self, tenant_id: TenantId, record: CustomerRecord) {
        self.customers.upsert(tenant_id, record.id, record);
    }

    pub fn register_vendor(&self, tenant_id: TenantId, record: VendorRecord) {
        self.vendors.upsert(tenant_id, record.id, record);
    }

    pub fn register_tax(&self, tenant_id: TenantId, record: TaxRecord) {
        self.taxes.upsert(tenant_id, record.id, record);
    }
}

impl MasterData for InMemoryMasterData {
    fn item(&self, tenant_id: TenantId, id: ItemId) -> DomainResult<ItemRecord> {
        self.items.get(tenant_id, id, "item")
    }

    fn bay(&self, tenant_id: TenantId, id: BayId) -> DomainResult<BayRecord> {
        self.bays.get(tenant_id, id, "bay")
    }

    fn location(&self, tenant_id: TenantId, id: LocationId) -> DomainResult<LocationRecord> {
        self.locations.get(tenant_id, id, "location")
    }

    fn customer(&self, tenant_id: TenantId, id: CustomerId) -> DomainResult<CustomerRecord> {
        self.customers.get(tenant_id, id, "customer")
    }

    fn vendor(&self, tenant_id: TenantId, id: VendorId) -> DomainResult<VendorRecord> {
        self.vendors.get(tenant_id, id, "vendor")
    }

    fn tax(&self, tenant_id: TenantId, id: TaxId) -> DomainResult<TaxRecord> {
        self.taxes.get(tenant_id, id, "tax")
    }
}
