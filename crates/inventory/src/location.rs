use serde::{Deserialize, Serialize};

use wareflow_core::{BayId, DomainError, DomainResult, LocationId, TenantId, ensure_positive};

/// Counters of one shelf.
///
/// - `quantity`: units physically present
/// - `can_pick`: present and not earmarked for an in-flight pick
/// - `available`: present and not assigned to any reservation
///
/// `can_pick <= quantity <= capacity`, and
/// `quantity == available + reserved()` where `reserved()` is the amount
/// earmarked for picks but not yet physically removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub tenant_id: TenantId,
    pub id: LocationId,
    pub bay_id: BayId,
    pub capacity: i64,
    pub quantity: i64,
    pub available: i64,
    pub can_pick: i64,
}

impl Location {
    /// An empty shelf.
    pub fn open(tenant_id: TenantId, id: LocationId, bay_id: BayId, capacity: i64) -> Self {
        Self {
            tenant_id,
            id,
            bay_id,
            capacity,
            quantity: 0,
            available: 0,
            can_pick: 0,
        }
    }

    /// Earmarked for picks, still on the shelf.
    pub fn reserved(&self) -> i64 {
        self.quantity - self.can_pick
    }

    pub fn free_capacity(&self) -> i64 {
        self.capacity - self.quantity
    }
}

impl wareflow_core::Entity for Location {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Storage port for location counters.
pub trait LocationStore {
    fn find_location(
        &self,
        tenant_id: TenantId,
        location_id: LocationId,
    ) -> DomainResult<Option<Location>>;

    fn save_location(&mut self, location: Location) -> DomainResult<()>;
}

/// Per-location bookkeeping over a [`LocationStore`].
pub trait LocationInventory: LocationStore {
    fn location(&self, tenant_id: TenantId, location_id: LocationId) -> DomainResult<Location> {
        self.find_location(tenant_id, location_id)?
            .ok_or_else(|| DomainError::not_found("location", location_id))
    }

    /// Load the counters of a shelf, opening an empty row the first time the
    /// shelf is used.
    fn ensure_location(
        &mut self,
        tenant_id: TenantId,
        location_id: LocationId,
        bay_id: BayId,
        capacity: i64,
    ) -> DomainResult<Location> {
        if let Some(location) = self.find_location(tenant_id, location_id)? {
            return Ok(location);
        }
        let location = Location::open(tenant_id, location_id, bay_id, capacity);
        self.save_location(location.clone())?;
        Ok(location)
    }

    /// Stock physically arrives at the shelf.
    fn receive_at_location(
        &mut self,
        tenant_id: TenantId,
        location_id: LocationId,
        qty: i64,
    ) -> DomainResult<Location> {
        ensure_positive(qty, "received quantity")?;
        let mut location = self.location(tenant_id, location_id)?;
        if qty > location.free_capacity() {
            return Err(DomainError::insufficient_stock(
                format!("capacity of location {location_id}"),
                qty,
                location.free_capacity(),
            ));
        }
        location.quantity += qty;
        location.available += qty;
        location.can_pick += qty;
        self.save_location(location.clone())?;
        Ok(location)
    }

    /// Earmark stock for an in-flight pick; it stays on the shelf.
    fn reserve_can_pick(
        &mut self,
        tenant_id: TenantId,
        location_id: LocationId,
        qty: i64,
    ) -> DomainResult<Location> {
        ensure_positive(qty, "reserved quantity")?;
        let mut location = self.location(tenant_id, location_id)?;
        if location.can_pick < qty {
            return Err(DomainError::insufficient_stock(
                format!("pickable stock at location {location_id}"),
                qty,
                location.can_pick,
            ));
        }
        location.can_pick -= qty;
        location.available -= qty;
        self.save_location(location.clone())?;
        Ok(location)
    }

    /// Operator confirms earmarked stock left the shelf. `available` already
    /// moved at reservation time.
    fn confirm_picked(
        &mut self,
        tenant_id: TenantId,
        location_id: LocationId,
        qty: i64,
    ) -> DomainResult<Location> {
        ensure_positive(qty, "picked quantity")?;
        let mut location = self.location(tenant_id, location_id)?;
        if qty > location.reserved() {
            return Err(DomainError::invalid_state(format!(
                "cannot confirm {qty} picked at location {location_id}: only {} reserved",
                location.reserved()
            )));
        }
        location.quantity -= qty;
        self.save_location(location.clone())?;
        Ok(location)
    }
}

impl<T: LocationStore + ?Sized> LocationInventory for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn shelf(store: &mut MemoryStore, capacity: i64) -> (TenantId, LocationId) {
        let tenant_id = TenantId::new();
        let location_id = LocationId::new();
        store
            .ensure_location(tenant_id, location_id, BayId::new(), capacity)
            .unwrap();
        (tenant_id, location_id)
    }

    #[test]
    fn receive_reserve_confirm_keeps_counters_consistent() {
        let mut store = MemoryStore::default();
        let (tenant_id, location_id) = shelf(&mut store, 100);

        store.receive_at_location(tenant_id, location_id, 10).unwrap();
        let loc = store.reserve_can_pick(tenant_id, location_id, 4).unwrap();
        assert_eq!((loc.quantity, loc.can_pick, loc.available), (10, 6, 6));
        assert_eq!(loc.reserved(), 4);

        let loc = store.confirm_picked(tenant_id, location_id, 3).unwrap();
        assert_eq!((loc.quantity, loc.can_pick, loc.available), (7, 6, 6));
        assert_eq!(loc.reserved(), 1);
        assert_eq!(loc.quantity, loc.available + loc.reserved());
    }

    #[test]
    fn receiving_beyond_capacity_fails() {
        let mut store = MemoryStore::default();
        let (tenant_id, location_id) = shelf(&mut store, 5);

        store.receive_at_location(tenant_id, location_id, 4).unwrap();
        let err = store.receive_at_location(tenant_id, location_id, 2).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            }
        ));
    }

    #[test]
    fn reserving_more_than_can_pick_fails() {
        let mut store = MemoryStore::default();
        let (tenant_id, location_id) = shelf(&mut store, 10);
        store.receive_at_location(tenant_id, location_id, 3).unwrap();

        let err = store.reserve_can_pick(tenant_id, location_id, 4).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(store.location(tenant_id, location_id).unwrap().can_pick, 3);
    }

    #[test]
    fn confirming_unreserved_stock_is_invalid() {
        let mut store = MemoryStore::default();
        let (tenant_id, location_id) = shelf(&mut store, 10);
        store.receive_at_location(tenant_id, location_id, 5).unwrap();
        store.reserve_can_pick(tenant_id, location_id, 2).unwrap();

        let err = store.confirm_picked(tenant_id, location_id, 3).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn ensure_location_keeps_existing_counters() {
        let mut store = MemoryStore::default();
        let (tenant_id, location_id) = shelf(&mut store, 10);
        store.receive_at_location(tenant_id, location_id, 5).unwrap();

        let again = store
            .ensure_location(tenant_id, location_id, BayId::new(), 99)
            .unwrap();
        assert_eq!(again.quantity, 5);
        assert_eq!(again.capacity, 10);
    }

    #[test]
    fn unknown_location_is_not_found() {
        let store = MemoryStore::default();
        assert!(matches!(
            store.location(TenantId::new(), LocationId::new()),
            Err(DomainError::NotFound { entity: "location", .. })
        ));
    }
}
