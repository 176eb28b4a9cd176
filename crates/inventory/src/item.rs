use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, ItemId, TenantId, ensure_positive};

/// The four mutually exclusive quantity states of one item.
///
/// `on_hand == available + picking + packing` and no bucket is ever negative.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub on_hand: i64,
    pub available: i64,
    pub picking: i64,
    pub packing: i64,
}

impl StockLevels {
    pub fn is_balanced(&self) -> bool {
        self.on_hand == self.available + self.picking + self.packing
    }

    /// Stock arrives: `on_hand += qty`, `available += qty`.
    pub fn receive(self, qty: i64) -> DomainResult<Self> {
        ensure_positive(qty, "received quantity")?;
        Ok(Self {
            on_hand: self.on_hand + qty,
            available: self.available + qty,
            ..self
        })
    }

    /// `available -> picking`.
    pub fn reserve_for_picking(self, qty: i64) -> DomainResult<Self> {
        ensure_positive(qty, "picking quantity")?;
        if self.available < qty {
            return Err(DomainError::insufficient_stock(
                "available stock",
                qty,
                self.available,
            ));
        }
        Ok(Self {
            available: self.available - qty,
            picking: self.picking + qty,
            ..self
        })
    }

    /// `picking -> packing`.
    pub fn advance_to_packing(self, qty: i64) -> DomainResult<Self> {
        ensure_positive(qty, "packing quantity")?;
        if self.picking < qty {
            return Err(DomainError::insufficient_stock(
                "stock in picking",
                qty,
                self.picking,
            ));
        }
        Ok(Self {
            picking: self.picking - qty,
            packing: self.packing + qty,
            ..self
        })
    }

    /// Stock leaves the building: `packing -= qty`, `on_hand -= qty`.
    pub fn ship_out(self, qty: i64) -> DomainResult<Self> {
        ensure_positive(qty, "shipped quantity")?;
        if self.packing < qty {
            return Err(DomainError::insufficient_stock(
                "stock in packing",
                qty,
                self.packing,
            ));
        }
        Ok(Self {
            packing: self.packing - qty,
            on_hand: self.on_hand - qty,
            ..self
        })
    }
}

/// Stock row of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStock {
    pub tenant_id: TenantId,
    pub item_id: ItemId,
    pub levels: StockLevels,
}

impl ItemStock {
    pub fn empty(tenant_id: TenantId, item_id: ItemId) -> Self {
        Self {
            tenant_id,
            item_id,
            levels: StockLevels::default(),
        }
    }
}

impl wareflow_core::Entity for ItemStock {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.item_id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Storage port for item stock rows.
pub trait ItemStore {
    /// Load the stock row of an item. Items that never held stock yield an
    /// empty row; existence of the item itself is a master-data concern.
    fn load_stock(&self, tenant_id: TenantId, item_id: ItemId) -> DomainResult<ItemStock>;

    fn save_stock(&mut self, stock: ItemStock) -> DomainResult<()>;
}

/// Bucket-to-bucket transfers on one item, inside the caller's unit of work.
///
/// A failed transfer leaves the row untouched.
pub trait StockLedger: ItemStore {
    fn receive_stock(
        &mut self,
        tenant_id: TenantId,
        item_id: ItemId,
        qty: i64,
    ) -> DomainResult<StockLevels> {
        self.transfer(tenant_id, item_id, |levels| levels.receive(qty))
    }

    fn reserve_for_picking(
        &mut self,
        tenant_id: TenantId,
        item_id: ItemId,
        qty: i64,
    ) -> DomainResult<StockLevels> {
        self.transfer(tenant_id, item_id, |levels| levels.reserve_for_picking(qty))
    }

    fn advance_to_packing(
        &mut self,
        tenant_id: TenantId,
        item_id: ItemId,
        qty: i64,
    ) -> DomainResult<StockLevels> {
        self.transfer(tenant_id, item_id, |levels| levels.advance_to_packing(qty))
    }

    fn ship_out(
        &mut self,
        tenant_id: TenantId,
        item_id: ItemId,
        qty: i64,
    ) -> DomainResult<StockLevels> {
        self.transfer(tenant_id, item_id, |levels| levels.ship_out(qty))
    }

    #[doc(hidden)]
    fn transfer(
        &mut self,
        tenant_id: TenantId,
        item_id: ItemId,
        op: impl FnOnce(StockLevels) -> DomainResult<StockLevels>,
    ) -> DomainResult<StockLevels> {
        let mut stock = self.load_stock(tenant_id, item_id)?;
        stock.levels = op(stock.levels).map_err(|err| match err {
            DomainError::InsufficientStock {
                context,
                requested,
                available,
            } => DomainError::InsufficientStock {
                context: format!("{context} of item {item_id}"),
                requested,
                available,
            },
            other => other,
        })?;
        let levels = stock.levels;
        self.save_stock(stock)?;
        Ok(levels)
    }
}

impl<T: ItemStore + ?Sized> StockLedger for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use proptest::prelude::*;

    #[test]
    fn full_flow_keeps_buckets_balanced() {
        let levels = StockLevels::default()
            .receive(10)
            .and_then(|l| l.reserve_for_picking(6))
            .and_then(|l| l.advance_to_packing(4))
            .and_then(|l| l.ship_out(3))
            .unwrap();

        assert_eq!(
            levels,
            StockLevels {
                on_hand: 7,
                available: 4,
                picking: 2,
                packing: 1,
            }
        );
        assert!(levels.is_balanced());
    }

    #[test]
    fn reserving_more_than_available_fails() {
        let levels = StockLevels::default().receive(3).unwrap();
        let err = levels.reserve_for_picking(4).unwrap_err();
        assert_eq!(
            err,
            DomainError::insufficient_stock("available stock", 4, 3)
        );
    }

    #[test]
    fn receive_rejects_non_positive_quantities() {
        assert!(matches!(
            StockLevels::default().receive(0),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            StockLevels::default().receive(-2),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn ship_out_requires_packed_stock() {
        let levels = StockLevels::default()
            .receive(5)
            .and_then(|l| l.reserve_for_picking(5))
            .unwrap();
        assert!(matches!(
            levels.ship_out(1),
            Err(DomainError::InsufficientStock { .. })
        ));
    }

    #[test]
    fn ledger_failure_leaves_row_untouched() {
        let mut store = MemoryStore::default();
        let tenant_id = TenantId::new();
        let item_id = ItemId::new();

        store.receive_stock(tenant_id, item_id, 2).unwrap();
        let err = store.reserve_for_picking(tenant_id, item_id, 3).unwrap_err();

        match err {
            DomainError::InsufficientStock { context, .. } => {
                assert!(context.contains(&item_id.to_string()))
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        let stock = store.load_stock(tenant_id, item_id).unwrap();
        assert_eq!(stock.levels.available, 2);
        assert_eq!(stock.levels.picking, 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Receive(i64),
        Reserve(i64),
        Pack(i64),
        Ship(i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..50).prop_map(Op::Receive),
            (1i64..50).prop_map(Op::Reserve),
            (1i64..50).prop_map(Op::Pack),
            (1i64..50).prop_map(Op::Ship),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever sequence of transfers is attempted, buckets stay
        /// non-negative and on-hand stays the sum of the other three.
        #[test]
        fn buckets_never_go_negative(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let mut levels = StockLevels::default();
            for op in ops {
                let next = match op {
                    Op::Receive(q) => levels.receive(q),
                    Op::Reserve(q) => levels.reserve_for_picking(q),
                    Op::Pack(q) => levels.advance_to_packing(q),
                    Op::Ship(q) => levels.ship_out(q),
                };
                if let Ok(next) = next {
                    levels = next;
                }
                prop_assert!(levels.on_hand >= 0);
                prop_assert!(levels.available >= 0);
                prop_assert!(levels.picking >= 0);
                prop_assert!(levels.packing >= 0);
                prop_assert!(levels.is_balanced());
            }
        }
    }
}
