use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wareflow_core::{DomainError, DomainResult, ItemId, LocationId, TenantId, ensure_positive};

wareflow_core::aggregate_id!(
    /// Identifier of a stock lot.
    BatchId
);

/// A lot of one item's stock, consumed oldest-first.
///
/// `0 <= balance <= quantity`. Batches are never deleted; a batch whose
/// balance reached zero is closed and skipped by allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub tenant_id: TenantId,
    pub id: BatchId,
    pub item_id: ItemId,
    /// Location the lot was put away at.
    pub location_id: LocationId,
    /// Original lot size.
    pub quantity: i64,
    /// Remaining consumable amount.
    pub balance: i64,
    /// Receipt or adjustment that produced the lot.
    pub reference_id: Option<Uuid>,
    /// Store-assigned creation order; FIFO sorts by this, not by timestamp.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn is_open(&self) -> bool {
        self.balance > 0
    }

    fn consume(&mut self, qty: i64) -> DomainResult<()> {
        ensure_positive(qty, "consumed quantity")?;
        if qty > self.balance {
            return Err(DomainError::validation(format!(
                "cannot consume {qty} from batch {} with balance {}",
                self.id, self.balance
            )));
        }
        self.balance -= qty;
        Ok(())
    }
}

impl wareflow_core::Entity for Batch {
    type Id = BatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// One slice of an allocation: `quantity` taken from `batch_id`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConsumption {
    pub batch_id: BatchId,
    pub location_id: LocationId,
    pub quantity: i64,
}

/// Storage port for batches.
pub trait BatchStore {
    /// Next creation-order number. Must be strictly increasing across the store.
    fn next_batch_sequence(&self) -> u64;

    fn find_batch(&self, tenant_id: TenantId, batch_id: BatchId) -> DomainResult<Option<Batch>>;

    /// Every batch of an item, open or closed, in any order.
    fn batches_for_item(&self, tenant_id: TenantId, item_id: ItemId) -> DomainResult<Vec<Batch>>;

    fn save_batch(&mut self, batch: Batch) -> DomainResult<()>;
}

/// FIFO lot management over a [`BatchStore`].
pub trait BatchAllocator: BatchStore {
    fn create_batch(
        &mut self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
        qty: i64,
        reference_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Batch> {
        ensure_positive(qty, "batch quantity")?;
        let batch = Batch {
            tenant_id,
            id: BatchId::new(),
            item_id,
            location_id,
            quantity: qty,
            balance: qty,
            reference_id,
            sequence: self.next_batch_sequence(),
            created_at,
        };
        self.save_batch(batch.clone())?;
        Ok(batch)
    }

    /// Oldest batch of the item that still has a balance.
    fn next_batch(&self, tenant_id: TenantId, item_id: ItemId) -> DomainResult<Batch> {
        self.batches_for_item(tenant_id, item_id)?
            .into_iter()
            .filter(Batch::is_open)
            .min_by_key(|b| b.sequence)
            .ok_or_else(|| DomainError::not_found("open batch for item", item_id))
    }

    fn consume(&mut self, tenant_id: TenantId, batch_id: BatchId, qty: i64) -> DomainResult<Batch> {
        let mut batch = self
            .find_batch(tenant_id, batch_id)?
            .ok_or_else(|| DomainError::not_found("batch", batch_id))?;
        batch.consume(qty)?;
        self.save_batch(batch.clone())?;
        Ok(batch)
    }

    /// Consume `qty` from the item's batches, oldest first.
    ///
    /// On shortfall every batch touched by this call is restored before the
    /// `InsufficientStock` error is returned.
    fn allocate_fifo(
        &mut self,
        tenant_id: TenantId,
        item_id: ItemId,
        qty: i64,
    ) -> DomainResult<Vec<BatchConsumption>> {
        ensure_positive(qty, "allocated quantity")?;

        let mut remaining = qty;
        let mut originals: Vec<Batch> = Vec::new();
        let mut consumed = Vec::new();

        while remaining > 0 {
            let batch = match self.next_batch(tenant_id, item_id) {
                Ok(batch) => batch,
                Err(DomainError::NotFound { .. }) => {
                    for original in originals {
                        self.save_batch(original)?;
                    }
                    return Err(DomainError::insufficient_stock(
                        format!("batches of item {item_id}"),
                        qty,
                        qty - remaining,
                    ));
                }
                Err(other) => return Err(other),
            };

            let take = remaining.min(batch.balance);
            originals.push(batch.clone());
            self.consume(tenant_id, batch.id, take)?;
            consumed.push(BatchConsumption {
                batch_id: batch.id,
                location_id: batch.location_id,
                quantity: take,
            });
            remaining -= take;
        }

        Ok(consumed)
    }
}

impl<T: BatchStore + ?Sized> BatchAllocator for T {}
