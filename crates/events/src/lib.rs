//! History notifications and the pub/sub mechanics that carry them.
//!
//! Notifications are emitted **after** a unit of work commits; they describe
//! what happened and never feed back into stock or order state.

pub mod bus;
pub mod history;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use history::{HistoryEvent, HistoryEventType};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
