//! Bounded holding area for notifications whose publish failed.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct Outbox<M> {
    capacity: usize,
    pending: Mutex<VecDeque<M>>,
}

impl<M> Outbox<M> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Keep `message` for a later flush. When full, the oldest message is
    /// evicted and returned.
    pub fn push(&self, message: M) -> Option<M> {
        let mut pending = self.lock();
        let evicted = if pending.len() >= self.capacity {
            pending.pop_front()
        } else {
            None
        };
        pending.push_back(message);
        evicted
    }

    /// Take every pending message, oldest first.
    pub fn drain(&self) -> Vec<M> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<M>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_message_is_evicted_when_full() {
        let outbox = Outbox::new(2);
        assert_eq!(outbox.push(1), None);
        assert_eq!(outbox.push(2), None);
        assert_eq!(outbox.push(3), Some(1));
        assert_eq!(outbox.drain(), vec![2, 3]);
        assert!(outbox.is_empty());
    }
}
