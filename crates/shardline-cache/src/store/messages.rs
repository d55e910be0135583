//! Bounded message store with first-in first-out eviction

use shardline_core::{Message, Snowflake};
use std::collections::{HashMap, VecDeque};

/// Messages keyed by id, remembering insertion order.
///
/// Replacing an existing message keeps its original position; only new ids
/// count towards the capacity.
#[derive(Debug)]
pub(crate) struct MessageStore {
    capacity: usize,
    entries: HashMap<Snowflake, Message>,
    order: VecDeque<Snowflake>,
}

impl MessageStore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub(crate) fn get(&self, id: Snowflake) -> Option<&Message> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: Snowflake) -> Option<&mut Message> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn contains(&self, id: Snowflake) -> bool {
        self.entries.contains_key(&id)
    }

    /// Insert a message, returning the entry evicted to make room.
    pub(crate) fn insert(&mut self, message: Message) -> Option<Message> {
        if self.capacity == 0 {
            return None;
        }
        if let Some(existing) = self.entries.get_mut(&message.id) {
            *existing = message;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.order.pop_front().and_then(|oldest| self.entries.remove(&oldest))
        } else {
            None
        };

        self.order.push_back(message.id);
        self.entries.insert(message.id, message);
        evicted
    }

    pub(crate) fn remove(&mut self, id: Snowflake) -> Option<Message> {
        let removed = self.entries.remove(&id)?;
        self.order.retain(|&queued| queued != id);
        Some(removed)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Ids from oldest to newest
    pub(crate) fn ids(&self) -> impl Iterator<Item = Snowflake> + '_ {
        self.order.iter().copied()
    }
}
