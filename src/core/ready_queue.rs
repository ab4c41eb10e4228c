//! Ordered holding area for queued tasks.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::core::task::{Priority, TaskId, TaskRecord};

/// Ordering key: priority first, then creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueKey {
    priority: Priority,
    created_at: Instant,
    sequence: u64,
}

impl QueueKey {
    fn of<P, R>(record: &TaskRecord<P, R>) -> Self {
        Self {
            priority: record.priority,
            created_at: record.created_at,
            sequence: record.sequence,
        }
    }
}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Most urgent first, FIFO within a tier. Sequence breaks Instant ties.
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// Queued tasks kept in `(priority, created_at)` order.
///
/// Readiness is not the queue's concern: the scheduler walks
/// [`ReadyQueue::iter`] in selection order and takes the first ready entry.
pub struct ReadyQueue<P, R> {
    tasks: BTreeMap<QueueKey, TaskRecord<P, R>>,
    index: HashMap<TaskId, QueueKey>,
}

impl<P, R> Default for ReadyQueue<P, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, R> ReadyQueue<P, R> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a record, keyed on its current priority.
    pub fn push(&mut self, record: TaskRecord<P, R>) {
        let key = QueueKey::of(&record);
        self.index.insert(record.id.clone(), key);
        self.tasks.insert(key, record);
    }

    /// Remove a record by id.
    pub fn remove(&mut self, id: &str) -> Option<TaskRecord<P, R>> {
        let key = self.index.remove(id)?;
        self.tasks.remove(&key)
    }

    /// Look up a queued record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TaskRecord<P, R>> {
        self.index.get(id).and_then(|key| self.tasks.get(key))
    }

    /// Whether `id` is queued.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Records in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord<P, R>> {
        self.tasks.values()
    }

    /// Number of queued records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
