//! In-memory event log.

use std::sync::Mutex;

use async_trait::async_trait;
use pour_traits::{BoxError, DispenseEvent, EventLog};

/// Event log kept in process memory; lost on exit.
#[derive(Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<DispenseEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event in insertion order.
    pub fn events(&self) -> Vec<DispenseEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn record(&self, event: &DispenseEvent) -> Result<(), BoxError> {
        self.events
            .lock()
            .map_err(|_| std::io::Error::other("memory log poisoned"))?
            .push(event.clone());
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<DispenseEvent>, BoxError> {
        let events = self
            .events
            .lock()
            .map_err(|_| std::io::Error::other("memory log poisoned"))?;
        // Later insertions win ties on timestamp, like `ORDER BY timestamp DESC, id DESC`.
        let mut out: Vec<DispenseEvent> = events.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out.truncate(limit as usize);
        Ok(out)
    }
}
