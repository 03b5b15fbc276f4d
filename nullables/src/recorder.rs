//! Records values handed to a callback so tests can assert on them later.

use std::sync::{Arc, Mutex};

/// Thread-safe sink for observed values.
///
/// Clone it, move one clone into a listener closure that calls
/// [`EventRecorder::record`], and inspect the other.
#[derive(Debug)]
pub struct EventRecorder<T> {
    seen: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for EventRecorder<T> {
    fn clone(&self) -> Self {
        Self {
            seen: Arc::clone(&self.seen),
        }
    }
}

impl<T> Default for EventRecorder<T> {
    fn default() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> EventRecorder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, value: T) {
        self.lock().push(value);
    }

    /// Everything recorded so far, in arrival order.
    pub fn recorded(&self) -> Vec<T> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage() {
        let recorder = EventRecorder::new();
        let sink = recorder.clone();
        sink.record(1u64);
        sink.record(2u64);
        assert_eq!(recorder.recorded(), vec![1, 2]);
        assert_eq!(recorder.len(), 2);
        assert!(!recorder.is_empty());
    }
}
