//! Debounced validation scheduling.
//!
//! Rapid edits to the same circuit are coalesced: each [`ValidationScheduler::schedule`]
//! call for a circuit id cancels the pending validation for that id and
//! restarts the quiet-period timer. When the timer expires the engine runs
//! and the result is broadcast to every subscriber. Different circuit ids
//! are independent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::circuit::CircuitRecord;
use crate::core::{ValidationEngine, ValidationResult};

const CHANNEL_CAPACITY: usize = 100;

struct PendingValidation {
    generation: u64,
    handle: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<String, PendingValidation>>>;

/// Per-circuit cancel-and-restart timer in front of a [`ValidationEngine`].
///
/// Must be used from within a tokio runtime.
pub struct ValidationScheduler {
    engine: Arc<ValidationEngine>,
    delay: Duration,
    pending: PendingMap,
    results_tx: broadcast::Sender<ValidationResult>,
    next_generation: AtomicU64,
}

impl ValidationScheduler {
    /// Scheduler using the engine's configured debounce period.
    pub fn new(engine: Arc<ValidationEngine>) -> Self {
        let delay = engine.options().debounce;
        Self::with_delay(engine, delay)
    }

    pub fn with_delay(engine: Arc<ValidationEngine>, delay: Duration) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            engine,
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            results_tx: tx,
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn engine(&self) -> &Arc<ValidationEngine> {
        &self.engine
    }

    /// Receive every result produced after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ValidationResult> {
        self.results_tx.subscribe()
    }

    /// Validate `record` once no further edit for its id arrives within the
    /// quiet period. Replaces any validation pending for the same id.
    pub fn schedule(&self, record: CircuitRecord) {
        let id = record.id.clone();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        // Held across spawn so the task cannot observe the map before its
        // own entry is inserted.
        let mut pending = lock(&self.pending);

        let task_pending = Arc::clone(&self.pending);
        let engine = Arc::clone(&self.engine);
        let tx = self.results_tx.clone();
        let delay = self.delay;
        let key = id.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            {
                let mut map = lock(&task_pending);
                match map.get(&key) {
                    Some(entry) if entry.generation == generation => {
                        map.remove(&key);
                    }
                    _ => return,
                }
            }

            let result = engine.validate(&record);
            debug!(
                "Debounced validation of {} finished with {} findings",
                result.circuit_id,
                result.non_conformities.len()
            );
            // No subscribers is fine; the result is still cached.
            let _ = tx.send(result);
        });

        if let Some(previous) = pending.insert(id.clone(), PendingValidation { generation, handle }) {
            debug!("Restarting debounce timer for circuit {}", id);
            previous.handle.abort();
        }
    }

    /// Drop the pending validation for a circuit. Returns whether one existed.
    pub fn cancel(&self, circuit_id: &str) -> bool {
        match lock(&self.pending).remove(circuit_id) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Circuit ids with a validation waiting for its quiet period.
    pub fn pending(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.pending).keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Drop for ValidationScheduler {
    fn drop(&mut self) {
        for (_, entry) in lock(&self.pending).drain() {
            entry.handle.abort();
        }
    }
}

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<String, PendingValidation>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::time::timeout;

    fn record(id: &str, voltage: f64) -> CircuitRecord {
        CircuitRecord {
            voltage: Some(voltage),
            ..CircuitRecord::new(id)
        }
    }

    fn scheduler(delay_ms: u64) -> ValidationScheduler {
        ValidationScheduler::with_delay(
            Arc::new(ValidationEngine::new()),
            Duration::from_millis(delay_ms),
        )
    }

    #[tokio::test]
    async fn test_rapid_edits_coalesce() {
        let scheduler = scheduler(50);
        let mut rx = scheduler.subscribe();

        scheduler.schedule(record("C-1", 400.0));
        scheduler.schedule(record("C-1", 405.0));
        scheduler.schedule(record("C-1", 410.0));
        assert_eq!(scheduler.pending(), vec!["C-1".to_string()]);

        let result = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("validation should complete")
            .unwrap();
        assert_eq!(result.circuit_id, "C-1");
        // Only the last edit is validated
        assert_eq!(result.non_conformities.len(), 1);
        assert_eq!(result.non_conformities[0].actual, Some(410.0));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(scheduler.pending().is_empty());
    }

    #[tokio::test]
    async fn test_different_circuits_are_independent() {
        let scheduler = scheduler(30);
        let mut rx = scheduler.subscribe();

        scheduler.schedule(record("A", 230.0));
        scheduler.schedule(record("B", 230.0));
        assert_eq!(scheduler.pending(), vec!["A".to_string(), "B".to_string()]);

        let mut ids = Vec::new();
        for _ in 0..2 {
            let result = timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("validation should complete")
                .unwrap();
            ids.push(result.circuit_id);
        }
        ids.sort();
        assert_eq!(ids, vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_cancel() {
        let scheduler = scheduler(50);
        let mut rx = scheduler.subscribe();

        scheduler.schedule(record("C-9", 230.0));
        assert!(scheduler.cancel("C-9"));
        assert!(!scheduler.cancel("C-9"));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(scheduler.engine().cached("C-9").is_none());
    }

    #[tokio::test]
    async fn test_result_is_cached() {
        let scheduler = scheduler(10);
        let mut rx = scheduler.subscribe();
        scheduler.schedule(record("C-5", 230.0));

        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("validation should complete")
            .unwrap();
        assert!(scheduler.engine().cached("C-5").is_some());
    }

    #[test]
    fn test_default_delay_from_options() {
        let engine = Arc::new(ValidationEngine::new());
        let scheduler = ValidationScheduler::new(engine);
        assert_eq!(scheduler.delay(), Duration::from_millis(500));
    }
}
