//! Admission control for outbound feed requests
//!
//! `ConcurrencyGate` wraps a Tokio semaphore so that at most a fixed number of
//! feed requests are in flight at once. Acquisition is scoped: the slot is
//! returned when the `GatePermit` is dropped, on success and error paths alike.
//!
//! ```ignore
//! let gate = ConcurrencyGate::new(5);
//! let _permit = gate.acquire().await;
//! // request happens here; the slot frees when _permit goes out of scope
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of simultaneous feed requests
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Counting gate bounding concurrent feed requests
///
/// Waiters are not guaranteed to be admitted in arrival order.
#[derive(Debug)]
pub struct ConcurrencyGate {
    /// Semaphore holding the free slots
    semaphore: Arc<Semaphore>,
    /// Total slots
    capacity: usize,
    /// Slots currently held
    in_flight: Arc<AtomicUsize>,
    /// Highest number of slots held at once
    peak_in_flight: Arc<AtomicUsize>,
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}

impl ConcurrencyGate {
    /// Creates a gate with `capacity` slots
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");

        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Waits for a free slot
    ///
    /// The slot is released when the returned permit is dropped.
    pub async fn acquire(&self) -> GatePermit {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("gate semaphore is never closed");

        self.admit(permit)
    }

    /// Takes a slot if one is free, without waiting
    pub fn try_acquire(&self) -> Option<GatePermit> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        Some(self.admit(permit))
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> GatePermit {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        GatePermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of slots held at once since creation
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Number of free slots
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A held gate slot
///
/// Owned, so it can move into a spawned task. Dropping it frees the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_gate() {
        let gate = ConcurrencyGate::new(5);
        assert_eq!(gate.capacity(), 5);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.available_permits(), 5);
    }

    #[test]
    fn test_default_capacity_is_five() {
        assert_eq!(ConcurrencyGate::default().capacity(), DEFAULT_MAX_CONCURRENT);
        assert_eq!(DEFAULT_MAX_CONCURRENT, 5);
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn test_zero_capacity_panics() {
        ConcurrencyGate::new(0);
    }

    #[tokio::test]
    async fn test_acquire_releases_on_drop() {
        let gate = ConcurrencyGate::new(2);

        {
            let _first = gate.acquire().await;
            assert_eq!(gate.available_permits(), 1);
            assert_eq!(gate.in_flight(), 1);

            {
                let _second = gate.acquire().await;
                assert_eq!(gate.available_permits(), 0);
                assert_eq!(gate.in_flight(), 2);
            }

            assert_eq!(gate.available_permits(), 1);
            assert_eq!(gate.in_flight(), 1);
        }

        assert_eq!(gate.available_permits(), 2);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_try_acquire_fails_when_full() {
        let gate = ConcurrencyGate::new(1);

        let held = gate.try_acquire().expect("first slot should be free");
        assert!(gate.try_acquire().is_none());

        drop(held);
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let gate = Arc::new(ConcurrencyGate::new(1));
        let held = gate.acquire().await;

        let waiter_gate = Arc::clone(&gate);
        let waiter = tokio::spawn(async move {
            let _permit = waiter_gate.acquire().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "waiter should block while the slot is held");

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be admitted after release")
            .unwrap();
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_permit_released_when_task_errors() {
        let gate = Arc::new(ConcurrencyGate::new(1));

        let task_gate = Arc::clone(&gate);
        let result: Result<(), &str> = tokio::spawn(async move {
            let _permit = task_gate.acquire().await;
            Err("request failed")
        })
        .await
        .unwrap();

        assert!(result.is_err());
        assert_eq!(gate.available_permits(), 1);
        assert_eq!(gate.in_flight(), 0);
    }
}
