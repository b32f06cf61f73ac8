//! Completion coordinator
//!
//! A reusable fan-out/fan-in barrier. Callers register units of work, each
//! unit gets a [`Completion`] handle, and a single completion handler fires
//! once registration is closed with [`Coordinator::run`] and every registered
//! unit has reported back.
//!
//! Results are delivered to the handler as one `Vec<Option<T>>`:
//!
//! - in *ordered* mode, in registration order (slot `i` belongs to the
//!   `i`-th registered unit), whatever order the units finished in;
//! - otherwise, in completion order.
//!
//! A `None` marks a unit whose [`Completion`] was dropped without being
//! completed (for example because the task holding it panicked). Such a unit
//! still counts down, so the barrier cannot hang on it.
//!
//! Running twice or completing the same unit twice is ruled out by
//! ownership, since both [`Coordinator::run`] and [`Completion::complete`]
//! consume their receiver:
//!
//! ```compile_fail
//! use bibcheck_core::coordinator::Coordinator;
//!
//! let coordinator: Coordinator<()> = Coordinator::new(|_| {});
//! coordinator.run();
//! coordinator.run();
//! ```
//!
//! ```compile_fail
//! use bibcheck_core::coordinator::Coordinator;
//!
//! let coordinator: Coordinator<u32> = Coordinator::new(|_| {});
//! let unit = coordinator.register();
//! unit.complete(1);
//! unit.complete(2);
//! ```
//!
//! # Example
//!
//! ```rust
//! use bibcheck_core::coordinator::Coordinator;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (coordinator, settled) = Coordinator::channel();
//! let coordinator = coordinator.ordered();
//!
//! for delay in [30u64, 10, 20] {
//!     let unit = coordinator.register();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
//!         unit.complete(delay);
//!     });
//! }
//! coordinator.run();
//!
//! let results = settled.await.unwrap();
//! assert_eq!(results, vec![Some(30), Some(10), Some(20)]);
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::error::ValidationError;

type OnComplete<T> = Box<dyn FnOnce(Vec<Option<T>>) + Send>;

struct State<T> {
    pending: usize,
    closed: bool,
    ordered: bool,
    /// Results by registration index
    slots: Vec<Option<T>>,
    /// Registration indices in completion order
    arrivals: Vec<usize>,
    on_complete: Option<OnComplete<T>>,
}

impl<T> State<T> {
    /// Take the handler and its payload if the barrier is satisfied
    fn take_if_done(&mut self) -> Option<(OnComplete<T>, Vec<Option<T>>)> {
        if !self.closed || self.pending > 0 {
            return None;
        }
        let on_complete = self.on_complete.take()?;

        let mut slots = std::mem::take(&mut self.slots);
        let payload = if self.ordered {
            slots
        } else {
            self.arrivals.iter().map(|&i| slots[i].take()).collect()
        };

        Some((on_complete, payload))
    }
}

type Shared<T> = Arc<Mutex<State<T>>>;

fn lock<T>(shared: &Shared<T>) -> MutexGuard<'_, State<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn settle<T>(shared: &Shared<T>, index: usize, value: Option<T>) {
    let fire = {
        let mut state = lock(shared);
        state.slots[index] = value;
        state.arrivals.push(index);
        state.pending -= 1;
        state.take_if_done()
    };

    // The handler runs outside the lock so it may freely touch other state.
    if let Some((on_complete, payload)) = fire {
        on_complete(payload);
    }
}

/// A fan-out/fan-in barrier with a single completion handler
pub struct Coordinator<T> {
    shared: Shared<T>,
}

impl<T> std::fmt::Debug for Coordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.shared);
        f.debug_struct("Coordinator")
            .field("pending", &state.pending)
            .field("registered", &state.slots.len())
            .field("ordered", &state.ordered)
            .finish()
    }
}

impl<T: Send + 'static> Coordinator<T> {
    /// Create a coordinator that invokes `on_complete` exactly once
    pub fn new<F>(on_complete: F) -> Self
    where
        F: FnOnce(Vec<Option<T>>) + Send + 'static,
    {
        Self {
            shared: Arc::new(Mutex::new(State {
                pending: 0,
                closed: false,
                ordered: false,
                slots: Vec::new(),
                arrivals: Vec::new(),
                on_complete: Some(Box::new(on_complete)),
            })),
        }
    }

    /// Create a coordinator whose completion is delivered through a future
    pub fn channel() -> (Self, Settled<T>) {
        let (tx, rx) = oneshot::channel();
        let coordinator = Self::new(move |results| {
            // The receiver may have given up waiting; nothing to do then.
            let _ = tx.send(results);
        });
        (coordinator, Settled { rx })
    }

    /// Deliver results in registration order instead of completion order
    pub fn set_ordered(&mut self, ordered: bool) {
        lock(&self.shared).ordered = ordered;
    }

    /// Enable ordered mode (builder pattern)
    pub fn ordered(mut self) -> Self {
        self.set_ordered(true);
        self
    }

    /// Register a unit of work
    pub fn register(&self) -> Completion<T> {
        let mut state = lock(&self.shared);
        let index = state.slots.len();
        state.slots.push(None);
        state.pending += 1;

        Completion {
            shared: Some(Arc::clone(&self.shared)),
            index,
        }
    }

    /// Register a unit of work as a callback
    ///
    /// Invoking the returned callback runs `f` and completes the unit with
    /// its return value.
    pub fn wrap<A, F>(&self, f: F) -> impl FnOnce(A) + Send + 'static
    where
        A: 'static,
        F: FnOnce(A) -> T + Send + 'static,
    {
        let completion = self.register();
        move |arg| completion.complete(f(arg))
    }

    /// Number of registered units that have not completed yet
    pub fn pending(&self) -> usize {
        lock(&self.shared).pending
    }

    /// Close registration
    ///
    /// If nothing is outstanding the handler fires immediately, on the
    /// calling thread. Otherwise it fires when the last unit completes.
    pub fn run(self) {
        let fire = {
            let mut state = lock(&self.shared);
            state.closed = true;
            state.take_if_done()
        };

        if let Some((on_complete, payload)) = fire {
            on_complete(payload);
        }
    }
}

/// Handle for one registered unit of work
#[must_use = "a unit only counts as done once it is completed"]
pub struct Completion<T> {
    shared: Option<Shared<T>>,
    index: usize,
}

impl<T> Completion<T> {
    /// Registration index of this unit
    pub fn index(&self) -> usize {
        self.index
    }

    /// Report the unit's result
    pub fn complete(mut self, value: T) {
        if let Some(shared) = self.shared.take() {
            settle(&shared, self.index, Some(value));
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            tracing::warn!(unit = self.index, "Completion dropped without a result");
            settle(&shared, self.index, None);
        }
    }
}

/// Future resolving to a coordinator's results
///
/// Resolves to an error if the coordinator and all of its units were dropped
/// without the barrier ever being satisfied.
#[must_use = "futures do nothing unless awaited"]
pub struct Settled<T> {
    rx: oneshot::Receiver<Vec<Option<T>>>,
}

impl<T> Future for Settled<T> {
    type Output = Result<Vec<Option<T>>, ValidationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|result| {
            result.map_err(|_| {
                ValidationError::Abandoned("coordinator dropped before completion".to_string())
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn recording<T: Send + 'static>() -> (Arc<Mutex<Vec<Vec<Option<T>>>>>, impl FnOnce(Vec<Option<T>>) + Send + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        (calls, move |results| sink.lock().unwrap().push(results))
    }

    #[test]
    fn test_empty_coordinator_fires_synchronously_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let coordinator: Coordinator<()> = Coordinator::new(move |results| {
            assert!(results.is_empty());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        coordinator.run();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_does_not_fire_before_run() {
        let (calls, on_complete) = recording::<u32>();
        let coordinator = Coordinator::new(on_complete);

        coordinator.register().complete(1);
        coordinator.register().complete(2);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(coordinator.pending(), 0);

        coordinator.run();
        assert_eq!(*calls.lock().unwrap(), vec![vec![Some(1), Some(2)]]);
    }

    #[test]
    fn test_fires_when_last_unit_completes() {
        let (calls, on_complete) = recording::<&str>();
        let coordinator = Coordinator::new(on_complete);

        let first = coordinator.register();
        let second = coordinator.register();
        coordinator.run();

        first.complete("a");
        assert!(calls.lock().unwrap().is_empty());

        second.complete("b");
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_ordered_mode_uses_registration_order() {
        let (calls, on_complete) = recording::<u32>();
        let coordinator = Coordinator::new(on_complete).ordered();

        let units: Vec<_> = (0..3).map(|_| coordinator.register()).collect();
        coordinator.run();
        for (value, unit) in units.into_iter().enumerate().rev() {
            unit.complete(value as u32);
        }

        assert_eq!(*calls.lock().unwrap(), vec![vec![Some(0), Some(1), Some(2)]]);
    }

    #[test]
    fn test_unordered_mode_uses_completion_order() {
        let (calls, on_complete) = recording::<u32>();
        let coordinator = Coordinator::new(on_complete);

        let units: Vec<_> = (0..3).map(|_| coordinator.register()).collect();
        coordinator.run();
        for (value, unit) in units.into_iter().enumerate().rev() {
            unit.complete(value as u32);
        }

        assert_eq!(*calls.lock().unwrap(), vec![vec![Some(2), Some(1), Some(0)]]);
    }

    #[test]
    fn test_dropped_completion_counts_as_abandoned() {
        let (calls, on_complete) = recording::<u32>();
        let coordinator = Coordinator::new(on_complete).ordered();

        let kept = coordinator.register();
        let dropped = coordinator.register();
        coordinator.run();

        drop(dropped);
        kept.complete(7);

        assert_eq!(*calls.lock().unwrap(), vec![vec![Some(7), None]]);
    }

    #[test]
    fn test_wrap_completes_with_callback_result() {
        let (calls, on_complete) = recording::<usize>();
        let coordinator = Coordinator::new(on_complete);

        let callback = coordinator.wrap(|word: String| word.len());
        coordinator.run();
        callback("hello".to_string());

        assert_eq!(*calls.lock().unwrap(), vec![vec![Some(5)]]);
    }

    #[tokio::test]
    async fn test_channel_with_concurrent_tasks() {
        let (coordinator, settled) = Coordinator::channel();
        let coordinator = coordinator.ordered();

        for i in 0..8u64 {
            let unit = coordinator.register();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(40 - i * 5)).await;
                unit.complete(i);
            });
        }
        coordinator.run();

        let results = settled.await.unwrap();
        let expected: Vec<_> = (0..8u64).map(Some).collect();
        assert_eq!(results, expected);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_hang() {
        let (coordinator, settled) = Coordinator::<u32>::channel();

        let unit = coordinator.register();
        let handle = tokio::spawn(async move {
            let _unit = unit;
            panic!("check crashed");
        });
        coordinator.run();

        assert!(handle.await.is_err());
        assert_eq!(settled.await.unwrap(), vec![None]);
    }
}
