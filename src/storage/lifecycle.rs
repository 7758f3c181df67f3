//! Connection lifecycle shared by all backend adapters.
//!
//! [`Lifecycle`] owns an adapter's native client handle and drives the
//! UNINITIALIZED / CONNECTED / UNAVAILABLE state machine. Adapters describe
//! *how* to connect and *what* to call; the lifecycle decides *whether* to
//! call and turns unavailability into warnings plus neutral results.

use super::traits::ConnectionState;
use crate::observability::{BackendWarning, DiagnosticSink};
use crate::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum Slot<C> {
    Uninitialized,
    Connected(C),
    Unavailable { cause: String },
}

/// Three-state holder for a backend's native client.
///
/// `C` is the adapter's client handle. It is cloned out of the lock for each
/// call so no lock is held across network I/O.
pub struct Lifecycle<C> {
    backend: &'static str,
    slot: Mutex<Slot<C>>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl<C: Clone> Lifecycle<C> {
    /// Creates a lifecycle in the UNINITIALIZED state.
    #[must_use]
    pub fn new(backend: &'static str, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            backend,
            slot: Mutex::new(Slot::Uninitialized),
            diagnostics,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        match &*self.lock() {
            Slot::Uninitialized => ConnectionState::Uninitialized,
            Slot::Connected(_) => ConnectionState::Connected,
            Slot::Unavailable { .. } => ConnectionState::Unavailable,
        }
    }

    /// Explicit setup: connects unless already connected.
    ///
    /// Unlike lazy use, this retries an UNAVAILABLE backend.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors from `connect`.
    pub fn setup<F>(&self, connect: F) -> Result<()>
    where
        F: FnOnce() -> Result<C>,
    {
        if self.state() == ConnectionState::Connected {
            tracing::debug!(backend = self.backend, "setup skipped: already connected");
            return Ok(());
        }
        self.attempt("setup", connect).map(|_| ())
    }

    /// Returns the live client, connecting on first use.
    ///
    /// Returns `Ok(None)` (after emitting a warning) when the backend is
    /// UNAVAILABLE or the lazy connection attempt fails. An UNAVAILABLE backend
    /// is not retried here.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors from `connect`.
    pub fn acquire<F>(&self, operation: &str, connect: F) -> Result<Option<C>>
    where
        F: FnOnce() -> Result<C>,
    {
        let snapshot = match &*self.lock() {
            Slot::Connected(client) => return Ok(Some(client.clone())),
            Slot::Unavailable { cause } => Some(cause.clone()),
            Slot::Uninitialized => None,
        };

        match snapshot {
            Some(cause) => {
                self.warn(
                    operation,
                    format!("skipped because the backend is unavailable ({cause})"),
                );
                Ok(None)
            },
            None => self.attempt(operation, connect),
        }
    }

    /// Runs `call` against the live client, degrading on unavailability.
    ///
    /// `neutral` supplies the result returned when there is no client or the
    /// call fails with anything other than a configuration or validation
    /// error. A failed call does not change the state.
    ///
    /// # Errors
    ///
    /// Propagates configuration and validation errors.
    pub fn run<T, F, N, K>(&self, operation: &str, connect: K, neutral: N, call: F) -> Result<T>
    where
        K: FnOnce() -> Result<C>,
        N: FnOnce() -> T,
        F: FnOnce(&C) -> Result<T>,
    {
        let Some(client) = self.acquire(operation, connect)? else {
            return Ok(neutral());
        };

        match call(&client) {
            Ok(value) => Ok(value),
            Err(e @ (Error::Configuration(_) | Error::Validation { .. })) => Err(e),
            Err(e) => {
                self.warn(operation, format!("call failed, returning a neutral result: {e}"));
                Ok(neutral())
            },
        }
    }

    /// Drops the client and returns to UNINITIALIZED.
    ///
    /// Returns true if a client was held.
    pub fn release(&self) -> bool {
        let previous = std::mem::replace(&mut *self.lock(), Slot::Uninitialized);
        let held = matches!(previous, Slot::Connected(_));
        if held {
            tracing::debug!(backend = self.backend, "client released");
        }
        held
    }

    /// Reports a degraded call to the diagnostic sink.
    pub fn warn(&self, operation: &str, message: String) {
        metrics::counter!(
            "ragstore_degraded_operations_total",
            "backend" => self.backend,
            "operation" => operation.to_string()
        )
        .increment(1);
        self.diagnostics.warn(BackendWarning {
            backend: self.backend.to_string(),
            operation: operation.to_string(),
            message,
        });
    }

    fn attempt<F>(&self, operation: &str, connect: F) -> Result<Option<C>>
    where
        F: FnOnce() -> Result<C>,
    {
        match connect() {
            Ok(client) => {
                *self.lock() = Slot::Connected(client.clone());
                tracing::debug!(backend = self.backend, operation, "backend connected");
                Ok(Some(client))
            },
            Err(e @ Error::Configuration(_)) => Err(e),
            Err(e) => {
                let cause = e.to_string();
                *self.lock() = Slot::Unavailable {
                    cause: cause.clone(),
                };
                self.warn(
                    operation,
                    format!("connection failed, backend marked unavailable: {cause}"),
                );
                Ok(None)
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<C>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::observability::RecordingDiagnostics;
    use std::cell::Cell;

    fn lifecycle() -> (Lifecycle<u32>, Arc<RecordingDiagnostics>) {
        let sink = Arc::new(RecordingDiagnostics::new());
        (Lifecycle::new("test", sink.clone()), sink)
    }

    fn refused() -> Result<u32> {
        Err(Error::BackendUnavailable {
            backend: "test".to_string(),
            operation: "connect".to_string(),
            cause: "connection refused".to_string(),
        })
    }

    #[test]
    fn test_starts_uninitialized() {
        let (lc, sink) = lifecycle();
        assert_eq!(lc.state(), ConnectionState::Uninitialized);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_lazy_acquire_connects_once() {
        let (lc, _) = lifecycle();
        let calls = Cell::new(0);
        let connect = || {
            calls.set(calls.get() + 1);
            Ok(7)
        };
        assert_eq!(lc.acquire("write", connect).expect("acquire"), Some(7));
        assert_eq!(lc.acquire("list", || Ok(8)).expect("acquire"), Some(7));
        assert_eq!(calls.get(), 1);
        assert_eq!(lc.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_failed_connect_marks_unavailable_and_warns() {
        let (lc, sink) = lifecycle();
        assert_eq!(lc.acquire("write", refused).expect("acquire"), None);
        assert_eq!(lc.state(), ConnectionState::Unavailable);

        let warnings = sink.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].operation, "write");
        assert!(warnings[0].message.contains("connection refused"));
    }

    #[test]
    fn test_unavailable_is_not_retried_lazily() {
        let (lc, sink) = lifecycle();
        lc.acquire("setup", refused).expect("acquire");
        let retried = Cell::new(false);
        let result = lc
            .acquire("list", || {
                retried.set(true);
                Ok(1)
            })
            .expect("acquire");
        assert_eq!(result, None);
        assert!(!retried.get());
        assert_eq!(sink.warnings_for("list").len(), 1);
    }

    #[test]
    fn test_explicit_setup_recovers_from_unavailable() {
        let (lc, _) = lifecycle();
        lc.setup(refused).expect("setup degrades");
        assert_eq!(lc.state(), ConnectionState::Unavailable);
        lc.setup(|| Ok(3)).expect("setup");
        assert_eq!(lc.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_setup_is_idempotent_when_connected() {
        let (lc, _) = lifecycle();
        lc.setup(|| Ok(1)).expect("setup");
        let reconnected = Cell::new(false);
        lc.setup(|| {
            reconnected.set(true);
            Ok(2)
        })
        .expect("setup");
        assert!(!reconnected.get());
    }

    #[test]
    fn test_configuration_errors_propagate() {
        let (lc, sink) = lifecycle();
        let err = lc
            .setup(|| Err(Error::Configuration("missing url".to_string())))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(lc.state(), ConnectionState::Uninitialized);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_run_degrades_failed_call_without_state_change() {
        let (lc, sink) = lifecycle();
        let value = lc
            .run("list", || Ok(1), Vec::<u32>::new, |_| refused().map(|v| vec![v]))
            .expect("run");
        assert!(value.is_empty());
        assert_eq!(lc.state(), ConnectionState::Connected);
        assert_eq!(sink.warnings_for("list").len(), 1);
    }

    #[test]
    fn test_run_propagates_validation() {
        let (lc, _) = lifecycle();
        let err = lc
            .run(
                "write",
                || Ok(1),
                || (),
                |_| {
                    Err(Error::Validation {
                        position: 2,
                        reason: "bad".to_string(),
                    })
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation { position: 2, .. }));
    }

    #[test]
    fn test_release_from_any_state() {
        let (lc, _) = lifecycle();
        assert!(!lc.release());
        lc.setup(|| Ok(1)).expect("setup");
        assert!(lc.release());
        assert!(!lc.release());
        lc.setup(refused).expect("setup");
        assert!(!lc.release());
        assert_eq!(lc.state(), ConnectionState::Uninitialized);
    }
}
