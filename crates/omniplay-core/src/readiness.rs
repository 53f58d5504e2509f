//! Readiness gate
//!
//! Every adapter command waits on one shared readiness signal. Any number of
//! callers can queue behind it; once settled it never changes again.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Adapter readiness state
#[derive(Debug, Clone, PartialEq)]
pub enum ReadinessState {
    /// Backend assets are loading
    Loading,
    /// The backend player is being constructed
    Constructing,
    /// The backend accepts commands
    Ready,
    /// Loading or construction failed; the adapter must be recreated
    Failed(Error),
}

impl ReadinessState {
    /// Ready and Failed are terminal
    pub fn is_settled(&self) -> bool {
        matches!(self, ReadinessState::Ready | ReadinessState::Failed(_))
    }

    pub fn can_transition_to(&self, next: &ReadinessState) -> bool {
        use ReadinessState::*;
        matches!(
            (self, next),
            (Loading, Constructing)
                | (Loading, Ready)
                | (Constructing, Ready)
                | (Loading, Failed(_))
                | (Constructing, Failed(_))
        )
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessState::Loading => write!(f, "loading"),
            ReadinessState::Constructing => write!(f, "constructing"),
            ReadinessState::Ready => write!(f, "ready"),
            ReadinessState::Failed(_) => write!(f, "failed"),
        }
    }
}

/// Asynchronous barrier resolved once per adapter
///
/// Callers queue in arrival order and are released in that order when the
/// gate settles.
pub struct ReadinessGate {
    inner: Mutex<GateInner>,
}

struct GateInner {
    state: ReadinessState,
    waiters: VecDeque<oneshot::Sender<Result<()>>>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: ReadinessState::Loading,
                waiters: VecDeque::new(),
            }),
        }
    }

    pub fn state(&self) -> ReadinessState {
        self.lock().state.clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.lock().state, ReadinessState::Ready)
    }

    /// Loading → Constructing
    pub fn constructing(&self) -> bool {
        self.transition(ReadinessState::Constructing)
    }

    /// → Ready; false if already settled
    pub fn resolve(&self) -> bool {
        self.transition(ReadinessState::Ready)
    }

    /// → Failed; false if already settled
    pub fn fail(&self, err: Error) -> bool {
        self.transition(ReadinessState::Failed(err))
    }

    fn transition(&self, next: ReadinessState) -> bool {
        let (from, released) = {
            let mut inner = self.lock();
            if !inner.state.can_transition_to(&next) {
                debug!(state = %inner.state, to = %next, "Ignored readiness transition");
                return false;
            }
            let from = std::mem::replace(&mut inner.state, next.clone());
            let released = if next.is_settled() {
                std::mem::take(&mut inner.waiters)
            } else {
                VecDeque::new()
            };
            (from, released)
        };

        match &next {
            ReadinessState::Failed(err) => warn!(from = %from, error = %err, "Readiness failed"),
            _ => debug!(from = %from, to = %next, waiters = released.len(), "Readiness transition"),
        }

        let outcome = settled_result(&next);
        for waiter in released {
            // a dropped receiver means its caller went away
            let _ = waiter.send(outcome.clone());
        }
        true
    }

    /// Wait until settled; `Ok` when ready, the failure otherwise
    pub async fn wait(&self) -> Result<()> {
        let rx = {
            let mut inner = self.lock();
            if inner.state.is_settled() {
                return settled_result(&inner.state);
            }
            let (tx, rx) = oneshot::channel();
            inner.waiters.push_back(tx);
            rx
        };

        rx.await
            .map_err(|_| Error::Internal("readiness gate dropped".into()))?
    }

    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn settled_result(state: &ReadinessState) -> Result<()> {
    match state {
        ReadinessState::Failed(err) => Err(err.clone()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_state_transitions() {
        use ReadinessState::*;
        assert!(Loading.can_transition_to(&Constructing));
        assert!(Constructing.can_transition_to(&Ready));
        assert!(Constructing.can_transition_to(&Failed(Error::load("x"))));
        assert!(!Ready.can_transition_to(&Loading));
        assert!(!Failed(Error::load("x")).can_transition_to(&Ready));
        assert!(!Constructing.can_transition_to(&Loading));
    }

    #[tokio::test]
    async fn test_waiters_resolve_together() {
        let gate = Arc::new(ReadinessGate::new());
        let a = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait().await }
        });
        let b = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait().await }
        });
        tokio::task::yield_now().await;

        assert!(gate.constructing());
        assert!(gate.resolve());
        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());

        // terminal
        assert!(!gate.fail(Error::load("late")));
        assert!(gate.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_failure_propagates_to_every_waiter() {
        let gate = ReadinessGate::new();
        assert!(gate.fail(Error::load("boom")));
        assert_eq!(gate.wait().await, Err(Error::load("boom")));
        assert_eq!(gate.wait().await, Err(Error::load("boom")));
        assert!(!gate.resolve());
    }

    #[tokio::test]
    async fn test_waiters_released_in_arrival_order() {
        let gate = Arc::new(ReadinessGate::new());
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let gate = gate.clone();
                let order = order.clone();
                tokio::spawn(async move {
                    gate.wait().await.unwrap();
                    order.lock().unwrap().push(i);
                })
            })
            .collect();
        tokio::task::yield_now().await;

        assert!(gate.resolve());
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), (0..32).collect::<Vec<_>>());
    }
}
