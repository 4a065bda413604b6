use crate::domain::state::{Event, OrchestratorState, reduce};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Shared dispose flag of one orchestrator.
///
/// Clone it to cancel from another task while an orchestrator call is
/// awaiting the gateway.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// A token that has not been cancelled yet.
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    /// Flags every clone as cancelled and wakes pending `run` calls.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    /// Whether `cancel` was called on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Runs `fut` unless the token is cancelled first. `None` means cancelled;
    /// the future is dropped at that point.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            output = fut => Some(output),
        }
    }
}

/// Owns the state of one orchestrator and fans snapshots out to
/// subscribers.
///
/// A transition is reduced and stored before anyone sees it; each
/// subscriber gets every snapshot in order.
pub struct StatePublisher {
    state: OrchestratorState,
    subscribers: Vec<mpsc::UnboundedSender<OrchestratorState>>,
    cancel: CancelToken,
}

impl StatePublisher {
    /// Starts from `initial` with no subscribers.
    pub fn new(initial: OrchestratorState) -> Self {
        Self {
            state: initial,
            subscribers: Vec::new(),
            cancel: CancelToken::new(),
        }
    }

    /// The last snapshot that was published.
    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    /// A clone of the token that `dispose` cancels.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// True once `dispose` ran; nothing is published after that.
    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// New subscribers immediately receive the current snapshot.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<OrchestratorState> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.is_disposed() && tx.send(self.state.clone()).is_ok() {
            self.subscribers.push(tx);
        }
        rx
    }

    /// Applies `event` and publishes the result. Returns whether the state
    /// changed. Rejected transitions and events after dispose are dropped.
    pub fn apply(&mut self, event: Event) -> bool {
        if self.is_disposed() {
            debug!(?event, "Orchestrator disposed, dropping event");
            return false;
        }
        match reduce(&self.state, event) {
            Ok(next) => {
                debug!(from = %self.state.phase, to = %next.phase, "State transition");
                self.state = next;
                let snapshot = &self.state;
                self.subscribers
                    .retain(|subscriber| subscriber.send(snapshot.clone()).is_ok());
                true
            }
            Err(e) => {
                warn!(error = %e, "Ignoring state event");
                false
            }
        }
    }

    /// Cancels outstanding work and closes every subscription.
    pub fn dispose(&mut self) {
        self.cancel.cancel();
        self.subscribers.clear();
    }
}
