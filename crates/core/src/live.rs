//! Single-owner coordinator for reactively assembled state.
//!
//! A [`LiveState`] owns one background coordinator task. Sources never touch the state
//! directly: they send typed patches over an unbounded channel, and the coordinator applies
//! each one to the latest snapshot in arrival order and publishes the result on a `watch`
//! channel.
//!
//! ```text
//! source task ──┐
//! source task ──┼── mpsc ──▶ coordinator (owns S) ──▶ watch ──▶ current() / subscribe()
//! caller set() ─┘                     │
//!                                     └──▶ observer callback (every transition)
//! ```
//!
//! Dropping the `LiveState` aborts any source tasks still in flight; the coordinator exits
//! once the last sender is gone.

use crate::error::SourceError;
use crate::patch::{Patch, SourceKind};
use crate::{RegistrationError, RegistrationResult};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;

/// A state transition or notable occurrence, passed to the observer.
#[derive(Debug)]
pub enum StateEvent<'a, S> {
    /// A source patch was merged.
    Applied { source: SourceKind, state: &'a S },
    /// The caller replaced or modified the state.
    Replaced { state: &'a S },
    /// A source fetch failed; its merge never fires.
    SourceFailed {
        source: SourceKind,
        error: &'a SourceError,
    },
    /// A source returned data that could not be used; state is unchanged.
    Anomaly { source: SourceKind, message: &'a str },
}

/// Callback invoked by the coordinator for every [`StateEvent`].
pub type Observer<S> = Arc<dyn Fn(&StateEvent<'_, S>) + Send + Sync>;

type Modifier<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Command<S, P> {
    Apply(P),
    Failed(SourceKind, SourceError),
    Anomaly(SourceKind, String),
    Replace(S),
    Modify(Modifier<S>),
    Flush(oneshot::Sender<S>),
}

/// Handle given to source tasks for reporting into the coordinator.
pub struct PatchSender<S, P> {
    tx: mpsc::UnboundedSender<Command<S, P>>,
}

impl<S, P> Clone for PatchSender<S, P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S, P> PatchSender<S, P>
where
    S: Send + 'static,
    P: Patch<S>,
{
    pub fn apply(&self, patch: P) {
        let source = patch.source();
        if self.tx.send(Command::Apply(patch)).is_err() {
            tracing::debug!(%source, "coordinator stopped, dropping patch");
        }
    }

    /// Report a failed fetch. Absent resources are routine for patients known only to the
    /// offline queue and log at debug.
    pub fn failed(&self, source: SourceKind, error: SourceError) {
        if error.is_not_found() {
            tracing::debug!(%source, "source has no data: {error}");
        } else {
            tracing::warn!(%source, "source fetch failed: {error}");
        }
        let _ = self.tx.send(Command::Failed(source, error));
    }

    pub fn anomaly(&self, source: SourceKind, message: impl Into<String>) {
        let _ = self.tx.send(Command::Anomaly(source, message.into()));
    }
}

/// Live, reactively updated state with a setter.
pub struct LiveState<S, P> {
    sender: PatchSender<S, P>,
    snapshot: watch::Receiver<S>,
    tasks: JoinSet<()>,
}

impl<S, P> LiveState<S, P>
where
    S: Clone + Send + Sync + 'static,
    P: Patch<S>,
{
    /// Start a coordinator seeded with `initial`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(initial: S, observer: Option<Observer<S>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (publisher, snapshot) = watch::channel(initial.clone());
        tokio::spawn(coordinate(initial, rx, publisher, observer));

        Self {
            sender: PatchSender { tx },
            snapshot,
            tasks: JoinSet::new(),
        }
    }

    /// The latest merged snapshot.
    pub fn current(&self) -> S {
        self.snapshot.borrow().clone()
    }

    /// Receiver that is notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.snapshot.clone()
    }

    pub fn sender(&self) -> PatchSender<S, P> {
        self.sender.clone()
    }

    /// Replace the whole state.
    pub fn set(&self, state: S) -> RegistrationResult<()> {
        self.sender
            .tx
            .send(Command::Replace(state))
            .map_err(|_| RegistrationError::CoordinatorClosed)
    }

    /// Modify the latest state in place.
    pub fn update(&self, modify: impl FnOnce(&mut S) + Send + 'static) -> RegistrationResult<()> {
        self.sender
            .tx
            .send(Command::Modify(Box::new(modify)))
            .map_err(|_| RegistrationError::CoordinatorClosed)
    }

    /// Run a source task whose lifetime is tied to this handle.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Wait for every spawned source task, then return the state once their patches have
    /// been merged.
    pub async fn settled(&mut self) -> RegistrationResult<S> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                tracing::warn!("source task ended abnormally: {err}");
            }
        }

        let (reply, response) = oneshot::channel();
        self.sender
            .tx
            .send(Command::Flush(reply))
            .map_err(|_| RegistrationError::CoordinatorClosed)?;
        response
            .await
            .map_err(|_| RegistrationError::CoordinatorClosed)
    }
}

fn notify<S>(observer: &Option<Observer<S>>, event: StateEvent<'_, S>) {
    if let Some(observer) = observer {
        observer(&event);
    }
}

async fn coordinate<S, P>(
    mut state: S,
    mut commands: mpsc::UnboundedReceiver<Command<S, P>>,
    publisher: watch::Sender<S>,
    observer: Option<Observer<S>>,
) where
    S: Clone + Send + Sync + 'static,
    P: Patch<S>,
{
    while let Some(command) = commands.recv().await {
        match command {
            Command::Apply(patch) => {
                let source = patch.source();
                patch.apply(&mut state);
                tracing::debug!(%source, "merged patch");
                publisher.send_replace(state.clone());
                notify(&observer, StateEvent::Applied {
                    source,
                    state: &state,
                });
            }
            Command::Replace(next) => {
                state = next;
                publisher.send_replace(state.clone());
                notify(&observer, StateEvent::Replaced { state: &state });
            }
            Command::Modify(modify) => {
                modify(&mut state);
                publisher.send_replace(state.clone());
                notify(&observer, StateEvent::Replaced { state: &state });
            }
            Command::Failed(source, error) => {
                notify(&observer, StateEvent::SourceFailed {
                    source,
                    error: &error,
                });
            }
            Command::Anomaly(source, message) => {
                notify(&observer, StateEvent::Anomaly {
                    source,
                    message: &message,
                });
            }
            Command::Flush(reply) => {
                let _ = reply.send(state.clone());
            }
        }
    }
}
