//! Long-lived watch on the service definitions
//!
//! Two background tasks back a subscription:
//! - the driver keeps a watch open on the definitions path, retrying with a
//!   [`Backoff`] policy after every failure
//! - the relay turns watch events into change signals
//!
//! The signal channel holds a single slot. Any number of events arriving
//! before the consumer looks collapse into one pending signal; the consumer
//! is expected to reload everything when it sees it.

use crate::backoff::{Backoff, ExponentialBackoff};
use crate::store::{CoordinationStore, WatchEvent};
use crate::{CoreError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

/// Observer for failed watch attempts: the error and the delay before the
/// next attempt
pub type ErrorNotify = Box<dyn Fn(&CoreError, Duration) + Send + Sync>;

const EVENT_BUFFER: usize = 16;

/// Receiving end of a definitions watch
pub struct ChangeFeed {
    signal: mpsc::Receiver<()>,
    failure: Option<oneshot::Receiver<CoreError>>,
}

impl ChangeFeed {
    /// Wait for the next change signal.
    ///
    /// Returns an error once the watch has failed permanently; the feed
    /// yields nothing after that.
    pub async fn changed(&mut self) -> Result<()> {
        let Some(failure) = self.failure.as_mut() else {
            return Err(CoreError::WatchAborted);
        };

        tokio::select! {
            biased;
            failure = failure => {
                self.failure = None;
                Err(failure.unwrap_or(CoreError::WatchAborted))
            }
            signal = self.signal.recv() => match signal {
                Some(()) => Ok(()),
                None => Err(CoreError::WatchAborted),
            },
        }
    }
}

/// Builder and owner of the watch tasks
pub struct WatchSubscriber {
    store: Arc<dyn CoordinationStore>,
    path: String,
    policy: Box<dyn Backoff>,
    notify: ErrorNotify,
}

impl WatchSubscriber {
    pub fn new(store: Arc<dyn CoordinationStore>, path: impl Into<String>) -> Self {
        let path = path.into();
        let log_path = path.clone();
        Self {
            store,
            path,
            policy: Box::new(ExponentialBackoff::default()),
            notify: Box::new(move |e, delay| {
                warn!(servicepath = %log_path, error = %e, retry_in = ?delay, "etcd watch failed");
            }),
        }
    }

    pub fn with_backoff(mut self, policy: impl Backoff + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replace the failure observer
    pub fn on_error(mut self, notify: impl Fn(&CoreError, Duration) + Send + Sync + 'static) -> Self {
        self.notify = Box::new(notify);
        self
    }

    /// Start the background tasks and return immediately
    pub fn spawn(self) -> ChangeFeed {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (signal_tx, signal_rx) = mpsc::channel(1);
        let (failure_tx, failure_rx) = oneshot::channel();

        tokio::spawn(self.drive(event_tx, failure_tx));
        tokio::spawn(relay(event_rx, signal_tx));

        ChangeFeed {
            signal: signal_rx,
            failure: Some(failure_rx),
        }
    }

    async fn drive(
        mut self,
        events: mpsc::Sender<WatchEvent>,
        failure: oneshot::Sender<CoreError>,
    ) {
        debug!(servicepath = %self.path, "starting definitions watch");
        let mut next_index = None;

        loop {
            match self.store.watch(&self.path, true, next_index).await {
                Ok(event) => {
                    self.policy.reset();
                    next_index = Some(event.modified_index + 1);
                    if events.send(event).await.is_err() {
                        debug!(servicepath = %self.path, "change feed dropped, stopping watch");
                        return;
                    }
                }
                Err(e) => {
                    // the index may have been compacted away; resume from now
                    next_index = None;
                    match self.policy.next_backoff() {
                        Some(delay) => {
                            (self.notify)(&e, delay);
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            error!(
                                servicepath = %self.path,
                                error = %e,
                                "could not recover communications with etcd, watch failed"
                            );
                            let _ = failure.send(CoreError::WatchExhausted {
                                path: self.path.clone(),
                                last_error: e.to_string(),
                            });
                            return;
                        }
                    }
                }
            }
        }
    }
}

async fn relay(mut events: mpsc::Receiver<WatchEvent>, signal: mpsc::Sender<()>) {
    while let Some(event) = events.recv().await {
        debug!(key = %event.key, action = %event.action, index = event.modified_index, "definitions changed");
        if let Err(mpsc::error::TrySendError::Closed(())) = signal.try_send(()) {
            return;
        }
    }
}
