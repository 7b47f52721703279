use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::Notification;
use super::NotificationRegistry;
use crate::network::Endpoints;
use crate::network::Transport;
use crate::utils::async_task::sleep_or_cancelled;
use crate::Result;

/// Lifecycle of a [`NotificationPoller`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Between two requests
    Idle,
    /// Waiting on the long-poll answer
    Polling,
    /// Cancelled, terminal
    Stopped,
}

/// Outcome of one long-poll round
#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// No namespace is registered, nothing was sent
    NothingToWatch,
    /// Server answered 304
    Unchanged,
    /// Names that were signalled
    Changed(Vec<String>),
}

/// The single long-poll loop covering every registered namespace
pub struct NotificationPoller {
    transport: Arc<dyn Transport>,
    endpoints: Arc<Endpoints>,
    registry: Arc<NotificationRegistry>,
    long_poll_timeout: Duration,
    retry_delay: Duration,
    state: Mutex<PollerState>,
}

impl NotificationPoller {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: Arc<Endpoints>,
        registry: Arc<NotificationRegistry>,
        long_poll_timeout: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            transport,
            endpoints,
            registry,
            long_poll_timeout,
            retry_delay,
            state: Mutex::new(PollerState::Idle),
        }
    }

    pub fn state(&self) -> PollerState {
        *self.state.lock()
    }

    fn set_state(
        &self,
        state: PollerState,
    ) {
        *self.state.lock() = state;
    }

    /// Polls until `token` is cancelled.
    ///
    /// A 304 or an answer naming registered namespaces loops immediately.
    /// Everything else waits the fixed retry delay: transport and decode
    /// failures, an empty registry, and a 200 that signals nothing.
    pub async fn run(
        &self,
        token: CancellationToken,
    ) -> Result<()> {
        info!("notification poller started");

        loop {
            let outcome = tokio::select! {
                _ = token.cancelled() => break,
                outcome = self.poll_once() => outcome,
            };
            self.set_state(PollerState::Idle);

            let wait = match outcome {
                Ok(PollOutcome::Unchanged) => {
                    trace!("long-poll answered 304");
                    None
                }
                Ok(PollOutcome::Changed(names)) if names.is_empty() => {
                    debug!("long-poll answer named no registered namespace, retrying in {:?}", self.retry_delay);
                    Some(self.retry_delay)
                }
                Ok(PollOutcome::Changed(names)) => {
                    debug!(?names, "namespaces notified");
                    None
                }
                Ok(PollOutcome::NothingToWatch) => Some(self.retry_delay),
                Err(e) if e.is_retryable() => {
                    warn!("config service unreachable, retrying in {:?}: {}", self.retry_delay, e);
                    Some(self.retry_delay)
                }
                Err(e) => {
                    warn!("long-poll answer rejected, retrying in {:?}: {:?}", self.retry_delay, e);
                    Some(self.retry_delay)
                }
            };

            if let Some(delay) = wait {
                if !sleep_or_cancelled(delay, &token).await {
                    break;
                }
            }
        }

        self.set_state(PollerState::Stopped);
        info!("notification poller stopped");
        Ok(())
    }

    /// Issues one long-poll request and applies its answer.
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let notifications = self.registry.notifications();
        if notifications.is_empty() {
            return Ok(PollOutcome::NothingToWatch);
        }

        let url = self.endpoints.notifications_url(&notifications)?;
        self.set_state(PollerState::Polling);

        let body = match self.transport.get(&url, self.long_poll_timeout).await {
            Ok(body) => body,
            Err(e) if e.is_not_modified() => return Ok(PollOutcome::Unchanged),
            Err(e) => return Err(e),
        };

        let updates: Vec<Notification> = serde_json::from_slice(&body)?;
        Ok(PollOutcome::Changed(self.registry.apply(&updates)))
    }
}

impl std::fmt::Debug for NotificationPoller {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NotificationPoller")
            .field("registry", &self.registry)
            .field("state", &self.state())
            .finish()
    }
}
