use crate::client::error::{RefreshError, SessionEnd, SessionEndReason};
use crate::client::navigation::{Navigator, login_redirect};
use crate::client::refresh::TokenRefresher;
use crate::client::refresh::inner::{Admission, RefreshQueue};
use crate::client::refresh::rpc::{RefreshReply, RefreshRequest, RefreshStatus};
use peopleos_core::TokenStore;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

type Waiter = oneshot::Sender<RefreshReply>;

/// Owns the refresh flag and queue; every 401 is routed through its mailbox
pub struct RefreshActor {
    queue: RefreshQueue<Waiter>,
    refresher: Arc<dyn TokenRefresher>,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    rx: mpsc::Receiver<RefreshRequest>,
    settled_tx: mpsc::UnboundedSender<Result<String, RefreshError>>,
    settled_rx: mpsc::UnboundedReceiver<Result<String, RefreshError>>,
    completed: u64,
    /// The session ended while a refresh was in flight; its token must be dropped
    ended_mid_refresh: bool,
}

impl RefreshActor {
    pub fn new(
        refresher: Arc<dyn TokenRefresher>,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        rx: mpsc::Receiver<RefreshRequest>,
    ) -> Self {
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        Self {
            queue: RefreshQueue::new(),
            refresher,
            store,
            navigator,
            rx,
            settled_tx,
            settled_rx,
            completed: 0,
            ended_mid_refresh: false,
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                // Settle before admitting anyone new so late arrivals see the fresh token
                biased;
                Some(outcome) = self.settled_rx.recv() => self.settle(outcome),
                request = self.rx.recv() => match request {
                    Some(RefreshRequest::Refresh { stale_token, reply }) => {
                        self.admit(stale_token, reply);
                    }
                    Some(RefreshRequest::Terminate { message, reply }) => {
                        let _ = reply.send(self.terminate(message));
                    }
                    Some(RefreshRequest::Status { reply }) => {
                        let _ = reply.send(RefreshStatus {
                            in_progress: self.queue.is_refreshing(),
                            pending: self.queue.pending_len(),
                            completed: self.completed,
                        });
                    }
                    None => break,
                },
            }
        }
        debug!("Refresh coordinator stopped");
    }

    fn admit(&mut self, stale_token: Option<String>, reply: Waiter) {
        if self.ended_mid_refresh {
            let _ = reply.send(RefreshReply::Failed(RefreshError::SessionEnded));
            return;
        }

        if !self.queue.is_refreshing() {
            // A 401 that raced a refresh which already finished
            match (stale_token.as_deref(), self.store.get()) {
                (Some(sent), Some(current)) if sent != current => {
                    debug!("Token already refreshed, replaying with current token");
                    let _ = reply.send(RefreshReply::Refreshed(current));
                    return;
                }
                (None, Some(current)) => {
                    let _ = reply.send(RefreshReply::Refreshed(current));
                    return;
                }
                (Some(_), None) => {
                    debug!("Session already ended, not refreshing");
                    let _ = reply.send(RefreshReply::Failed(RefreshError::SessionEnded));
                    return;
                }
                _ => {}
            }
        }

        match self.queue.admit(reply) {
            Admission::Queued => {
                debug!(pending = self.queue.pending_len(), "Queued behind in-flight refresh");
            }
            Admission::Start => {
                info!("Access token rejected, refreshing session");
                let refresher = Arc::clone(&self.refresher);
                let settled_tx = self.settled_tx.clone();
                tokio::spawn(async move {
                    let task = tokio::spawn(async move { refresher.refresh().await });
                    let outcome = task.await.unwrap_or_else(|e| {
                        Err(RefreshError::Transport(format!("refresh task failed: {e}")))
                    });
                    let _ = settled_tx.send(outcome);
                });
            }
        }
    }

    fn terminate(&mut self, message: Option<String>) -> SessionEnd {
        if self.queue.is_refreshing() {
            self.ended_mid_refresh = true;
        }
        if let Err(e) = self.store.clear() {
            error!(error = %e, "Failed to remove session token");
        }

        let redirect = login_redirect(message.as_deref());
        self.navigator.navigate(&redirect);

        SessionEnd {
            reason: SessionEndReason::Forbidden(message),
            redirect,
        }
    }

    fn settle(&mut self, outcome: Result<String, RefreshError>) {
        self.completed += 1;

        if std::mem::take(&mut self.ended_mid_refresh) {
            let settlement = self.queue.settle();
            info!(
                dropped = settlement.pending.len() + 1,
                "Session ended during refresh, discarding refreshed token"
            );
            for waiter in settlement.pending.into_iter().chain(settlement.initiator) {
                let _ = waiter.send(RefreshReply::Failed(RefreshError::SessionEnded));
            }
            return;
        }

        let outcome = outcome.and_then(|token| {
            self.store
                .set(&token)
                .map(|()| token)
                .map_err(|e| RefreshError::Storage(e.to_string()))
        });
        let settlement = self.queue.settle();

        match outcome {
            Ok(token) => {
                info!(
                    replayed = settlement.pending.len() + 1,
                    "Session refreshed"
                );
                for waiter in settlement.pending {
                    let _ = waiter.send(RefreshReply::Refreshed(token.clone()));
                }
                if let Some(initiator) = settlement.initiator {
                    let _ = initiator.send(RefreshReply::Refreshed(token));
                }
            }
            Err(refresh_error) => {
                warn!(
                    error = %refresh_error,
                    rejected = settlement.pending.len(),
                    "Session refresh failed, ending session"
                );
                for waiter in settlement.pending {
                    let _ = waiter.send(RefreshReply::Failed(refresh_error.clone()));
                }
                if let Err(e) = self.store.clear() {
                    error!(error = %e, "Failed to remove session token");
                }

                let redirect = login_redirect(None);
                self.navigator.navigate(&redirect);

                if let Some(initiator) = settlement.initiator {
                    let _ = initiator.send(RefreshReply::Terminated(SessionEnd {
                        reason: SessionEndReason::RefreshFailed(refresh_error),
                        redirect,
                    }));
                }
            }
        }
    }
}
