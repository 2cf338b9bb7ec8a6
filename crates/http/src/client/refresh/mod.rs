//! Single-flight token refresh
//!
//! Every request that receives a 401 asks the coordinator for a new token.
//! The coordinator is one task owning the refresh flag and the queue of
//! waiting requests, so however many requests fail at once, the backend sees
//! exactly one refresh call. Waiters are answered in arrival order when the
//! refresh settles, the request that started it last.

pub mod actor;
pub mod inner;
pub mod rpc;

use self::actor::RefreshActor;
use self::rpc::{RefreshReply, RefreshRequest, RefreshStatus};
use crate::client::error::{ClientError, RefreshError, SessionEnd, describe_failure};
use crate::client::navigation::Navigator;
use async_trait::async_trait;
use peopleos_core::{ErrorContext, TokenStore};
use serde::Deserialize;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Mailbox depth for the coordinator
const MAILBOX_CAPACITY: usize = 256;

/// Exchanges the long-lived refresh credential for a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync + Debug {
    async fn refresh(&self) -> Result<String, RefreshError>;
}

/// Body returned by the refresh endpoint
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(alias = "accessToken", alias = "access_token")]
    token: Option<String>,
}

/// Calls the backend refresh endpoint
///
/// The refresh credential is an http-only cookie held in the client's
/// cookie jar, so the request carries no body and no bearer header.
#[derive(Debug, Clone)]
pub struct HttpRefresher {
    client: reqwest::Client,
    url: String,
}

impl HttpRefresher {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenRefresher for HttpRefresher {
    async fn refresh(&self) -> Result<String, RefreshError> {
        debug!(url = %self.url, "Requesting new access token");

        let response = self
            .client
            .post(&self.url)
            .send()
            .await
            .with_context(|| format!("POST {}", self.url))
            .map_err(RefreshError::Transport)?;
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context_str("reading refresh response")
            .map_err(RefreshError::Transport)?;

        if !status.is_success() {
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message: describe_failure(status, &body),
            });
        }

        let parsed: RefreshResponse =
            serde_json::from_str(&body).map_err(|_| RefreshError::MissingToken)?;
        parsed
            .token
            .filter(|token| !token.is_empty())
            .ok_or(RefreshError::MissingToken)
    }
}

/// Handle to the refresh coordinator task
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<RefreshRequest>,
}

impl RefreshHandle {
    /// Spawn the coordinator on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(
        refresher: Arc<dyn TokenRefresher>,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let actor = RefreshActor::new(refresher, store, navigator, rx);
        tokio::spawn(actor.run());
        Self { tx }
    }

    /// Wait for a token to replay a request that was rejected with `stale_token`
    pub async fn refresh(&self, stale_token: Option<String>) -> Result<RefreshReply, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RefreshRequest::Refresh { stale_token, reply })
            .await
            .map_err(|_| ClientError::Coordinator)?;
        rx.await.map_err(|_| ClientError::Coordinator)
    }

    /// End the session: drop the token and send the user to the login page
    ///
    /// A refresh still in flight is abandoned and its waiters fail with
    /// [`RefreshError::SessionEnded`].
    pub async fn terminate(&self, message: Option<String>) -> Result<SessionEnd, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RefreshRequest::Terminate { message, reply })
            .await
            .map_err(|_| ClientError::Coordinator)?;
        rx.await.map_err(|_| ClientError::Coordinator)
    }

    /// Current coordinator state
    pub async fn status(&self) -> Result<RefreshStatus, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RefreshRequest::Status { reply })
            .await
            .map_err(|_| ClientError::Coordinator)?;
        rx.await.map_err(|_| ClientError::Coordinator)
    }
}
