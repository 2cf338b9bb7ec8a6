use crate::client::error::{RefreshError, SessionEnd};
use tokio::sync::oneshot;

pub enum RefreshRequest {
    /// A request saw a 401 while carrying `stale_token`
    Refresh {
        stale_token: Option<String>,
        reply: oneshot::Sender<RefreshReply>,
    },
    /// The backend refused the session; end it now
    Terminate {
        message: Option<String>,
        reply: oneshot::Sender<SessionEnd>,
    },
    Status {
        reply: oneshot::Sender<RefreshStatus>,
    },
}

/// Answer to a [`RefreshRequest::Refresh`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshReply {
    /// Replay the request with this token
    Refreshed(String),
    /// The refresh this request queued behind failed
    Failed(RefreshError),
    /// This request started the refresh, it failed and the session is over
    Terminated(SessionEnd),
}

/// Snapshot of the coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStatus {
    pub in_progress: bool,
    pub pending: usize,
    pub completed: u64,
}
