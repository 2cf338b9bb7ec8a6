//! PeopleOS HTTP client
//!
//! An authenticated client for the PeopleOS REST backend. Requests carry the
//! stored bearer token; expired tokens are refreshed once and shared by every
//! request that was waiting on them.

pub mod client;
pub mod types;

pub use client::error::{ClientError, RefreshError, SessionEnd, SessionEndReason};
pub use client::navigation::{LOGIN_PATH, Navigator, RecordingNavigator, login_redirect};
pub use client::refresh::rpc::RefreshStatus;
pub use client::refresh::{HttpRefresher, TokenRefresher};
pub use client::{ApiClient, ApiClientBuilder, ApiRequest, ApiResponse};
pub use reqwest::Method;
