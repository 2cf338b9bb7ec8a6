//! Authentication API client methods

use super::refresh::rpc::RefreshReply;
use super::{ApiClient, ApiRequest, ClientError};
use crate::types::{LoginRequest, LoginResponse, UserProfile};
use reqwest::StatusCode;
use tracing::{error, info, warn};

impl ApiClient {
    /// Sign in and store the issued access token
    ///
    /// Credentials are checked without token refresh, so a wrong password
    /// comes back as [`ClientError::Unauthorized`]. A 403 (for example a
    /// suspended account) still ends the session like any other 403.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let request = ApiRequest::post("/auth/login").json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let response = self.dispatch(&request, None).await?;
        if response.status == StatusCode::FORBIDDEN {
            return Err(self.end_forbidden(&request, &response).await);
        }
        if !response.is_success() {
            return Err(response.into_error());
        }
        let response: LoginResponse = response.json()?;

        self.store.set(&response.token)?;
        info!(email, "Signed in");
        Ok(response)
    }

    /// Sign out; the stored token is dropped even if the backend call fails
    pub async fn logout(&self) -> Result<(), ClientError> {
        let token = self.store.get();
        let outcome = self
            .dispatch(&ApiRequest::post("/auth/logout"), token.as_deref())
            .await;
        if let Err(e) = self.store.clear() {
            error!(error = %e, "Failed to remove session token");
        }

        let response = outcome?;
        if !response.is_success() {
            warn!(status = response.status.as_u16(), "Logout call rejected");
            return Err(response.into_error());
        }
        info!("Signed out");
        Ok(())
    }

    /// The signed-in user
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        self.get("/auth/me").await
    }

    /// Refresh the session now, through the same single-flight path a 401 takes
    pub async fn refresh_session(&self) -> Result<String, ClientError> {
        match self.refresher.refresh(self.store.get()).await? {
            RefreshReply::Refreshed(token) => Ok(token),
            RefreshReply::Failed(e) => Err(ClientError::RefreshFailed(e)),
            RefreshReply::Terminated(end) => Err(ClientError::SessionTerminated(end)),
        }
    }
}
