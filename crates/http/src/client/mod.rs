//! PeopleOS API client
//!
//! [`ApiClient`] attaches the stored bearer token to every request and
//! recovers from an expired token by waiting on the shared refresh
//! coordinator, then replaying the request once with the new token.
//! A 403 or a failed refresh ends the session: the token is dropped, the
//! navigator is sent to the login page and the call returns
//! [`ClientError::SessionTerminated`].

pub mod attendance;
pub mod auth;
pub mod departments;
pub mod employees;
pub mod error;
pub mod leave;
pub mod navigation;
pub mod refresh;

use self::error::{ClientError, describe_failure, error_message};
use self::navigation::{Navigator, RecordingNavigator};
use self::refresh::rpc::{RefreshReply, RefreshStatus};
use self::refresh::{HttpRefresher, RefreshHandle, TokenRefresher};
use peopleos_core::{ApiSettings, MemoryTokenStore, TokenStore};
use reqwest::{ClientBuilder, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// A request that can be dispatched more than once
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach an already-built JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Response with its body already read
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body as JSON; an empty body decodes as `null`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        if self.body.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    fn into_error(self) -> ClientError {
        let message = describe_failure(self.status, &self.body);
        ClientError::from_status(self.status, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

/// Authenticated PeopleOS API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    refresh_path: String,
    store: Arc<dyn TokenStore>,
    refresher: RefreshHandle,
}

impl ApiClient {
    /// Create a client with an in-memory session
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a client from loaded settings with an in-memory session
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ClientError> {
        ApiClientBuilder::from_settings(settings).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Session token store shared with the refresh coordinator
    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Whether a session token is stored
    pub fn is_authenticated(&self) -> bool {
        self.store.has_token()
    }

    /// State of the refresh coordinator
    pub async fn refresh_status(&self) -> Result<RefreshStatus, ClientError> {
        self.refresher.status().await
    }

    /// Send a request with the session token, recovering from an expired token
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut token = self.store.get();
        let mut attempt = Attempt::First;

        loop {
            let response = self.dispatch(&request, token.as_deref()).await?;
            let status = response.status;

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::FORBIDDEN {
                return Err(self.end_forbidden(&request, &response).await);
            }

            if status == StatusCode::UNAUTHORIZED
                && attempt == Attempt::First
                && request.path != self.refresh_path
            {
                debug!(method = %request.method, path = %request.path, "Access token rejected");
                match self.refresher.refresh(token.take()).await? {
                    RefreshReply::Refreshed(fresh) => {
                        token = Some(fresh);
                        attempt = Attempt::Retry;
                        continue;
                    }
                    RefreshReply::Failed(e) => return Err(ClientError::RefreshFailed(e)),
                    RefreshReply::Terminated(end) => {
                        return Err(ClientError::SessionTerminated(end));
                    }
                }
            }

            return Err(response.into_error());
        }
    }

    /// Send a request and decode the JSON response
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        self.send(request).await?.json()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(ApiRequest::delete(path)).await
    }

    /// Send without a bearer token and without any session handling
    pub async fn send_public(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let response = self.dispatch(&request, None).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(response.into_error())
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "API call"
        );

        Ok(ApiResponse { status, body })
    }

    async fn end_forbidden(&self, request: &ApiRequest, response: &ApiResponse) -> ClientError {
        let message = error_message(&response.body);
        warn!(
            path = %request.path,
            reason = message.as_deref().unwrap_or("none given"),
            "Access forbidden, ending session"
        );

        // The coordinator owns the session so an in-flight refresh cannot revive it
        match self.refresher.terminate(message).await {
            Ok(end) => ClientError::SessionTerminated(end),
            Err(e) => e,
        }
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    refresh_path: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    token_store: Option<Arc<dyn TokenStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl ApiClientBuilder {
    /// Start from loaded settings
    pub fn from_settings(settings: &ApiSettings) -> Self {
        let mut builder = Self::default()
            .base_url(settings.base_url.clone())
            .refresh_path(settings.refresh_path.clone())
            .user_agent(settings.user_agent.clone());
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the refresh endpoint path (default `/auth/refresh`)
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Use a specific session token store
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    /// Receive login redirects
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Replace the HTTP refresh call
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Build the client and start its refresh coordinator
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::Configuration(format!(
                "base_url must be an http(s) URL, got '{base_url}'"
            )));
        }

        let refresh_path = self
            .refresh_path
            .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string());
        if !refresh_path.starts_with('/') {
            return Err(ClientError::Configuration(
                "refresh_path must start with '/'".into(),
            ));
        }

        // The cookie jar carries the refresh credential between calls
        let mut client_builder = ClientBuilder::new().cookie_store(true);
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| format!("peopleos-client/{}", env!("CARGO_PKG_VERSION"))),
        );
        let client = client_builder.build()?;

        let store = self
            .token_store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(RecordingNavigator::new()));
        let refresher = self.refresher.unwrap_or_else(|| {
            Arc::new(HttpRefresher::new(
                client.clone(),
                format!("{base_url}{refresh_path}"),
            ))
        });

        let refresher = RefreshHandle::spawn(refresher, store.clone(), navigator);

        Ok(ApiClient {
            client,
            base_url,
            refresh_path,
            store,
            refresher,
        })
    }
}
