//! The single configured HTTP client and its two interceptors.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every backend call goes through [`ApiClient`]. Outgoing requests pick up
//! the persisted access token as a bearer credential; incoming failures are
//! normalized into [`ApiError`] and handed back to the caller.
//!
//! DESIGN
//! ======
//! A 401 is not handled here beyond emitting [`AuthSignal::Unauthenticated`]
//! on a broadcast channel. The session manager subscribes and performs the
//! teardown; navigation stays with the view layer. The client never retries
//! and never attempts a refresh-token exchange.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::{Arc, RwLock};

use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use super::error::ApiError;
use super::types::{LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest, TokenResponse, User};
use crate::config::{ClientConfig, ConfigError};
use crate::storage::{ACCESS_TOKEN_KEY, TokenStore};

const SIGNAL_CHANNEL_CAPACITY: usize = 16;

/// Cross-cutting auth events raised by the response interceptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthSignal {
    /// The backend answered 401. `redirect_to_login` is false when the
    /// current navigation target already is the login page. `bearer` is the
    /// access token the rejected request carried, if any.
    Unauthenticated { redirect_to_login: bool, bearer: Option<String> },
}

/// True when `current` points at the login page.
#[must_use]
pub fn is_login_path(current: &str, login_path: &str) -> bool {
    !login_path.is_empty() && current.contains(login_path)
}

/// A request with the credential it was built with.
struct Outgoing {
    builder: reqwest::RequestBuilder,
    bearer: Option<String>,
}

impl Outgoing {
    fn map(self, f: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder) -> Self {
        Self { builder: f(self.builder), bearer: self.bearer }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    login_path: String,
    store: Arc<dyn TokenStore>,
    current_path: RwLock<String>,
    signals: broadcast::Sender<AuthSignal>,
}

impl ApiClient {
    /// Build the client from config, sharing `store` for bearer lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            login_path: config.login_path.clone(),
            store,
            current_path: RwLock::new("/".to_owned()),
            signals,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// The token store consulted by the request interceptor.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Subscribe to auth signals emitted by the response interceptor.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthSignal> {
        self.signals.subscribe()
    }

    /// Record the view layer's current navigation target.
    pub fn set_current_path(&self, path: impl Into<String>) {
        let mut current = self.current_path.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *current = path.into();
    }

    #[must_use]
    pub fn current_path(&self) -> String {
        self.current_path
            .read()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    #[must_use]
    pub fn on_login_page(&self) -> bool {
        is_login_path(&self.current_path(), &self.login_path)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // =========================================================================
    // INTERCEPTORS
    // =========================================================================

    /// Outgoing: attach the persisted access token, if any.
    fn request(&self, method: Method, path: &str) -> Outgoing {
        let builder = self.http.request(method, self.url(path));
        let bearer = self.store.get(ACCESS_TOKEN_KEY).filter(|token| !token.is_empty());
        let builder = match &bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        Outgoing { builder, bearer }
    }

    /// Incoming: normalize failures, signal on 401, always return the error.
    async fn execute(&self, outgoing: Outgoing) -> Result<reqwest::Response, ApiError> {
        let Outgoing { builder, bearer } = outgoing;
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = ApiError::from_transport(e);
                tracing::warn!(error = %err, "api request failed without a response");
                return Err(err);
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let path = response.url().path().to_owned();
        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.signal_unauthenticated(bearer);
        }

        let err = ApiError::from_status(status.as_u16(), &body);
        tracing::debug!(status = status.as_u16(), %path, error = %err, "api request rejected");
        Err(err)
    }

    fn signal_unauthenticated(&self, bearer: Option<String>) {
        let redirect_to_login = !self.on_login_page();
        if self.signals.send(AuthSignal::Unauthenticated { redirect_to_login, bearer }).is_err() {
            tracing::debug!("401 received with no session subscribed to auth signals");
        }
    }

    // =========================================================================
    // GENERIC VERBS
    // =========================================================================

    /// Send a request and decode a JSON success body.
    ///
    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] for transport failures, non-success
    /// statuses, or a body that does not decode as `T`.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut outgoing = self.request(method, path);
        if let Some(body) = body {
            outgoing = outgoing.map(|b| b.json(body));
        }
        let response = self.execute(outgoing).await?;
        decode(response).await
    }

    /// Send a request and return the raw success body.
    ///
    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] for transport failures or non-success statuses.
    pub async fn send_text<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<String, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut outgoing = self.request(method, path);
        if let Some(body) = body {
            outgoing = outgoing.map(|b| b.json(body));
        }
        let response = self.execute(outgoing).await?;
        response.text().await.map_err(ApiError::from_transport)
    }

    /// `GET` with query parameters, decoding a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn get_json_with_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(self.request(Method::GET, path).map(|b| b.query(query))).await?;
        decode(response).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(Method::GET, path, None::<&()>).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, Some(body)).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, Some(body)).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::send_text`].
    pub async fn delete(&self, path: &str) -> Result<String, ApiError> {
        self.send_text(Method::DELETE, path, None::<&()>).await
    }

    // =========================================================================
    // AUTH ENDPOINTS
    // =========================================================================

    /// `POST /auth/login` with exactly the given credentials.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn login(&self, credentials: &LoginRequest) -> Result<TokenResponse, ApiError> {
        self.post_json("/auth/login", credentials).await
    }

    /// `POST /auth/register`. Returns the server's confirmation text.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_text`].
    pub async fn register(&self, user: &RegisterRequest) -> Result<String, ApiError> {
        self.send_text(Method::POST, "/auth/register", Some(user)).await
    }

    /// `POST /auth/logout`, revoking one refresh token or all of the user's.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_text`].
    pub async fn logout(&self, request: &LogoutRequest) -> Result<(), ApiError> {
        self.send_text(Method::POST, "/auth/logout", Some(request)).await.map(|_| ())
    }

    /// `POST /auth/refresh`. Not used by the session flow.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ApiError> {
        let body = RefreshRequest { refresh_token: refresh_token.to_owned() };
        self.post_json("/auth/refresh", &body).await
    }

    /// `GET /auth/me`: resolve the identity behind the current token.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn me(&self) -> Result<User, ApiError> {
        self.get_json("/auth/me").await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let text = response.text().await.map_err(ApiError::from_transport)?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}
