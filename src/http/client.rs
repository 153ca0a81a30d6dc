use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::request::RequestDescriptor;
use crate::auth::credentials::bearer;
use crate::auth::{
    ClearSession, CredentialStore, FileCredentialStore, HttpRefreshOperation, RefreshCoordinator,
    RefreshOperation, SessionInvalidator,
};
use crate::config::ClientConfig;
use crate::error::{PortalError, Result};

/// HTTP client that authenticates every request and recovers from expired
/// access credentials.
///
/// A 401 on a request that is neither a refresh nor a login call triggers one
/// coordinated refresh, after which the request is replayed once with the new
/// credential.
///
/// # Example
/// ```no_run
/// use hackportal::config::ClientConfig;
/// use hackportal::http::AuthClient;
///
/// # async fn example() -> hackportal::error::Result<()> {
/// let client = AuthClient::from_config(ClientConfig::from_env()?)?;
/// let teams: serde_json::Value = client.get_json("/teams").await?;
/// # Ok(())
/// # }
/// ```
pub struct AuthClient {
    pub(super) http: reqwest::Client,
    pub(super) config: ClientConfig,
    pub(super) store: Arc<dyn CredentialStore>,
    pub(super) invalidator: Arc<dyn SessionInvalidator>,
    coordinator: RefreshCoordinator,
}

impl AuthClient {
    /// Client backed by the file credential store and a plain
    /// [`ClearSession`] invalidator.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let store: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::new(config.store_config()));
        let invalidator = Arc::new(ClearSession::new(store.clone()));
        Self::new(config, store, invalidator)
    }

    /// Client refreshing over HTTP at the configured refresh path.
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        invalidator: Arc<dyn SessionInvalidator>,
    ) -> Result<Self> {
        config.validate()?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        let operation = Arc::new(HttpRefreshOperation::new(
            http.clone(),
            config.url_for(&config.refresh_path),
        ));
        Ok(Self::with_parts(config, http, store, operation, invalidator))
    }

    /// Assemble a client from explicit collaborators.
    pub fn with_parts(
        config: ClientConfig,
        http: reqwest::Client,
        store: Arc<dyn CredentialStore>,
        operation: Arc<dyn RefreshOperation>,
        invalidator: Arc<dyn SessionInvalidator>,
    ) -> Self {
        let coordinator = RefreshCoordinator::new(store.clone(), operation, invalidator.clone())
            .with_rotation(config.rotation)
            .with_timeout(config.refresh_timeout);
        Self {
            http,
            config,
            store,
            invalidator,
            coordinator,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Send a request, refreshing the access credential and replaying the
    /// request once if the backend answers 401.
    ///
    /// Non-2xx responses are returned as errors: [`PortalError::RetryExhausted`]
    /// for a 401 after the replay, [`PortalError::Api`] otherwise.
    pub async fn send(&self, mut descriptor: RequestDescriptor) -> Result<Response> {
        let attached = self.store.load()?.map(|pair| pair.access_token);
        let response = self.dispatch(&descriptor, attached.as_deref()).await?;
        if response.status().is_success() {
            return Ok(response);
        }
        if response.status() != StatusCode::UNAUTHORIZED || descriptor.is_retried() {
            return Self::reject(&descriptor, response).await;
        }
        if self.config.is_exempt(&descriptor.path) {
            debug!(path = %descriptor.path, "401 from exempt endpoint; not refreshing");
            return Self::reject(&descriptor, response).await;
        }

        descriptor.mark_retried();
        let fresh = self
            .coordinator
            .obtain_fresh_credential_for(attached.as_deref())
            .await?;
        debug!(
            method = %descriptor.method,
            path = %descriptor.path,
            "replaying request with refreshed credential"
        );
        let replay = self.dispatch(&descriptor, Some(&fresh)).await?;
        if replay.status().is_success() {
            Ok(replay)
        } else {
            Self::reject(&descriptor, replay).await
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(RequestDescriptor::get(path)).await?;
        Ok(response.json().await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(RequestDescriptor::post(path).with_json(body)?)
            .await?;
        Ok(response.json().await?)
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(RequestDescriptor::put(path).with_json(body)?)
            .await?;
        Ok(response.json().await?)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(RequestDescriptor::delete(path)).await?;
        Ok(())
    }

    pub(super) async fn dispatch(
        &self,
        descriptor: &RequestDescriptor,
        access_token: Option<&str>,
    ) -> Result<Response> {
        let mut headers = descriptor.headers.clone();
        headers.remove(AUTHORIZATION);
        if let Some(token) = access_token {
            let mut value = HeaderValue::from_str(&bearer(token)).map_err(|_| {
                PortalError::InvalidArgument("access credential is not a valid header".to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let mut request = self
            .http
            .request(descriptor.method.clone(), self.config.url_for(&descriptor.path))
            .headers(headers);
        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }
        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn reject(descriptor: &RequestDescriptor, response: Response) -> Result<Response> {
        let status = response.status().as_u16();
        if response.status() == StatusCode::UNAUTHORIZED && descriptor.is_retried() {
            warn!(path = %descriptor.path, "request still unauthorized after refresh");
            return Err(PortalError::RetryExhausted { status });
        }
        let message = response.text().await.unwrap_or_default();
        Err(PortalError::api(status, message))
    }
}
