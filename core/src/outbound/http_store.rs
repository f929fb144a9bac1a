//! Reqwest-backed remote store adapter.
//!
//! This adapter owns transport details only: request serialisation, bearer
//! carriage, timeout and HTTP error mapping, and JSON decoding into domain
//! types. Every non-2xx response is mapped to a typed
//! [`RemoteStoreError`], surfacing the server's own `message`/`error` body
//! field when present and a generic status message otherwise.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::domain::Session;
use crate::domain::ports::{RemoteStore, RemoteStoreError};
use crate::domain::site::{Site, SiteId};
use crate::domain::site_draft::SitePayload;
use crate::domain::user::{NewPassword, NewUser, User, UserId, UserUpdate};
use crate::outbound::dto::{NewUserDto, ResetPasswordDto, SitePayloadDto, UserUpdateDto};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = "waterops-core/0.1";

/// Endpoint and outbound identity settings for the store adapter.
#[derive(Debug, Clone)]
pub struct StoreHttpConfig {
    /// Base URL of the remote store, e.g. `https://store.example/api`.
    pub base_url: Url,
    /// Per-request timeout applied by the HTTP client.
    pub timeout: Duration,
    /// HTTP user-agent sent with every request.
    pub user_agent: String,
}

impl StoreHttpConfig {
    /// Settings with the default timeout and user agent.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// Remote store adapter performing JSON-over-HTTP requests.
pub struct HttpRemoteStore {
    client: Client,
    base_url: Url,
    user_agent: String,
    session: Arc<Session>,
}

impl HttpRemoteStore {
    /// Build an adapter with an explicit request timeout and a shared
    /// session carrier.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: StoreHttpConfig, session: Arc<Session>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url,
            user_agent: config.user_agent,
            session,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteStoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteStoreError::transport("store base URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach identity headers and the bearer credential, send, and map
    /// non-2xx statuses. `resource` labels 404 responses for the caller.
    async fn dispatch(
        &self,
        builder: RequestBuilder,
        resource: &str,
    ) -> Result<Response, RemoteStoreError> {
        let builder = builder.header(reqwest::header::USER_AGENT, self.user_agent.as_str());
        // An absent token is carried as an unauthenticated request; the
        // store's rejection maps back through `map_status_error`.
        let builder = match self.session.bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        debug!(status = status.as_u16(), resource, "remote store rejected a request");
        Err(map_status_error(status, body.as_ref(), resource))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteStoreError> {
    let body = response.bytes().await.map_err(map_transport_error)?;
    serde_json::from_slice(body.as_ref())
        .map_err(|error| RemoteStoreError::decode(error.to_string()))
}

fn map_transport_error(error: reqwest::Error) -> RemoteStoreError {
    RemoteStoreError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8], resource: &str) -> RemoteStoreError {
    let message = extract_message(body)
        .unwrap_or_else(|| format!("the server returned status {}", status.as_u16()));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteStoreError::unauthenticated(),
        StatusCode::NOT_FOUND => RemoteStoreError::not_found(resource),
        StatusCode::CONFLICT => RemoteStoreError::conflict(message),
        _ => RemoteStoreError::rejected(status.as_u16(), message),
    }
}

/// Server messages live in a `message` or `error` field of the JSON body.
fn extract_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["message", "error"]
        .into_iter()
        .find_map(|key| value.get(key)?.as_str().map(str::trim).map(str::to_owned))
        .filter(|message| !message.is_empty())
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list_users(&self) -> Result<Vec<User>, RemoteStoreError> {
        let url = self.endpoint(&["users"])?;
        let response = self.dispatch(self.client.get(url), "the user list").await?;
        decode(response).await
    }

    async fn list_sector_managers(&self) -> Result<Vec<User>, RemoteStoreError> {
        let url = self.endpoint(&["users", "sector-managers"])?;
        let response = self
            .dispatch(self.client.get(url), "the sector manager list")
            .await?;
        decode(response).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, RemoteStoreError> {
        let url = self.endpoint(&["users"])?;
        let request = self.client.post(url).json(&NewUserDto::from(user));
        let response = self.dispatch(request, "the user collection").await?;
        decode(response).await
    }

    async fn update_user(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> Result<User, RemoteStoreError> {
        let url = self.endpoint(&["users", &id.to_string()])?;
        let request = self.client.put(url).json(&UserUpdateDto::from(update));
        let response = self.dispatch(request, "the user").await?;
        decode(response).await
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), RemoteStoreError> {
        let url = self.endpoint(&["users", &id.to_string()])?;
        self.dispatch(self.client.delete(url), "the user").await?;
        Ok(())
    }

    async fn reset_password(
        &self,
        id: &UserId,
        password: &NewPassword,
    ) -> Result<(), RemoteStoreError> {
        let url = self.endpoint(&["users", &id.to_string(), "reset-password"])?;
        let request = self.client.post(url).json(&ResetPasswordDto {
            new_password: password.as_str(),
        });
        self.dispatch(request, "the user").await?;
        Ok(())
    }

    async fn list_sites(&self) -> Result<Vec<Site>, RemoteStoreError> {
        let url = self.endpoint(&["sites"])?;
        let response = self.dispatch(self.client.get(url), "the site list").await?;
        decode(response).await
    }

    async fn get_site(&self, id: &SiteId) -> Result<Site, RemoteStoreError> {
        let url = self.endpoint(&["sites", &id.to_string()])?;
        let response = self.dispatch(self.client.get(url), "the site").await?;
        decode(response).await
    }

    async fn create_site(&self, payload: &SitePayload) -> Result<Site, RemoteStoreError> {
        let url = self.endpoint(&["sites"])?;
        let request = self.client.post(url).json(&SitePayloadDto::from(payload));
        let response = self.dispatch(request, "the site collection").await?;
        decode(response).await
    }

    async fn update_site(
        &self,
        id: &SiteId,
        payload: &SitePayload,
    ) -> Result<Site, RemoteStoreError> {
        let url = self.endpoint(&["sites", &id.to_string()])?;
        let request = self.client.put(url).json(&SitePayloadDto::from(payload));
        let response = self.dispatch(request, "the site").await?;
        decode(response).await
    }

    async fn delete_site(&self, id: &SiteId) -> Result<(), RemoteStoreError> {
        let url = self.endpoint(&["sites", &id.to_string()])?;
        self.dispatch(self.client.delete(url), "the site").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the non-network mapping helpers.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::unauthorised(StatusCode::UNAUTHORIZED, "Unauthenticated")]
    #[case::forbidden(StatusCode::FORBIDDEN, "Unauthenticated")]
    #[case::missing(StatusCode::NOT_FOUND, "NotFound")]
    #[case::conflict(StatusCode::CONFLICT, "Conflict")]
    #[case::unprocessable(StatusCode::UNPROCESSABLE_ENTITY, "Rejected")]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, "Rejected")]
    fn maps_http_statuses_to_typed_store_errors(
        #[case] status: StatusCode,
        #[case] expected: &str,
    ) {
        let error = map_status_error(status, b"{\"message\":\"nope\"}", "the site");
        let matched = match expected {
            "Unauthenticated" => matches!(error, RemoteStoreError::Unauthenticated),
            "NotFound" => matches!(error, RemoteStoreError::NotFound { .. }),
            "Conflict" => matches!(error, RemoteStoreError::Conflict { .. }),
            "Rejected" => matches!(error, RemoteStoreError::Rejected { .. }),
            other => panic!("unsupported test expectation: {other}"),
        };
        assert!(matched, "{status} should map to {expected}");
    }

    #[test]
    fn surfaces_the_server_message_field() {
        let error = map_status_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            b"{\"message\":\"email already registered\"}",
            "the user collection",
        );
        assert_eq!(
            error,
            RemoteStoreError::rejected(422u16, "email already registered"),
        );
    }

    #[test]
    fn falls_back_to_the_error_field_then_to_a_generic_message() {
        let error = map_status_error(
            StatusCode::BAD_REQUEST,
            b"{\"error\":\"bad coordinates\"}",
            "the site collection",
        );
        assert_eq!(error, RemoteStoreError::rejected(400u16, "bad coordinates"));

        let fallback = map_status_error(StatusCode::BAD_GATEWAY, b"<html>oops</html>", "the site");
        assert_eq!(
            fallback,
            RemoteStoreError::rejected(502u16, "the server returned status 502"),
        );
    }

    #[test]
    fn endpoint_joins_segments_under_the_base_path() {
        let config = StoreHttpConfig::new(
            Url::parse("https://store.example/api/").expect("valid url"),
        );
        let adapter =
            HttpRemoteStore::new(config, Arc::new(Session::new())).expect("client builds");
        let url = adapter
            .endpoint(&["users", "sector-managers"])
            .expect("segments join");
        assert_eq!(url.as_str(), "https://store.example/api/users/sector-managers");
    }
}
