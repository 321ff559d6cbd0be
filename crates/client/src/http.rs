//! HTTP implementation of [`CertificationApi`] over the backend's JSON API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use certtrack_core::config::ApiConfig;
use certtrack_core::domain::{
    CertificationId, CertificationRecord, DocumentSlot, HistoryEntry, SlotFile,
};
use certtrack_core::session::{SessionContext, SessionHandle, SessionUser, TokenGrant};

use crate::api::CertificationApi;
use crate::error::ClientError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Debug)]
pub struct HttpCertificationApi {
    http: Client,
    base_url: Url,
    session: SessionHandle,
    max_retries: u32,
    /// Held while tokens are being refreshed so concurrent 401s refresh once.
    refresh_gate: Arc<Mutex<()>>,
}

impl HttpCertificationApi {
    pub fn new(
        base_url: impl Into<String>,
        session: SessionHandle,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, ClientError> {
        let raw: String = base_url.into();
        let base_url = Url::parse(raw.trim())
            .map_err(|error| ClientError::InvalidBaseUrl(format!("`{raw}`: {error}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(format!("`{raw}` cannot hold a path")));
        }
        let http = Client::builder().timeout(timeout).build().map_err(|error| {
            ClientError::Connection { url: base_url.to_string(), message: error.to_string() }
        })?;
        Ok(Self { http, base_url, session, max_retries, refresh_gate: Arc::new(Mutex::new(())) })
    }

    pub fn from_config(config: &ApiConfig, session: SessionHandle) -> Result<Self, ClientError> {
        Self::new(
            config.base_url.clone(),
            session,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn certification_endpoint(
        &self,
        id: &CertificationId,
        rest: &[&str],
    ) -> Result<Url, ClientError> {
        let mut segments = vec!["certifications", id.0.as_str()];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    fn slot_files_endpoint(
        &self,
        id: &CertificationId,
        slot: DocumentSlot,
    ) -> Result<Url, ClientError> {
        let slot = slot.number().to_string();
        self.certification_endpoint(id, &["slots", slot.as_str(), "files"])
    }

    /// Sends a freshly built request, retrying connection failures and timeouts.
    async fn send<F>(
        &self,
        build: &F,
        token: Option<&str>,
        request_id: &str,
    ) -> Result<Response, ClientError>
    where
        F: Fn() -> RequestBuilder + Sync,
    {
        let mut attempt = 0;
        loop {
            let mut request = build().header(REQUEST_ID_HEADER, request_id);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) => return Ok(response),
                Err(error)
                    if (error.is_connect() || error.is_timeout()) && attempt < self.max_retries =>
                {
                    attempt += 1;
                    warn!(
                        event_name = "client.http.retry",
                        correlation_id = request_id,
                        attempt,
                        error = %error,
                        "request failed before a response; retrying"
                    );
                }
                Err(error) => {
                    return Err(ClientError::Connection {
                        url: self.base_url.to_string(),
                        message: error.to_string(),
                    })
                }
            }
        }
    }

    /// Sends with the current access token, refreshing once on 401.
    ///
    /// A session already past its expiry is refreshed before the first attempt.
    async fn execute<F>(&self, build: F) -> Result<Response, ClientError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let request_id = Uuid::new_v4().to_string();
        let session = self.session.current().await.ok_or(ClientError::NotAuthenticated)?;
        let token = if session.is_expired(Utc::now()) {
            debug!(
                event_name = "client.session.refresh_on_expiry",
                correlation_id = request_id.as_str(),
                "access token past expiry; refreshing before request"
            );
            self.refresh_after(session.access_token()).await?
        } else {
            session.access_token().to_string()
        };

        let response = self.send(&build, Some(token.as_str()), &request_id).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        info!(
            event_name = "client.session.refresh_on_unauthorized",
            correlation_id = request_id.as_str(),
            "access token rejected; refreshing session"
        );
        let token = self.refresh_after(&token).await?;
        let response = self.send(&build, Some(token.as_str()), &request_id).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.clear().await;
            return Err(ClientError::SessionExpired);
        }
        check_status(response).await
    }

    /// Returns an access token newer than `stale`, refreshing only if no other
    /// request has already done so.
    async fn refresh_after(&self, stale: &str) -> Result<String, ClientError> {
        let _gate = self.refresh_gate.lock().await;
        match self.session.access_token().await {
            Some(current) if current != stale => Ok(current),
            Some(_) => Ok(self.refresh_tokens().await?.access_token().to_string()),
            None => Err(ClientError::SessionExpired),
        }
    }

    /// Exchanges the refresh token. Callers hold `refresh_gate`.
    async fn refresh_tokens(&self) -> Result<SessionContext, ClientError> {
        let Some(current) = self.session.current().await else {
            return Err(ClientError::NotAuthenticated);
        };
        let Some(refresh_token) = current.refresh_token().map(str::to_string) else {
            self.session.clear().await;
            return Err(ClientError::SessionExpired);
        };

        let request_id = Uuid::new_v4().to_string();
        let body = json!({ "refresh_token": refresh_token });
        let url = self.endpoint(&["auth", "refresh"])?;
        let build = || self.http.post(url.clone()).json(&body);
        let outcome = match self.send(&build, None, &request_id).await {
            Ok(response) if response.status().is_success() => {
                decode::<TokenGrant>(response).await
            }
            Ok(response) => Err(ClientError::Rejected {
                status: response.status().as_u16(),
                message: "refresh rejected".to_string(),
            }),
            Err(error) => Err(error),
        };

        match outcome {
            Ok(grant) => {
                let refreshed = current.refreshed(grant, Utc::now());
                self.session.replace(refreshed.clone()).await;
                debug!(
                    event_name = "client.session.refreshed",
                    correlation_id = request_id.as_str(),
                    "session tokens refreshed"
                );
                Ok(refreshed)
            }
            Err(error) => {
                warn!(
                    event_name = "client.session.refresh_failed",
                    correlation_id = request_id.as_str(),
                    error = %error,
                    "session refresh failed; clearing session"
                );
                self.session.clear().await;
                Err(ClientError::SessionExpired)
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        let response = self.execute(|| self.http.get(url.clone())).await?;
        decode(response).await
    }

    async fn post_empty(&self, url: Url) -> Result<(), ClientError> {
        self.execute(|| self.http.post(url.clone())).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let path = response.url().path().to_string();
    let message = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(path));
    }
    if status.is_server_error() {
        return Err(ClientError::Server { status: status.as_u16(), message });
    }
    Err(ClientError::Rejected { status: status.as_u16(), message })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    response.json::<T>().await.map_err(|error| ClientError::Decode(error.to_string()))
}

#[async_trait]
impl CertificationApi for HttpCertificationApi {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionContext, ClientError> {
        let request_id = Uuid::new_v4().to_string();
        let body = json!({ "username": username, "password": password.expose_secret() });
        let url = self.endpoint(&["auth", "login"])?;
        let build = || self.http.post(url.clone()).json(&body);
        let response = self.send(&build, None, &request_id).await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::InvalidCredentials);
        }
        let grant: TokenGrant = decode(check_status(response).await?).await?;
        let fallback_user = SessionUser {
            id: username.to_string(),
            username: username.to_string(),
            display_name: None,
            roles: Vec::new(),
        };
        let session = SessionContext::from_grant(grant, fallback_user, Utc::now());
        self.session.replace(session.clone()).await;

        info!(
            event_name = "client.session.created",
            correlation_id = request_id.as_str(),
            username = session.user.username.as_str(),
            "session created from login response"
        );
        Ok(session)
    }

    async fn refresh(&self) -> Result<SessionContext, ClientError> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_tokens().await
    }

    async fn logout(&self) -> Result<(), ClientError> {
        let Some(token) = self.session.access_token().await else {
            return Ok(());
        };

        let request_id = Uuid::new_v4().to_string();
        let url = self.endpoint(&["auth", "logout"])?;
        let build = || self.http.post(url.clone());
        if let Err(error) = self.send(&build, Some(token.as_str()), &request_id).await {
            warn!(
                event_name = "client.session.logout_failed",
                correlation_id = request_id.as_str(),
                error = %error,
                "backend logout failed; clearing local session anyway"
            );
        }
        self.session.clear().await;
        Ok(())
    }

    async fn fetch_certification(
        &self,
        id: &CertificationId,
    ) -> Result<CertificationRecord, ClientError> {
        self.get_json(self.certification_endpoint(id, &[])?).await
    }

    async fn list_slot_files(
        &self,
        id: &CertificationId,
        slot: DocumentSlot,
    ) -> Result<Vec<SlotFile>, ClientError> {
        self.get_json(self.slot_files_endpoint(id, slot)?).await
    }

    async fn fetch_history(&self, id: &CertificationId) -> Result<Vec<HistoryEntry>, ClientError> {
        self.get_json(self.certification_endpoint(id, &["history"])?).await
    }

    async fn upload_slot_file(
        &self,
        id: &CertificationId,
        slot: DocumentSlot,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<SlotFile, ClientError> {
        let url = self.slot_files_endpoint(id, slot)?;
        let response = self
            .execute(|| {
                let part = multipart::Part::bytes(bytes.clone()).file_name(file_name.to_string());
                self.http.post(url.clone()).multipart(multipart::Form::new().part("file", part))
            })
            .await?;
        decode(response).await
    }

    async fn delete_slot_file(
        &self,
        id: &CertificationId,
        file_id: &str,
    ) -> Result<(), ClientError> {
        let url = self.certification_endpoint(id, &["files", file_id])?;
        self.execute(|| self.http.delete(url.clone())).await?;
        Ok(())
    }

    async fn submit_report(&self, id: &CertificationId) -> Result<(), ClientError> {
        self.post_empty(self.certification_endpoint(id, &["report", "submit"])?).await
    }

    async fn resubmit_report(&self, id: &CertificationId) -> Result<(), ClientError> {
        self.post_empty(self.certification_endpoint(id, &["report", "resubmit"])?).await
    }
}
