//! HTTP client for the messaging gateway.

use std::time::Duration;

use async_trait::async_trait;
use omnimap_core::{retry_with_backoff, HttpSettings};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::auth_status::await_authenticated;
use crate::error::GatewayError;
use crate::gateway::MessagingGateway;
use crate::types::{AuthStatus, ContactList, QrCode, SendRequest, SendResponse, SessionValidity};

pub struct GatewayClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl GatewayClient {
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`GatewayError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str, settings: &HttpSettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| GatewayError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            max_retries: settings.max_retries,
            backoff_base_ms: settings.backoff_base_ms,
        })
    }

    fn endpoint(&self, name: &str, session_id: Option<&str>) -> Result<Url, GatewayError> {
        let mut url = self
            .base_url
            .join(name)
            .map_err(|e| GatewayError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        if let Some(id) = session_id {
            url.query_pairs_mut().append_pair("sessionID", id);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        name: &str,
        session_id: Option<&str>,
    ) -> Result<T, GatewayError> {
        let url = self.endpoint(name, session_id)?;
        retry_with_backoff("gateway", self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self.client.get(url).send().await?;
                Self::read_json(response, name).await
            }
        })
        .await
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: endpoint.to_owned(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GatewayError::Deserialize {
            context: endpoint.to_owned(),
            source: e,
        })
    }
}

#[async_trait]
impl MessagingGateway for GatewayClient {
    async fn send(&self, request: &SendRequest) -> Result<SendResponse, GatewayError> {
        let url = self.endpoint("send", None)?;
        let response = self.client.post(url).json(request).send().await?;
        Self::read_json(response, "send").await
    }

    async fn validate_session(&self, session_id: &str) -> Result<bool, GatewayError> {
        let validity: SessionValidity = self
            .get_json("validate-session", Some(session_id))
            .await?;
        Ok(validity.is_valid)
    }

    async fn generate_qr(&self) -> Result<QrCode, GatewayError> {
        self.get_json("generate-qr", None).await
    }

    async fn wait_for_authentication(
        &self,
        session_id: &str,
        timeout: Duration,
    ) -> Result<AuthStatus, GatewayError> {
        let url = self.endpoint("auth-status", Some(session_id))?;
        let wait = async {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, "text/event-stream")
                // The client-wide timeout covers the body too; a long-lived
                // stream needs its own.
                .timeout(timeout + Duration::from_secs(5))
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(GatewayError::UnexpectedStatus {
                    status: status.as_u16(),
                    endpoint: "auth-status".to_owned(),
                });
            }
            await_authenticated(response.bytes_stream()).await
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::AuthTimeout {
                secs: timeout.as_secs(),
            }),
        }
    }

    async fn contacts(&self, session_id: &str) -> Result<Vec<serde_json::Value>, GatewayError> {
        let list: ContactList = self.get_json("contacts", Some(session_id)).await?;
        Ok(list.contacts)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
