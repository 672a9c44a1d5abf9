//! Alert source collaborator and its Alertmanager API v2 implementation.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CoreError, Result};
use crate::types::{SilenceRequest, SourceAlert};

/// Queries alerts and creates silences on the alert source.
pub trait AlertSource: Send + Sync {
    /// Returns the alerts whose fingerprint equals `fingerprint`.
    ///
    /// An empty list means the alert source does not know the alert.
    fn alerts_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> impl Future<Output = Result<Vec<SourceAlert>>> + Send;

    /// Submits a silence and returns the id the alert source assigned.
    fn create_silence(
        &self,
        request: &SilenceRequest,
    ) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Deserialize)]
struct PostSilenceResponse {
    #[serde(rename = "silenceID")]
    silence_id: String,
}

/// HTTP client for the Alertmanager v2 API.
#[derive(Debug, Clone)]
pub struct AlertmanagerClient {
    http: Client,
    base_url: Url,
}

impl AlertmanagerClient {
    /// Creates a client for `host`.
    ///
    /// `host` may be a bare `host:port` (http is assumed) or a full URL.
    ///
    /// # Errors
    ///
    /// Returns an alert-source error if the host is not a valid URL or the
    /// HTTP client cannot be built.
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let base = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        let mut base_url = Url::parse(&base)
            .map_err(|e| CoreError::alert_source(format!("invalid alertmanager host {host}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::alert_source(e.to_string()))?;

        info!(base_url = %base_url, "created alertmanager client");
        Ok(Self { http, base_url })
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| CoreError::alert_source(e.to_string()))
    }

    /// Lists every alert known to Alertmanager.
    ///
    /// # Errors
    ///
    /// Returns an alert-source error on transport failure, a non-success
    /// status or an undecodable body.
    pub async fn list_alerts(&self) -> Result<Vec<SourceAlert>> {
        let url = self.endpoint("api/v2/alerts")?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CoreError::alert_source(e.to_string()))?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| CoreError::alert_source(format!("invalid alerts response: {e}")))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CoreError::alert_source(format!(
        "alertmanager returned {status}: {body}"
    )))
}

impl AlertSource for AlertmanagerClient {
    async fn alerts_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<SourceAlert>> {
        let alerts = self.list_alerts().await?;
        let matched: Vec<SourceAlert> = alerts
            .into_iter()
            .find(|alert| alert.fingerprint == fingerprint)
            .into_iter()
            .collect();

        if matched.is_empty() {
            info!(fingerprint, "alert fingerprint not found");
        } else {
            debug!(fingerprint, labels = ?matched[0].labels, "alert fingerprint found");
        }
        Ok(matched)
    }

    async fn create_silence(&self, request: &SilenceRequest) -> Result<String> {
        for matcher in &request.matchers {
            debug!(
                name = %matcher.name,
                value = %matcher.value,
                is_regex = matcher.is_regex,
                "silence matcher"
            );
        }

        let url = self.endpoint("api/v2/silences")?;
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::alert_source(e.to_string()))?;
        let response = match check_status(response).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "failed to post silence");
                return Err(err);
            }
        };

        let body: PostSilenceResponse = response
            .json()
            .await
            .map_err(|e| CoreError::alert_source(format!("invalid silence response: {e}")))?;
        Ok(body.silence_id)
    }
}
