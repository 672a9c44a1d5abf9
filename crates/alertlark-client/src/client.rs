//! HTTP client for the Lark Open Platform.
//!
//! Authenticates with an app id and secret, caches the tenant access token
//! and implements [`Messenger`] on top of the IM and contact APIs.

use std::time::{Duration, Instant};

use alertlark_core::{Messenger, UserProfile};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{LarkError, Result};

/// Default Lark Open Platform endpoint.
pub const DEFAULT_BASE_URL: &str = "https://open.larksuite.com";

/// Tokens are refreshed this long before Lark says they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(180);

/// Settings for [`LarkClient`].
#[derive(Debug, Clone)]
pub struct LarkConfig {
    /// App id of the bot.
    pub app_id: String,
    /// App secret of the bot.
    pub app_secret: String,
    /// API endpoint.
    pub base_url: String,
    /// Deadline for every request.
    pub timeout: Duration,
}

impl LarkConfig {
    /// Creates a configuration with the default endpoint and a 10 second deadline.
    #[must_use]
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Envelope every Lark API response shares.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn into_data(self) -> Result<Option<T>> {
        if self.code == 0 {
            Ok(self.data)
        } else {
            Err(LarkError::Api {
                code: self.code,
                msg: self.msg,
            })
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: String,
    #[serde(default)]
    expire: u64,
}

#[derive(Debug, Serialize)]
struct CreateMessageBody<'a> {
    receive_id: &'a str,
    msg_type: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ReplyMessageBody<'a> {
    msg_type: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    reply_in_thread: bool,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageData {
    #[serde(default)]
    message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    user: LarkUser,
}

#[derive(Debug, Deserialize)]
struct LarkUser {
    #[serde(default)]
    open_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.refresh_at
    }
}

/// Lark Open Platform client.
///
/// Build once and share behind an `Arc`; the token cache is internal.
#[derive(Debug)]
pub struct LarkClient {
    http: Client,
    base_url: Url,
    app_id: String,
    app_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl LarkClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(config: LarkConfig) -> Result<Self> {
        let mut base_url =
            Url::parse(&config.base_url).map_err(|e| LarkError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(LarkError::InvalidUrl(config.base_url));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder().timeout(config.timeout).build()?;

        info!(base_url = %base_url, app_id = %config.app_id, "created lark client");
        Ok(Self {
            http,
            base_url,
            app_id: config.app_id,
            app_secret: config.app_secret,
            token: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| LarkError::InvalidUrl(e.to_string()))
    }

    /// Builds `path/{id}/{tail..}` with `id` encoded as a single segment.
    fn resource(&self, path: &str, id: &str, tail: &[&str]) -> Result<Url> {
        if matches!(id, "" | "." | "..") {
            return Err(LarkError::InvalidUrl(format!("invalid resource id {id:?}")));
        }
        let mut url = self.endpoint(path)?;
        url.path_segments_mut()
            .map_err(|()| LarkError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(id)
            .extend(tail);
        Ok(url)
    }

    /// Returns a valid tenant access token, fetching a new one if the cached
    /// token is missing or about to expire.
    ///
    /// Concurrent callers wait on the same refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint fails or rejects the app credentials.
    pub async fn tenant_access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        debug!(app_id = %self.app_id, "fetching tenant access token");
        let url = self.endpoint("open-apis/auth/v3/tenant_access_token/internal")?;
        let response: TokenResponse = self
            .http
            .post(url)
            .json(&TokenRequest {
                app_id: &self.app_id,
                app_secret: &self.app_secret,
            })
            .send()
            .await?
            .json()
            .await?;

        if response.code != 0 {
            warn!(code = response.code, msg = %response.msg, "tenant access token rejected");
            return Err(LarkError::Api {
                code: response.code,
                msg: response.msg,
            });
        }
        if response.tenant_access_token.is_empty() {
            return Err(LarkError::MissingField("tenant_access_token"));
        }

        let lifetime = Duration::from_secs(response.expire).saturating_sub(TOKEN_REFRESH_MARGIN);
        info!(expire_secs = response.expire, "fetched tenant access token");
        Ok(CachedToken {
            value: response.tenant_access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Sends an authenticated request and unwraps the response envelope.
    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>> {
        let token = self.tenant_access_token().await?;
        let envelope: ApiResponse<T> = request.bearer_auth(token).send().await?.json().await?;

        match envelope.into_data() {
            Err(err) if err.is_token_error() => {
                warn!(error = %err, "tenant access token rejected, dropping cache");
                self.invalidate_token().await;
                Err(err)
            }
            other => other,
        }
    }

    /// Posts an interactive card to a chat and returns the new message id.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-zero API code or a
    /// response without a message id.
    pub async fn create_message(&self, chat_id: &str, card: &str) -> Result<String> {
        let mut url = self.endpoint("open-apis/im/v1/messages")?;
        url.query_pairs_mut().append_pair("receive_id_type", "chat_id");

        let data: Option<MessageData> = self
            .call(self.http.post(url).json(&CreateMessageBody {
                receive_id: chat_id,
                msg_type: "interactive",
                content: card,
            }))
            .await?;

        data.and_then(|d| d.message_id)
            .filter(|id| !id.is_empty())
            .ok_or(LarkError::MissingField("data.message_id"))
    }

    /// Replies to a message.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-zero API code.
    pub async fn reply_message(
        &self,
        message_id: &str,
        msg_type: &str,
        content: &str,
        in_thread: bool,
    ) -> Result<()> {
        let url = self.resource("open-apis/im/v1/messages", message_id, &["reply"])?;
        let _: Option<MessageData> = self
            .call(self.http.post(url).json(&ReplyMessageBody {
                msg_type,
                content,
                reply_in_thread: in_thread,
            }))
            .await?;
        Ok(())
    }

    /// Fetches a user's contact profile by open id.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-zero API code or a
    /// response without a user.
    pub async fn get_user(&self, open_id: &str) -> Result<UserProfile> {
        let mut url = self.resource("open-apis/contact/v3/users", open_id, &[])?;
        url.query_pairs_mut().append_pair("user_id_type", "open_id");

        let data: Option<UserData> = self.call(self.http.get(url)).await?;
        let user = data.ok_or(LarkError::MissingField("data.user"))?.user;
        Ok(UserProfile {
            open_id: user.open_id.unwrap_or_else(|| open_id.to_string()),
            name: user.name,
            email: user.email.filter(|e| !e.is_empty()),
        })
    }
}

impl Messenger for LarkClient {
    async fn send_new_message(&self, channel: &str, content: &str) -> alertlark_core::Result<String> {
        Ok(self.create_message(channel, content).await?)
    }

    async fn reply_in_thread(&self, message_id: &str, content: &str) -> alertlark_core::Result<()> {
        Ok(self
            .reply_message(message_id, "interactive", content, true)
            .await?)
    }

    async fn reply_text(&self, message_id: &str, text: &str) -> alertlark_core::Result<()> {
        let content = serde_json::to_string(&TextContent { text }).map_err(LarkError::from)?;
        Ok(self.reply_message(message_id, "text", &content, false).await?)
    }

    async fn lookup_user(&self, open_id: &str) -> alertlark_core::Result<UserProfile> {
        Ok(self.get_user(open_id).await?)
    }
}
