//! Thin client for the Fivetran v1 REST API.
//!
//! Every response shares the `{code, message, data}` envelope. Successful
//! responses are decoded from `data`; anything else becomes
//! [`FivetranError::Api`] with the upstream code and message preserved.

mod connections;
mod destinations;
mod error;
mod groups;
pub mod models;
mod schemas;
mod users;
mod webhooks;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

pub use error::FivetranError;
pub use users::MembershipKind;

use models::Page;

pub const FIVETRAN_API_BASE: &str = "https://api.fivetran.com/v1";

const PAGE_LIMIT: u32 = 1000;

#[derive(Clone)]
pub struct FivetranClient {
    client: reqwest::Client,
    api_key: String,
    api_secret: String,
    base_url: String,
}

impl FivetranClient {
    pub fn new(api_key: String, api_secret: String) -> Result<Self, FivetranError> {
        Self::with_base_url(api_key, api_secret, FIVETRAN_API_BASE.to_string())
    }

    /// NOTE: also used by tests to point the client at a mock server.
    pub fn with_base_url(
        api_key: String,
        api_secret: String,
        base_url: String,
    ) -> Result<Self, FivetranError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json;version=2"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!(
                "hemmer-provider-fivetran/",
                env!("CARGO_PKG_VERSION")
            )),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_key,
            api_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &str,
    ) -> Result<T, FivetranError> {
        self.send(self.request(Method::GET, path), context).await
    }

    pub(crate) async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        context: &str,
    ) -> Result<T, FivetranError> {
        self.send(self.request(Method::POST, path).json(body), context)
            .await
    }

    pub(crate) async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        context: &str,
    ) -> Result<T, FivetranError> {
        self.send(self.request(Method::PATCH, path).json(body), context)
            .await
    }

    pub(crate) async fn delete(&self, path: &str, context: &str) -> Result<(), FivetranError> {
        self.send::<serde_json::Value>(self.request(Method::DELETE, path), context)
            .await
            .map(|_| ())
    }

    /// Follow `next_cursor` until the listing is exhausted.
    pub(crate) async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &str,
    ) -> Result<Vec<T>, FivetranError> {
        let mut all_items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let url = match &cursor {
                Some(c) => format!(
                    "{}?limit={}&cursor={}",
                    path,
                    PAGE_LIMIT,
                    urlencoding::encode(c)
                ),
                None => format!("{}?limit={}", path, PAGE_LIMIT),
            };

            let page: Page<T> = self.get(&url, context).await?;
            all_items.extend(page.items);

            match page.next_cursor.filter(|c| !c.is_empty()) {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        Ok(all_items)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, path = %path, "Fivetran API request");
        self.client
            .request(method, url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<T, FivetranError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // Proxies and load balancers answer with HTML or plain text.
            let body: serde_json::Value =
                serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
            let code = body
                .get("code")
                .and_then(|c| c.as_str())
                .unwrap_or("Unknown")
                .to_string();
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or(text);

            return Err(FivetranError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let body: serde_json::Value = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| FivetranError::Decode {
                context: context.to_string(),
                message: format!("invalid JSON ({}): {}", status.as_u16(), e),
            })?
        };

        let data = body
            .get("data")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        serde_json::from_value(data).map_err(|e| FivetranError::Decode {
            context: context.to_string(),
            message: e.to_string(),
        })
    }
}

impl std::fmt::Debug for FivetranClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FivetranClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}
