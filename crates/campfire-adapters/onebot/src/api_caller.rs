//! Outbound API calls over OneBot's HTTP API.
//!
//! Each call is a `POST {api_url}/{action}` with the parameters as the JSON
//! body; the HTTP response body is the [`ApiResponse`] envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use campfire_core::{ChatTransport, Segment, TransportError, TransportResult};

use crate::error::{OneBotError, OneBotResult};
use crate::model::{ApiResponse, SendGroupMsg, SendPrivateMsg, to_wire};

/// Request timeout used when none is configured.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the OneBot HTTP API.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base URL, e.g. `http://127.0.0.1:3000`.
    pub api_url: String,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

/// [`ChatTransport`] backed by the OneBot HTTP API.
#[derive(Debug, Clone)]
pub struct HttpApiCaller {
    client: Client,
    api_url: String,
    access_token: Option<String>,
}

impl HttpApiCaller {
    pub fn new(settings: &ApiSettings) -> OneBotResult<Self> {
        let api_url = settings.api_url.trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(OneBotError::InvalidApiUrl {
                url: settings.api_url.clone(),
            });
        }
        let client = ClientBuilder::new().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            api_url,
            access_token: settings.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Calls `action` and returns the response `data`.
    pub async fn call<P>(&self, action: &str, params: &P) -> TransportResult<Value>
    where
        P: Serialize + Sync,
    {
        let url = format!("{}/{}", self.api_url, action);
        debug!(action = %action, "Calling OneBot API via HTTP");

        let mut req = self.client.post(&url).json(params);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: i64::from(status.as_u16()),
                message: text,
            });
        }

        let envelope: ApiResponse = resp
            .json()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        envelope.into_result()
    }
}

#[async_trait]
impl ChatTransport for HttpApiCaller {
    async fn send_private(&self, user_id: i64, segments: Vec<Segment>) -> TransportResult<()> {
        let params = SendPrivateMsg {
            user_id,
            message: to_wire(&segments),
        };
        self.call("send_private_msg", &params).await?;
        Ok(())
    }

    async fn send_group(&self, group_id: i64, segments: Vec<Segment>) -> TransportResult<()> {
        let params = SendGroupMsg {
            group_id,
            message: to_wire(&segments),
        };
        self.call("send_group_msg", &params).await?;
        Ok(())
    }
}
