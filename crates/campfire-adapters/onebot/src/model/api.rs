//! API request parameters and the response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use campfire_core::{TransportError, TransportResult};

use super::segment::WireSegment;

/// Parameters of `send_private_msg`.
#[derive(Debug, Clone, Serialize)]
pub struct SendPrivateMsg {
    pub user_id: i64,
    pub message: Vec<WireSegment>,
}

/// Parameters of `send_group_msg`.
#[derive(Debug, Clone, Serialize)]
pub struct SendGroupMsg {
    pub group_id: i64,
    pub message: Vec<WireSegment>,
}

/// Envelope of every API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    /// `ok`, `async` or `failed`.
    pub status: String,
    pub retcode: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub wording: Option<String>,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "async") && self.retcode == 0
    }

    /// Returns `data`, or the platform's complaint as
    /// [`TransportError::Rejected`].
    pub fn into_result(self) -> TransportResult<Value> {
        if self.is_ok() {
            return Ok(self.data);
        }
        let message = self
            .wording
            .filter(|w| !w.is_empty())
            .or(self.msg)
            .unwrap_or(self.status);
        Err(TransportError::Rejected {
            status: self.retcode,
            message,
        })
    }
}
