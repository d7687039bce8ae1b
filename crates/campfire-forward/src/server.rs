//! HTTP bridge polled by the game server.
//!
//! | Route            | Effect                                                   |
//! |------------------|----------------------------------------------------------|
//! | `GET /get_msg`   | drains the queue and returns it as a JSON array          |
//! | `POST /send_msg` | sends `"<user> (<survivor>) : <message>"` to bound groups |
//!
//! Every route sits behind an IP allow-list; an empty list lets every client
//! through.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use campfire_core::{BoxedTransport, text_segments};

use crate::error::{ForwardError, ForwardResult};
use crate::queue::{Message, MsgQueue};

/// Body of the 403 response for clients outside the allow-list.
pub const IP_DENIED_MESSAGE: &str = "访问被拒绝：IP不在白名单中";

/// A chat line from the game, as posted to `/send_msg`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameMessage {
    /// Player name.
    pub user_name: String,
    /// Character name, e.g. `Wendy`.
    pub survivors_name: String,
    /// Klei account id.
    pub klei_id: String,
    pub message: String,
}

impl GameMessage {
    /// Renders the line sent to the chat.
    pub fn render(&self) -> String {
        format!("{} ({}) : {}", self.user_name, self.survivors_name, self.message)
    }
}

/// Shared state of the bridge routes.
#[derive(Clone)]
pub struct BridgeState {
    queue: Arc<MsgQueue>,
    transport: BoxedTransport,
    bind_groups: Arc<[i64]>,
}

impl BridgeState {
    pub fn new(queue: Arc<MsgQueue>, transport: BoxedTransport, bind_groups: Vec<i64>) -> Self {
        Self {
            queue,
            transport,
            bind_groups: bind_groups.into(),
        }
    }
}

/// Client addresses allowed to use the bridge.
#[derive(Debug, Clone, Default)]
pub struct IpAllowList {
    ips: Arc<HashSet<IpAddr>>,
}

impl IpAllowList {
    /// Parses textual addresses such as `127.0.0.1` or `::1`.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> ForwardResult<Self> {
        let ips = entries
            .iter()
            .map(|entry| {
                let entry = entry.as_ref().trim();
                entry
                    .parse::<IpAddr>()
                    .map_err(|_| ForwardError::InvalidAllowedIp {
                        value: entry.to_string(),
                    })
            })
            .collect::<ForwardResult<HashSet<_>>>()?;
        Ok(Self { ips: Arc::new(ips) })
    }

    /// Returns `true` if `ip` may connect. Everyone may when the list is
    /// empty.
    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        if self.ips.is_empty() {
            return true;
        }
        let ip = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
            v4 => v4,
        };
        self.ips.contains(&ip)
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty()
    }
}

/// Builds the bridge routes.
pub fn router(state: BridgeState, allow_list: IpAllowList) -> Router {
    if allow_list.is_empty() {
        debug!("Bridge IP allow-list is empty, accepting every client");
    }
    Router::new()
        .route("/send_msg", post(send_msg))
        .route("/get_msg", get(get_msg))
        .layer(middleware::from_fn_with_state(allow_list, ip_gate))
        .with_state(state)
}

/// Serves `app` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> ForwardResult<()> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, "Bridge listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await?;
    info!(addr = %addr, "Bridge stopped");
    Ok(())
}

async fn ip_gate(
    State(allow_list): State<IpAllowList>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if allow_list.is_allowed(addr.ip()) {
        return next.run(request).await;
    }
    warn!(remote_addr = %addr, path = %request.uri().path(), "Bridge client rejected");
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({ "error": IP_DENIED_MESSAGE })),
    )
        .into_response()
}

async fn send_msg(
    State(state): State<BridgeState>,
    payload: Result<Json<GameMessage>, JsonRejection>,
) -> Response {
    let msg = match payload {
        Ok(Json(msg)) => msg,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Rejected game message");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    let text = msg.render();
    debug!(klei_id = %msg.klei_id, groups = state.bind_groups.len(), "Relaying game message");
    for &group_id in state.bind_groups.iter() {
        if let Err(e) = state
            .transport
            .send_group(group_id, text_segments(text.clone()))
            .await
        {
            warn!(group_id, error = %e, "Failed to relay game message");
        }
    }
    StatusCode::OK.into_response()
}

async fn get_msg(State(state): State<BridgeState>) -> Json<Vec<Message>> {
    Json(state.queue.drain())
}
