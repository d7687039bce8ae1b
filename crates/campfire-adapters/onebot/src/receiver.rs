//! Event receiver: the HTTP endpoint OneBot posts events to.

use std::net::SocketAddr;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use campfire_core::{BoxedDispatcher, BoxedTransport};

use crate::error::OneBotResult;
use crate::model::parse_event;

/// Path used when none is configured.
pub const DEFAULT_EVENT_PATH: &str = "/onebot";

/// Shared state of the receiver route.
#[derive(Clone)]
pub struct ReceiverState {
    dispatcher: BoxedDispatcher,
    transport: BoxedTransport,
}

impl ReceiverState {
    /// Inbound units are handed to `dispatcher`; replies go out through
    /// `transport`.
    pub fn new(dispatcher: BoxedDispatcher, transport: BoxedTransport) -> Self {
        Self {
            dispatcher,
            transport,
        }
    }
}

/// Builds the receiver route at `path`.
pub fn router(path: &str, state: ReceiverState) -> Router {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Router::new()
        .route(&path, post(receive_event))
        .with_state(state)
}

/// Serves `app` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> OneBotResult<()> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, "OneBot event receiver listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await?;
    info!(addr = %addr, "OneBot event receiver stopped");
    Ok(())
}

async fn receive_event(
    State(state): State<ReceiverState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Response {
    trace!(remote_addr = %addr, len = body.len(), "Received event post");

    match parse_event(&body) {
        Ok(Some(message)) => {
            debug!(
                kind = message.kind_name(),
                actor = message.actor_id(),
                "Dispatching event"
            );
            state
                .dispatcher
                .dispatch(message, state.transport.clone())
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            warn!(remote_addr = %addr, error = %e, "Malformed event post");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
