use super::protocol::{Empty, RpcReply};

use axum::{Json, http::StatusCode};

/// Liveness check. The tracker calls this before accepting an announce.
pub async fn handle_ping(Json(_): Json<Empty>) -> (StatusCode, Json<RpcReply<Empty>>) {
    tracing::trace!("Ping");
    RpcReply::ok(Empty {})
}
