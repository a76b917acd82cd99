use super::handoff::HandoffQueue;
use super::types::*;
use crate::rpc::protocol::{Empty, RpcReply};

use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub async fn handle_builder_push(
    Extension(queues): Extension<Arc<WorkerQueues>>,
    Json(task): Json<BuilderTask>,
) -> (StatusCode, Json<RpcReply<Empty>>) {
    tracing::debug!(
        "Builder task {} queued for work item {}",
        task.attempt_id,
        task.key
    );
    queues.builder.push(task);
    RpcReply::ok(Empty {})
}

pub async fn handle_runner_push(
    Extension(queues): Extension<Arc<WorkerQueues>>,
    Json(task): Json<RunnerTask>,
) -> (StatusCode, Json<RpcReply<Empty>>) {
    tracing::debug!(
        "Runner task {} queued for work item {}",
        task.attempt_id,
        task.key
    );
    queues.runner.push(task);
    RpcReply::ok(Empty {})
}

pub async fn handle_builder_pop(
    Extension(queues): Extension<Arc<WorkerQueues>>,
    Json(req): Json<PopRequest>,
) -> Response {
    let wait = pop_wait(&queues, &req);
    pop_reply(&queues.builder, wait).await
}

pub async fn handle_runner_pop(
    Extension(queues): Extension<Arc<WorkerQueues>>,
    Json(req): Json<PopRequest>,
) -> Response {
    let wait = pop_wait(&queues, &req);
    pop_reply(&queues.runner, wait).await
}

fn pop_wait(queues: &WorkerQueues, req: &PopRequest) -> Duration {
    req.wait_secs
        .map(Duration::from_secs)
        .unwrap_or(queues.pop_wait)
}

/// Long-polls `queue`. An empty wait answers `204 No Content`; the pop is
/// cancel-safe, so a client that hangs up early loses nothing.
async fn pop_reply<T: Serialize + Send>(queue: &HandoffQueue<T>, wait: Duration) -> Response {
    match queue.pop_timeout(wait).await {
        Some(task) => RpcReply::ok(task).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
