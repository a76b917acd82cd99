use super::engine::{ReconcileEngine, ReconcileReport};
use super::notification::Notification;
use super::protocol::*;
use super::types::*;
use super::work::{WorkItem, enqueue};
use crate::rpc::protocol::{Empty, RpcReply};

use axum::{Extension, Json, extract::Path, http::StatusCode};
use std::sync::Arc;

pub async fn handle_enqueue(
    Extension(engine): Extension<Arc<ReconcileEngine<WorkItem>>>,
    Json(req): Json<EnqueueRequest>,
) -> (StatusCode, Json<RpcReply<EnqueueReply>>) {
    let raw_data = match req.raw_data {
        Some(raw) => raw,
        None => serde_json::to_value(&req.work).unwrap_or_default(),
    };

    match enqueue(&engine, req.work, raw_data).await {
        Ok(id) => RpcReply::ok(EnqueueReply { id }),
        Err(e) => {
            tracing::error!("Failed to enqueue work: {}", e);
            RpcReply::err(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

pub async fn handle_work_status(
    Extension(engine): Extension<Arc<ReconcileEngine<WorkItem>>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<RpcReply<WorkItem>>) {
    match engine.store().find_by_id(&ItemId(id.clone())).await {
        Ok(Some(item)) => RpcReply::ok(item),
        Ok(None) => RpcReply::err(StatusCode::NOT_FOUND, format!("work item {} not found", id)),
        Err(e) => RpcReply::err(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// Runs one work pass now. Safe to call repeatedly.
pub async fn handle_dispatch_work(
    Extension(engine): Extension<Arc<ReconcileEngine<WorkItem>>>,
    Json(_): Json<Empty>,
) -> (StatusCode, Json<RpcReply<DispatchReply>>) {
    run_pass(&engine).await
}

pub async fn handle_dispatch_notifications(
    Extension(engine): Extension<Arc<ReconcileEngine<Notification>>>,
    Json(_): Json<Empty>,
) -> (StatusCode, Json<RpcReply<DispatchReply>>) {
    run_pass(&engine).await
}

async fn run_pass<T: Claimable>(
    engine: &ReconcileEngine<T>,
) -> (StatusCode, Json<RpcReply<DispatchReply>>) {
    match engine.reconcile().await {
        Ok(report) => RpcReply::ok(summarize(&report)),
        Err(e) => {
            tracing::error!("Triggered pass aborted: {}", e);
            RpcReply::err(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

fn summarize(report: &ReconcileReport) -> DispatchReply {
    DispatchReply {
        claimed: report.claimed.len(),
        completed: report.completed.len(),
        exhausted: report.exhausted.len(),
        contended: report.contended,
        failed: report.failures.len(),
        first_error: report.first_error().map(|e| e.to_string()),
    }
}
