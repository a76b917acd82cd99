use super::collector::{Outcome, ResponseCollector};
use super::protocol::ResponseReply;
use super::types::*;
use crate::error::StoreError;
use crate::rpc::protocol::RpcReply;

use axum::{Extension, Json, http::StatusCode};
use std::sync::Arc;

pub async fn handle_post(
    Extension(collector): Extension<Arc<ResponseCollector>>,
    Json(response): Json<RunnerResponse>,
) -> (StatusCode, Json<RpcReply<ResponseReply>>) {
    reply(collector.post(response).await)
}

pub async fn handle_error(
    Extension(collector): Extension<Arc<ResponseCollector>>,
    Json(response): Json<BuilderResponse>,
) -> (StatusCode, Json<RpcReply<ResponseReply>>) {
    reply(collector.error(response).await)
}

fn reply(result: Result<Outcome, StoreError>) -> (StatusCode, Json<RpcReply<ResponseReply>>) {
    match result {
        Ok(outcome) => RpcReply::ok(ResponseReply {
            accepted: outcome == Outcome::Accepted,
        }),
        Err(StoreError::NotFound(id)) => {
            RpcReply::err(StatusCode::NOT_FOUND, format!("work item {} not found", id))
        }
        Err(e) => {
            tracing::error!("Failed to store response: {}", e);
            RpcReply::err(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}
