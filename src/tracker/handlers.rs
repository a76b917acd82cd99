use super::manager::LeaseManager;
use super::protocol::*;
use super::types::*;
use crate::error::LeaseError;
use crate::rpc::protocol::{Empty, RpcReply};

use axum::{Extension, Json, http::StatusCode};
use std::sync::Arc;

pub async fn handle_announce(
    Extension(manager): Extension<Arc<LeaseManager>>,
    Json(args): Json<AnnounceArgs>,
) -> (StatusCode, Json<RpcReply<AnnounceReply>>) {
    let kind = match args.kind.parse::<WorkerKind>() {
        Ok(kind) => kind,
        Err(e) => {
            let e = LeaseError::Validation(e);
            return RpcReply::err(lease_status(&e), e);
        }
    };

    match manager.announce(args.platform, kind, &args.url).await {
        Ok(key) => RpcReply::ok(AnnounceReply { key }),
        Err(e) => RpcReply::err(lease_status(&e), e),
    }
}

pub async fn handle_remove(
    Extension(manager): Extension<Arc<LeaseManager>>,
    Json(args): Json<RemoveArgs>,
) -> (StatusCode, Json<RpcReply<Empty>>) {
    let result = match args.kind.parse::<WorkerKind>() {
        Ok(kind) => manager.remove(&args.key, kind).await,
        Err(e) => Err(LeaseError::NotFound(e)),
    };

    match result {
        Ok(()) => RpcReply::ok(Empty {}),
        Err(e) => {
            tracing::debug!("Remove of {} failed: {}", args.key, e);
            RpcReply::err(lease_status(&e), e)
        }
    }
}

pub async fn handle_lease(
    Extension(manager): Extension<Arc<LeaseManager>>,
    Json(_): Json<Empty>,
) -> (StatusCode, Json<RpcReply<WorkerPair>>) {
    match manager.lease_pair().await {
        Ok(pair) => RpcReply::ok(pair),
        Err(e) => RpcReply::err(lease_status(&e), e),
    }
}

pub fn lease_status(error: &LeaseError) -> StatusCode {
    match error {
        LeaseError::Validation(_) => StatusCode::BAD_REQUEST,
        LeaseError::Unreachable { .. } => StatusCode::BAD_GATEWAY,
        LeaseError::NotFound(_) => StatusCode::NOT_FOUND,
        LeaseError::NoneAvailable => StatusCode::SERVICE_UNAVAILABLE,
        LeaseError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
