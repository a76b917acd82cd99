//! RPC Wire Format
//!
//! Every RPC method is an HTTP `POST` of a JSON argument to a fixed path. Replies
//! use one envelope so errors survive the trip as plain strings.

use axum::Json;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

pub const ENDPOINT_PING: &str = "/rpc/ping";

/// Argument or result of methods that carry no data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Empty {}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcReply<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> RpcReply<T> {
    pub fn ok(result: T) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                result: Some(result),
                error: None,
            }),
        )
    }

    pub fn err(status: StatusCode, error: impl ToString) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                result: None,
                error: Some(error.to_string()),
            }),
        )
    }
}

/// Joins a worker or tracker base URL with an endpoint path.
pub fn endpoint_url(base: &str, endpoint: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), endpoint)
}
