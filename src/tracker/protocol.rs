//! Tracker RPC Contracts
//!
//! The worker kind travels as a string so that an unknown kind can be reported
//! as a validation failure (announce) or a missing record (remove) instead of a
//! decoding error.

use super::types::*;
use serde::{Deserialize, Serialize};

pub const ENDPOINT_ANNOUNCE: &str = "/tracker/announce";
pub const ENDPOINT_REMOVE: &str = "/tracker/remove";
pub const ENDPOINT_LEASE: &str = "/tracker/lease";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnounceArgs {
    pub platform: Platform,
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnounceReply {
    pub key: LeaseKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveArgs {
    pub key: LeaseKey,
    pub kind: String,
}
