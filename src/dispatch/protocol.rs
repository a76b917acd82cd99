use super::types::ItemId;
use super::work::Work;
use serde::{Deserialize, Serialize};

pub const ENDPOINT_DISPATCH_WORK: &str = "/dispatch/work";
pub const ENDPOINT_DISPATCH_NOTIFICATIONS: &str = "/dispatch/notifications";
pub const ENDPOINT_WORK: &str = "/work";
pub const ENDPOINT_WORK_STATUS: &str = "/work/:id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub work: Work,
    /// Submission as received; defaults to the serialized `work`.
    #[serde(default)]
    pub raw_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueReply {
    pub id: ItemId,
}

/// Summary of one triggered reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DispatchReply {
    pub claimed: usize,
    pub completed: usize,
    pub exhausted: usize,
    pub contended: usize,
    pub failed: usize,
    pub first_error: Option<String>,
}
