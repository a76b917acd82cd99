use serde::{Deserialize, Serialize};

pub const ENDPOINT_RESPONSE_POST: &str = "/response/post";
pub const ENDPOINT_RESPONSE_ERROR: &str = "/response/error";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseReply {
    /// False when the report was a duplicate or arrived too late.
    pub accepted: bool,
}
