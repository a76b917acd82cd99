//! RPC Transport
//!
//! Synchronous request/reply calls between the orchestrator and workers, carried
//! as JSON over HTTP `POST`. Errors cross the wire as the `error` field of
//! [`protocol::RpcReply`].

pub mod protocol;
pub mod client;
pub mod handlers;

pub use client::{HttpRpcClient, WorkerClient};
