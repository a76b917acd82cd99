//! RPC Client
//!
//! HTTP/JSON transport for calls between the orchestrator and its workers.
//! Transport failures are retried with capped exponential backoff and jitter;
//! error replies from the remote side are not retried.

use super::protocol::{ENDPOINT_PING, Empty, RpcReply, endpoint_url};
use crate::config::RpcConfig;
use crate::error::RpcError;
use crate::queue::protocol::{
    ENDPOINT_BUILDER_POP, ENDPOINT_BUILDER_PUSH, ENDPOINT_RUNNER_POP, ENDPOINT_RUNNER_PUSH,
};
use crate::queue::types::{BuilderTask, PopRequest, RunnerTask};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// The calls the orchestrator makes on workers.
#[async_trait]
pub trait WorkerClient: Send + Sync {
    /// No-op round-trip proving the worker answers RPC.
    async fn ping(&self, url: &str) -> Result<(), RpcError>;

    /// Pushes a task onto the builder queue hosted at `url`.
    async fn push_builder_task(&self, url: &str, task: &BuilderTask) -> Result<(), RpcError>;
}

#[derive(Clone)]
pub struct HttpRpcClient {
    http_client: reqwest::Client,
    timeout: Duration,
    retries: usize,
}

impl HttpRpcClient {
    pub fn new(config: &RpcConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout: config.timeout(),
            retries: config.retries.max(1),
        }
    }

    /// Calls `endpoint` on `base`, retrying transport failures.
    pub async fn call<A, R>(&self, base: &str, endpoint: &str, args: &A) -> Result<R, RpcError>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.call_with(base, endpoint, args, self.timeout, self.retries)
            .await
    }

    /// Calls `endpoint` exactly once.
    pub async fn call_once<A, R>(&self, base: &str, endpoint: &str, args: &A) -> Result<R, RpcError>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.call_with(base, endpoint, args, self.timeout, 1).await
    }

    async fn call_with<A, R>(
        &self,
        base: &str,
        endpoint: &str,
        args: &A,
        timeout: Duration,
        attempts: usize,
    ) -> Result<R, RpcError>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = endpoint_url(base, endpoint);
        let response = self.post_with_retry(&url, args, timeout, attempts).await?;
        decode_reply(response).await?.ok_or_else(|| RpcError::Remote("empty reply".to_string()))
    }

    /// Pops one builder task from the queue at `base`, waiting up to `wait`.
    pub async fn pop_builder_task(
        &self,
        base: &str,
        wait: Duration,
    ) -> Result<Option<BuilderTask>, RpcError> {
        self.pop(base, ENDPOINT_BUILDER_POP, wait).await
    }

    pub async fn pop_runner_task(
        &self,
        base: &str,
        wait: Duration,
    ) -> Result<Option<RunnerTask>, RpcError> {
        self.pop(base, ENDPOINT_RUNNER_POP, wait).await
    }

    /// Hands a packaged build to the paired runner's queue.
    pub async fn push_runner_task(&self, base: &str, task: &RunnerTask) -> Result<(), RpcError> {
        let _: Empty = self.call_once(base, ENDPOINT_RUNNER_PUSH, task).await?;
        Ok(())
    }

    async fn pop<R: DeserializeOwned>(
        &self,
        base: &str,
        endpoint: &str,
        wait: Duration,
    ) -> Result<Option<R>, RpcError> {
        let url = endpoint_url(base, endpoint);
        let request = PopRequest {
            wait_secs: Some(wait.as_secs()),
        };
        // The server holds the request open for up to `wait`.
        let response = self
            .post_with_retry(&url, &request, wait + self.timeout, 1)
            .await?;

        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        decode_reply(response).await
    }

    async fn post_with_retry<T: Serialize + Sync>(
        &self,
        url: &str,
        payload: &T,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response, RpcError> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .post(url)
                .json(payload)
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(RpcError::Transport(e));
                    }
                    tracing::debug!("POST {} failed (attempt {}): {}", url, attempt + 1, e);
                    // Jitter keeps retrying callers from synchronising.
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(RpcError::Remote("retry attempts exhausted".to_string()))
    }
}

async fn decode_reply<R: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Option<R>, RpcError> {
    let status = response.status();
    let reply = response.json::<RpcReply<R>>().await;

    match reply {
        Ok(RpcReply {
            error: Some(error), ..
        }) => Err(RpcError::Remote(error)),
        Ok(_) if !status.is_success() => Err(RpcError::Status(status.as_u16())),
        Ok(RpcReply { result, .. }) => Ok(result),
        Err(_) if !status.is_success() => Err(RpcError::Status(status.as_u16())),
        Err(e) => Err(RpcError::Transport(e)),
    }
}

#[async_trait]
impl WorkerClient for HttpRpcClient {
    async fn ping(&self, url: &str) -> Result<(), RpcError> {
        let _: Empty = self.call(url, ENDPOINT_PING, &Empty {}).await?;
        Ok(())
    }

    async fn push_builder_task(&self, url: &str, task: &BuilderTask) -> Result<(), RpcError> {
        let _: Empty = self.call_once(url, ENDPOINT_BUILDER_PUSH, task).await?;
        tracing::debug!("Pushed attempt {} to builder {}", task.attempt_id, url);
        Ok(())
    }
}
