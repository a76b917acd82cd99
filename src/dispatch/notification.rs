//! Notifications
//!
//! One notification is created per test result that asked to be reported. It is
//! a second claimable entity driven by the same [`ReconcileEngine`] as work
//! items, with a shorter policy and an in-process delivery: deciding whether to
//! notify and sending to the configured targets both happen inside the claim, so
//! a successful pass completes the notification right away.
//!
//! [`ReconcileEngine`]: super::engine::ReconcileEngine

use super::engine::{Delivery, Dispatcher};
use super::types::*;
use crate::error::DispatchError;
use crate::response::types::{TestResult, TestStatus};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// When a test result is worth reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifyOn {
    Pass,
    Fail,
    Error,
    WontBuild,
    /// Anything but a pass.
    Problem,
    Always,
    /// The status differs from the previous result for the same import path.
    Change,
}

impl NotifyOn {
    pub fn should_notify(self, status: TestStatus, previous: Option<TestStatus>) -> bool {
        match self {
            NotifyOn::Pass => status == TestStatus::Pass,
            NotifyOn::Fail => status == TestStatus::Fail,
            NotifyOn::Error => status == TestStatus::Error,
            NotifyOn::WontBuild => status == TestStatus::WontBuild,
            NotifyOn::Problem => status.is_problem(),
            NotifyOn::Always => true,
            NotifyOn::Change => previous.is_some_and(|prev| prev != status),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifyConfig {
    /// Webhook target; empty means none.
    #[serde(default)]
    pub notify_url: String,
    /// Chat address; empty means none.
    #[serde(default)]
    pub notify_chat: String,
    pub notify_on: NotifyOn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationAttempt {
    pub id: AttemptId,
    pub started_at: DateTime<Utc>,
}

impl AttemptRecord for NotificationAttempt {
    fn attempt_id(&self) -> &AttemptId {
        &self.id
    }

    fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: ItemId,
    pub test: TestResult,
    /// Status of the previous result for the same import path, if any.
    pub previous: Option<TestStatus>,
    pub config: NotifyConfig,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub claim: ClaimState<NotificationAttempt>,
}

impl Notification {
    pub fn new(test: TestResult, previous: Option<TestStatus>, config: NotifyConfig) -> Self {
        Self {
            id: ItemId::new(),
            test,
            previous,
            config,
            created_at: Utc::now(),
            claim: ClaimState::waiting(),
        }
    }

    pub fn should_notify(&self) -> bool {
        self.config
            .notify_on
            .should_notify(self.test.status, self.previous)
    }
}

impl Claimable for Notification {
    type Attempt = NotificationAttempt;

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn claim(&self) -> &ClaimState<NotificationAttempt> {
        &self.claim
    }

    fn claim_mut(&mut self) -> &mut ClaimState<NotificationAttempt> {
        &mut self.claim
    }
}

/// Delivers a test result to one kind of target.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_url(&self, url: &str, test: &TestResult) -> Result<(), String>;

    async fn send_chat(&self, address: &str, test: &TestResult) -> Result<(), String>;
}

/// Sender that only logs what it would deliver.
pub struct TracingSender;

#[async_trait]
impl NotificationSender for TracingSender {
    async fn send_url(&self, url: &str, test: &TestResult) -> Result<(), String> {
        tracing::info!(
            "Notify {}: {} is {} at {}",
            url,
            test.import_path,
            test.status,
            test.revision
        );
        Ok(())
    }

    async fn send_chat(&self, address: &str, test: &TestResult) -> Result<(), String> {
        tracing::info!(
            "Notify chat {}: {} is {} at {}",
            address,
            test.import_path,
            test.status,
            test.revision
        );
        Ok(())
    }
}

pub struct NotificationDispatcher {
    sender: Arc<dyn NotificationSender>,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Arc<Self> {
        Arc::new(Self { sender })
    }
}

#[async_trait]
impl Dispatcher<Notification> for NotificationDispatcher {
    async fn prepare(
        &self,
        _item: &Notification,
        now: DateTime<Utc>,
    ) -> Result<NotificationAttempt, DispatchError> {
        Ok(NotificationAttempt {
            id: AttemptId::new(),
            started_at: now,
        })
    }

    async fn deliver(
        &self,
        item: &Notification,
        _attempt: &NotificationAttempt,
    ) -> Result<Delivery, DispatchError> {
        if !item.should_notify() {
            tracing::debug!("Notification {} has nothing to report", item.id);
            return Ok(Delivery::Finished);
        }

        let config = &item.config;
        let (url, chat) = tokio::join!(
            async {
                if config.notify_url.is_empty() {
                    return Ok(());
                }
                self.sender.send_url(&config.notify_url, &item.test).await
            },
            async {
                if config.notify_chat.is_empty() {
                    return Ok(());
                }
                self.sender.send_chat(&config.notify_chat, &item.test).await
            }
        );

        let errors: Vec<String> = [url, chat].into_iter().filter_map(Result::err).collect();
        if !errors.is_empty() {
            return Err(DispatchError::Delivery(errors.join("; ")));
        }

        Ok(Delivery::Finished)
    }

    fn exhausted_message(&self, _item: &Notification, max_attempts: usize) -> String {
        format!("unable to deliver notification after {} attempts", max_attempts)
    }

    async fn exhausted(&self, item: &Notification, message: &str) {
        tracing::warn!(
            "Giving up on notification {} for {}: {}",
            item.id,
            item.test.import_path,
            message
        );
    }
}
