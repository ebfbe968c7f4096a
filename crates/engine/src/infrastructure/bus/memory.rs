//! In-process message bus.
//!
//! Routes by exact subject match. Request/reply uses private `_INBOX.<uuid>`
//! subjects the same way NATS does, so the gateway cannot tell the two apart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::SUBSCRIPTION_BUFFER;
use crate::infrastructure::ports::{BusError, Delivery, MessageBus, Subscription};

#[derive(Default)]
pub struct InMemoryBus {
    routes: DashMap<String, Vec<mpsc::Sender<Delivery>>>,
    closed: AtomicBool,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), BusError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BusError::Closed)
        } else {
            Ok(())
        }
    }

    /// Live subscribers on `subject`.
    pub fn subscriber_count(&self, subject: &str) -> usize {
        self.routes
            .get(subject)
            .map(|senders| senders.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    /// Publish with an explicit reply subject.
    pub async fn publish_with_reply(
        &self,
        subject: &str,
        reply: Option<String>,
        payload: Bytes,
    ) -> Result<(), BusError> {
        self.ensure_open()?;

        // Clone the senders out so no map guard is held across an await.
        let senders: Vec<mpsc::Sender<Delivery>> = match self.routes.get_mut(subject) {
            Some(mut entry) => {
                entry.retain(|s| !s.is_closed());
                entry.clone()
            }
            None => Vec::new(),
        };

        for sender in senders {
            let delivery = Delivery {
                subject: subject.to_string(),
                reply: reply.clone(),
                payload: payload.clone(),
            };
            // A subscriber that went away between clone and send is not an error.
            let _ = sender.send(delivery).await;
        }
        Ok(())
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError> {
        self.ensure_open()?;
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        self.routes.entry(subject.to_string()).or_default().push(tx);
        Ok(Subscription::new(subject, rx, CancellationToken::new(), None))
    }

    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        self.publish_with_reply(subject, None, payload).await
    }

    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Delivery, BusError> {
        let inbox = format!("_INBOX.{}", Uuid::new_v4().simple());
        let mut replies = self.subscribe(&inbox).await?;

        self.publish_with_reply(subject, Some(inbox.clone()), payload)
            .await?;

        let answer = tokio::time::timeout(timeout, replies.next()).await;
        self.routes.remove(&inbox);

        match answer {
            Ok(Some(delivery)) => Ok(delivery),
            Ok(None) => Err(BusError::Closed),
            Err(_) => Err(BusError::Timeout {
                subject: subject.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), BusError> {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the senders ends every open subscription.
        self.routes.clear();
        Ok(())
    }
}
