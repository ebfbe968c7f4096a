//! NATS implementation of the message bus port.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use super::SUBSCRIPTION_BUFFER;
use crate::infrastructure::ports::{BusError, Delivery, MessageBus, Subscription};

pub struct NatsBus {
    url: String,
    client: RwLock<Option<async_nats::Client>>,
}

impl NatsBus {
    /// Connect to the NATS server at `url`.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        tracing::info!(url = %url, "Connecting to NATS");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Connect {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        tracing::info!(url = %url, "Connected to NATS");

        Ok(Self {
            url: url.to_string(),
            client: RwLock::new(Some(client)),
        })
    }

    async fn client(&self) -> Result<async_nats::Client, BusError> {
        self.client.read().await.clone().ok_or(BusError::Closed)
    }
}

enum Forward {
    Stop,
    Ended,
}

#[async_trait]
impl MessageBus for NatsBus {
    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError> {
        let client = self.client().await?;
        let mut subscriber = client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| BusError::subscribe(subject, e))?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let name = subject.to_string();

        let forwarder = tokio::spawn(async move {
            let reason = loop {
                let message = tokio::select! {
                    _ = stop.cancelled() => break Forward::Stop,
                    message = subscriber.next() => message,
                };
                let Some(message) = message else {
                    break Forward::Ended;
                };

                let delivery = Delivery {
                    subject: message.subject.to_string(),
                    reply: message.reply.map(|r| r.to_string()),
                    payload: message.payload,
                };
                if tx.send(delivery).await.is_err() {
                    break Forward::Stop;
                }
            };

            if let Forward::Stop = reason {
                if let Err(e) = subscriber.unsubscribe().await {
                    tracing::warn!(subject = %name, error = %e, "Failed to unsubscribe from NATS");
                }
            } else {
                tracing::warn!(subject = %name, "NATS subscription ended by server");
            }
        });

        tracing::info!(subject = %subject, "Subscribed");
        Ok(Subscription::new(subject, rx, cancel, Some(forwarder)))
    }

    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        let client = self.client().await?;
        client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| BusError::publish(subject, e))
    }

    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Delivery, BusError> {
        let client = self.client().await?;
        let message = tokio::time::timeout(timeout, client.request(subject.to_string(), payload))
            .await
            .map_err(|_| BusError::Timeout {
                subject: subject.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })?
            .map_err(|e| BusError::request(subject, e))?;

        Ok(Delivery {
            subject: message.subject.to_string(),
            reply: message.reply.map(|r| r.to_string()),
            payload: message.payload,
        })
    }

    async fn is_connected(&self) -> bool {
        match self.client.read().await.as_ref() {
            Some(client) => {
                client.connection_state() == async_nats::connection::State::Connected
            }
            None => false,
        }
    }

    async fn close(&self) -> Result<(), BusError> {
        let Some(client) = self.client.write().await.take() else {
            return Ok(());
        };
        client
            .flush()
            .await
            .map_err(|e| BusError::publish("<flush>", e))?;
        tracing::info!(url = %self.url, "NATS connection closed");
        Ok(())
    }
}
