//! Message gateway: bus subscriptions, dispatch and lifecycle.
//!
//! Lifecycle: `Idle -> Listening -> Stopping -> Stopped`. A gateway runs once;
//! after it has stopped, build a new one. Every delivery is handled on its own
//! task, so a slow or failing request never holds up the others. Stopping ends
//! the listeners, unsubscribes every subject, gives in-flight handlers a grace
//! period to publish their replies, then closes the bus connection.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::FutureExt;
use krazyplanet_shared::responses::text;
use krazyplanet_shared::{subjects, GameResponse, ResponseStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use super::error_sanitizer::panic_message;
use super::handlers::{peek_message_id, MessageRouter};
use crate::infrastructure::correlation::CorrelationId;
use crate::infrastructure::ports::{BusError, Delivery, MessageBus, Subscription};

/// How long in-flight handlers may keep running after stop.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    Idle,
    Listening,
    Stopping,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway has already been stopped")]
    AlreadyStopped,
    #[error("Gateway is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Bus(#[from] BusError),
}

pub struct MessageGateway {
    bus: Arc<dyn MessageBus>,
    router: Arc<MessageRouter>,
    state: watch::Sender<GatewayState>,
    stop: CancellationToken,
    tasks: TaskTracker,
    drain_timeout: Duration,
}

impl MessageGateway {
    pub fn new(bus: Arc<dyn MessageBus>, router: Arc<MessageRouter>) -> Self {
        let (state, _) = watch::channel(GatewayState::Idle);
        Self {
            bus,
            router,
            state,
            stop: CancellationToken::new(),
            tasks: TaskTracker::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn state(&self) -> GatewayState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn state_changes(&self) -> watch::Receiver<GatewayState> {
        self.state.subscribe()
    }

    /// Ask a running gateway to stop. An idle gateway goes straight to Stopped.
    pub fn stop(&self) {
        self.state.send_if_modified(|state| {
            if *state == GatewayState::Idle {
                *state = GatewayState::Stopped;
                true
            } else {
                false
            }
        });
        self.stop.cancel();
    }

    /// Listen until `cancel` fires or [`MessageGateway::stop`] is called.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), GatewayError> {
        self.begin()?;

        let subscriptions = match self.subscribe_all().await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                self.state.send_replace(GatewayState::Stopped);
                return Err(e.into());
            }
        };

        let dispatcher = Dispatcher {
            bus: Arc::clone(&self.bus),
            router: Arc::clone(&self.router),
            tasks: self.tasks.clone(),
        };
        let listeners: Vec<JoinHandle<Subscription>> = subscriptions
            .into_iter()
            .map(|subscription| {
                tokio::spawn(listen(subscription, dispatcher.clone(), self.stop.clone()))
            })
            .collect();

        tracing::info!(subjects = ?subjects::ALL, "Gateway listening");

        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = self.stop.cancelled() => {}
        }

        self.shutdown(listeners).await;
        Ok(())
    }

    fn begin(&self) -> Result<(), GatewayError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| match *state {
            GatewayState::Idle => {
                *state = GatewayState::Listening;
                true
            }
            GatewayState::Listening => {
                outcome = Err(GatewayError::AlreadyRunning);
                false
            }
            GatewayState::Stopping | GatewayState::Stopped => {
                outcome = Err(GatewayError::AlreadyStopped);
                false
            }
        });
        outcome
    }

    /// Subscribe every subject, or none of them.
    async fn subscribe_all(&self) -> Result<Vec<Subscription>, BusError> {
        let mut subscriptions = Vec::with_capacity(subjects::ALL.len());
        for subject in subjects::ALL {
            match self.bus.subscribe(subject).await {
                Ok(subscription) => subscriptions.push(subscription),
                Err(e) => {
                    tracing::error!(subject = %subject, error = %e, "Subscription failed");
                    for subscription in subscriptions {
                        subscription.unsubscribe().await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(subscriptions)
    }

    async fn shutdown(&self, listeners: Vec<JoinHandle<Subscription>>) {
        self.state.send_replace(GatewayState::Stopping);
        tracing::info!("Gateway stopping");
        self.stop.cancel();

        for listener in listeners {
            match listener.await {
                Ok(subscription) => subscription.unsubscribe().await,
                Err(e) => tracing::error!(error = %e, "Listener task failed"),
            }
        }

        self.tasks.close();
        if tokio::time::timeout(self.drain_timeout, self.tasks.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                pending = self.tasks.len(),
                "In-flight handlers still running after drain timeout"
            );
        }

        if let Err(e) = self.bus.close().await {
            tracing::warn!(error = %e, "Failed to close message bus");
        }

        self.state.send_replace(GatewayState::Stopped);
        tracing::info!("Gateway stopped");
    }
}

/// Forward deliveries of one subscription until stopped; hands the
/// subscription back so it can be unsubscribed.
async fn listen(
    mut subscription: Subscription,
    dispatcher: Dispatcher,
    stop: CancellationToken,
) -> Subscription {
    loop {
        let delivery = tokio::select! {
            _ = stop.cancelled() => break,
            delivery = subscription.next() => delivery,
        };
        match delivery {
            Some(delivery) => dispatcher.dispatch(delivery),
            None => {
                tracing::warn!(subject = %subscription.subject(), "Subscription ended");
                break;
            }
        }
    }
    subscription
}

#[derive(Clone)]
struct Dispatcher {
    bus: Arc<dyn MessageBus>,
    router: Arc<MessageRouter>,
    tasks: TaskTracker,
}

impl Dispatcher {
    fn dispatch(&self, delivery: Delivery) {
        let bus = Arc::clone(&self.bus);
        let router = Arc::clone(&self.router);

        self.tasks.spawn(async move {
            let correlation_id = CorrelationId::new();
            tracing::debug!(
                subject = %delivery.subject,
                correlation_id = %correlation_id.short(),
                payload = %String::from_utf8_lossy(&delivery.payload),
                "Received message"
            );

            let handled =
                AssertUnwindSafe(router.handle(&delivery.subject, &delivery.payload, &correlation_id))
                    .catch_unwind()
                    .await;
            let response = match handled {
                Ok(response) => response,
                Err(panic) => {
                    tracing::error!(
                        subject = %delivery.subject,
                        correlation_id = %correlation_id,
                        panic = %panic_message(panic.as_ref()),
                        "Handler panicked"
                    );
                    GameResponse::new(
                        peek_message_id(&delivery.payload)
                            .unwrap_or_else(|| Uuid::new_v4().to_string()),
                        ResponseStatus::InternalError,
                        text::INTERNAL_ERROR,
                    )
                }
            };

            let Some(reply) = delivery.reply else {
                tracing::debug!(
                    subject = %delivery.subject,
                    message_id = %response.message_id,
                    "No reply subject, response dropped"
                );
                return;
            };

            reply_with(bus.as_ref(), &reply, &response, &correlation_id).await;
        });
    }
}

async fn reply_with(
    bus: &dyn MessageBus,
    reply: &str,
    response: &GameResponse,
    correlation_id: &CorrelationId,
) {
    let body = match serde_json::to_vec(response) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, correlation_id = %correlation_id, "Failed to encode response");
            return;
        }
    };

    tracing::debug!(
        reply = %reply,
        correlation_id = %correlation_id.short(),
        status = %response.status_code,
        body = %String::from_utf8_lossy(&body),
        "Sending response"
    );

    if let Err(e) = bus.publish(reply, Bytes::from(body)).await {
        tracing::warn!(
            reply = %reply,
            message_id = %response.message_id,
            error = %e,
            "Failed to publish response"
        );
    }
}
