use async_trait::async_trait;
use cloud_clients::PubSubClient;
use color_eyre::eyre::{eyre, Result};
use pipeline::{Pipeline, PipelineContext, IN_KEY};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, field, info, info_span, warn};

const PULL_BATCH: u32 = 10;
const PULL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// One message off the bus, still unacknowledged.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub ack_id: String,
    pub data: String,
}

/// The listener's view of a subscription: pull a batch, acknowledge by id.
/// Implemented over the bus client and by in-memory stubs in tests.
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn pull(&self, max_messages: u32) -> Result<Vec<BusMessage>>;
    async fn acknowledge(&self, ack_ids: &[String]) -> Result<()>;
}

/// A named subscription on the bus client.
pub struct PubSubSubscription {
    client: PubSubClient,
    subscription: String,
}

impl PubSubSubscription {
    #[must_use]
    pub fn new(client: PubSubClient, subscription: &str) -> Self {
        Self {
            client,
            subscription: subscription.to_string(),
        }
    }
}

#[async_trait]
impl Subscriber for PubSubSubscription {
    async fn pull(&self, max_messages: u32) -> Result<Vec<BusMessage>> {
        let messages = self.client.pull(&self.subscription, max_messages).await?;
        Ok(messages
            .into_iter()
            .map(|m| BusMessage {
                ack_id: m.ack_id,
                data: m.data,
            })
            .collect())
    }

    async fn acknowledge(&self, ack_ids: &[String]) -> Result<()> {
        self.client.acknowledge(&self.subscription, ack_ids).await?;
        Ok(())
    }
}

/// Subscribes a pipeline to an object-store notification subscription.
///
/// Per message: fresh context, payload under `__IN__`, run the handler.
/// Acknowledge only on a clean run; on errors the message is neither acked
/// nor nacked, so the subscription's ack deadline drives redelivery.
pub struct StorageEventListener {
    subscriber: Arc<dyn Subscriber>,
    handler: Option<Arc<Pipeline>>,
}

impl StorageEventListener {
    #[must_use]
    pub fn new(subscriber: Arc<dyn Subscriber>, handler: Option<Arc<Pipeline>>) -> Self {
        Self {
            subscriber,
            handler,
        }
    }

    /// Attaches the handler if none is set yet; an existing handler is never
    /// overwritten.
    pub fn set_handler(&mut self, handler: Arc<Pipeline>) {
        if self.handler.is_none() {
            self.handler = Some(handler);
        }
    }

    /// Starts the background receive loop. Cancelling the token stops the
    /// loop after the in-flight message completes.
    pub fn listen(&self, cancel: CancellationToken) -> Result<JoinHandle<()>> {
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| eyre!("listener started without a handler"))?;
        let subscriber = self.subscriber.clone();

        Ok(tokio::spawn(async move {
            info!("listener started");
            loop {
                let pulled = tokio::select! {
                    () = cancel.cancelled() => break,
                    pulled = subscriber.pull(PULL_BATCH) => pulled,
                };
                let messages = match pulled {
                    Ok(messages) => messages,
                    Err(pull_error) => {
                        warn!("pull failed, backing off: {pull_error}");
                        tokio::select! {
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(PULL_ERROR_BACKOFF) => continue,
                        }
                    }
                };

                for message in messages {
                    if cancel.is_cancelled() {
                        // unacked messages become eligible for redelivery
                        break;
                    }
                    Self::handle_message(&subscriber, &handler, &cancel, message).await;
                }
            }
            info!("listener stopped");
        }))
    }

    async fn handle_message(
        subscriber: &Arc<dyn Subscriber>,
        handler: &Arc<Pipeline>,
        cancel: &CancellationToken,
        message: BusMessage,
    ) {
        let span = info_span!("receive_message", msg = %message.data, status = field::Empty);

        let mut ctx = PipelineContext::new()
            .with_trace_context(span.clone())
            .with_cancellation(cancel.child_token());
        ctx.put(IN_KEY, message.data.clone());

        handler.run(&mut ctx).await;

        if ctx.has_errors() {
            span.record("status", "error");
            for (step, step_error) in ctx.errors() {
                error!(step, "handler error: {step_error}");
            }
            // no ack and no nack: the ack deadline redelivers
        } else {
            span.record("status", "ok");
            if let Err(ack_error) = subscriber.acknowledge(&[message.ack_id]).await {
                warn!("failed to acknowledge message: {ack_error}");
            }
        }
        ctx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use color_eyre::eyre::eyre;
    use pipeline::{Step, StepMeta};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Hands out queued messages one batch at a time and records acks.
    #[derive(Default)]
    struct StubSubscriber {
        queue: Mutex<Vec<BusMessage>>,
        acked: Mutex<Vec<String>>,
        pulls: AtomicUsize,
    }

    impl StubSubscriber {
        fn with_messages(payloads: &[&str]) -> Self {
            Self {
                queue: Mutex::new(
                    payloads
                        .iter()
                        .enumerate()
                        .map(|(i, data)| BusMessage {
                            ack_id: format!("ack-{i}"),
                            data: (*data).to_string(),
                        })
                        .collect(),
                ),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Subscriber for StubSubscriber {
        async fn pull(&self, _max_messages: u32) -> Result<Vec<BusMessage>> {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            let is_empty = self.queue.lock().unwrap().is_empty();
            if is_empty {
                // empty subscription long-polls forever
                std::future::pending::<()>().await;
                unreachable!()
            }
            let mut queue = self.queue.lock().unwrap();
            Ok(std::mem::take(&mut *queue))
        }

        async fn acknowledge(&self, ack_ids: &[String]) -> Result<()> {
            self.acked.lock().unwrap().extend_from_slice(ack_ids);
            Ok(())
        }
    }

    /// Records payloads; errors on payloads containing "poison".
    struct Recorder {
        meta: StepMeta,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Step for Recorder {
        fn meta(&self) -> &StepMeta {
            &self.meta
        }

        async fn execute(&self, ctx: &mut PipelineContext) {
            let payload = ctx.get::<String>(IN_KEY).cloned().unwrap_or_default();
            self.seen.lock().unwrap().push(payload.clone());
            if payload.contains("poison") {
                ctx.add_error(self.meta.name(), eyre!("poison message"));
            }
        }
    }

    fn recorder_pipeline(seen: Arc<Mutex<Vec<String>>>) -> Arc<Pipeline> {
        Arc::new(Pipeline::new("test-handler").add_step(Recorder {
            meta: StepMeta::new("recorder"),
            seen,
        }))
    }

    #[tokio::test]
    async fn acks_clean_runs_only() {
        let subscriber = Arc::new(StubSubscriber::with_messages(&["good", "poison", "fine"]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener =
            StorageEventListener::new(subscriber.clone(), Some(recorder_pipeline(seen.clone())));

        let cancel = CancellationToken::new();
        let handle = listener.listen(cancel.clone()).unwrap();

        // wait until all three messages went through the handler
        while seen.lock().unwrap().len() < 3 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
        handle.await.unwrap();

        let acked = subscriber.acked.lock().unwrap().clone();
        assert_eq!(acked, ["ack-0", "ack-2"]);
    }

    #[tokio::test]
    async fn cancellation_stops_pulling_and_returns() {
        let subscriber = Arc::new(StubSubscriber::with_messages(&[]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener =
            StorageEventListener::new(subscriber.clone(), Some(recorder_pipeline(seen.clone())));

        let cancel = CancellationToken::new();
        let handle = listener.listen(cancel.clone()).unwrap();
        // give the loop a chance to enter its first pull
        tokio::task::yield_now().await;

        cancel.cancel();
        handle.await.unwrap();

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(subscriber.pulls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_is_set_at_most_once() {
        let subscriber = Arc::new(StubSubscriber::with_messages(&[]));
        let first = recorder_pipeline(Arc::default());
        let second = recorder_pipeline(Arc::default());

        let mut listener = StorageEventListener::new(subscriber, None);
        listener.set_handler(first.clone());
        listener.set_handler(second);

        assert!(Arc::ptr_eq(listener.handler.as_ref().unwrap(), &first));
    }

    #[tokio::test]
    async fn listen_without_handler_is_an_error() {
        let subscriber = Arc::new(StubSubscriber::with_messages(&[]));
        let listener = StorageEventListener::new(subscriber, None);
        assert!(listener.listen(CancellationToken::new()).is_err());
    }
}
