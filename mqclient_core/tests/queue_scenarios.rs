//! End-to-end scenarios (`spec.md` §8) driven against an in-memory mock
//! adapter, standing in for a live broker the way `strut_rabbitmq`'s own
//! unit tests exercise `Envelope`/ack logic without a running RabbitMQ
//! cluster, and the way the original `mqclient`'s
//! `abstract_backend_tests/integrate_queue.py` runs one shared suite against
//! every concrete backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use mqclient_core::adapter::{AdapterError, BrokerClient, Consumer, Producer, RawQueue};
use mqclient_core::{Config, Message, Queue};

#[derive(Default)]
struct Topic {
    queue: VecDeque<Message>,
    acks: Vec<i64>,
    nacks: Vec<i64>,
}

/// A single-process, in-memory stand-in for a broker: publishing to a named
/// topic makes messages available to any consumer created against that same
/// name.
#[derive(Default)]
struct MockBroker {
    topics: Mutex<HashMap<String, Topic>>,
    next_id: AtomicI64,
}

impl MockBroker {
    fn topic(&self, name: &str) -> std::sync::MutexGuard<'_, HashMap<String, Topic>> {
        let mut topics = self.topics.lock().unwrap();
        topics.entry(name.to_string()).or_default();
        topics
    }

    fn acks_of(&self, name: &str) -> Vec<i64> {
        self.topics.lock().unwrap().get(name).unwrap().acks.clone()
    }

    fn nacks_of(&self, name: &str) -> Vec<i64> {
        self.topics.lock().unwrap().get(name).unwrap().nacks.clone()
    }
}

struct MockProducer {
    broker: Arc<MockBroker>,
    name: String,
}

#[async_trait]
impl RawQueue for MockProducer {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }
}

#[async_trait]
impl Producer for MockProducer {
    async fn send_message(&mut self, payload: Vec<u8>) -> Result<(), AdapterError> {
        let id = self.broker.next_id.fetch_add(1, Ordering::SeqCst);
        let msg = Message::new(id, payload);
        self.broker.topic(&self.name).get_mut(&self.name).unwrap().queue.push_back(msg);
        Ok(())
    }
}

struct MockConsumer {
    broker: Arc<MockBroker>,
    name: String,
}

#[async_trait]
impl RawQueue for MockConsumer {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }
}

fn id_of(msg: &Message) -> i64 {
    match msg.msg_id() {
        mqclient_core::MessageId::Int(i) => *i,
        _ => unreachable!("mock broker only ever mints integer ids"),
    }
}

#[async_trait]
impl Consumer for MockConsumer {
    async fn get_message(&mut self, _timeout: Duration) -> Result<Option<Message>, AdapterError> {
        Ok(self
            .broker
            .topic(&self.name)
            .get_mut(&self.name)
            .unwrap()
            .queue
            .pop_front())
    }

    async fn ack_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
        self.broker
            .topic(&self.name)
            .get_mut(&self.name)
            .unwrap()
            .acks
            .push(id_of(msg));
        Ok(())
    }

    async fn reject_message(&mut self, msg: &Message) -> Result<(), AdapterError> {
        self.broker
            .topic(&self.name)
            .get_mut(&self.name)
            .unwrap()
            .nacks
            .push(id_of(msg));
        Ok(())
    }
}

struct MockBrokerClient {
    broker: Arc<MockBroker>,
}

#[async_trait]
impl BrokerClient for MockBrokerClient {
    async fn create_pub_queue(
        &self,
        _address: &str,
        name: &str,
        _auth_token: Option<&str>,
        _ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Producer>, AdapterError> {
        Ok(Box::new(MockProducer {
            broker: Arc::clone(&self.broker),
            name: name.to_string(),
        }))
    }

    async fn create_sub_queue(
        &self,
        _address: &str,
        name: &str,
        _prefetch: u32,
        _auth_token: Option<&str>,
        _ack_timeout: Option<Duration>,
    ) -> Result<Box<dyn Consumer>, AdapterError> {
        Ok(Box::new(MockConsumer {
            broker: Arc::clone(&self.broker),
            name: name.to_string(),
        }))
    }
}

fn test_queue(name: &str, except_errors: bool) -> (Queue, Arc<MockBroker>) {
    let broker = Arc::new(MockBroker::default());
    let client = Arc::new(MockBrokerClient {
        broker: Arc::clone(&broker),
    });
    let config = Config::builder("mock")
        .name(name)
        .timeout(Duration::from_millis(20))
        .except_errors(except_errors)
        .build()
        .unwrap();
    (Queue::new(client, config), broker)
}

/// Scenario 1: single round-trip.
#[tokio::test]
async fn single_round_trip_acks_exactly_once() {
    let (queue, broker) = test_queue("scenario-1", true);

    queue
        .open_pub(|mut pub_handle| {
            Box::pin(async move {
                pub_handle
                    .send(json!({"a": [1, 2, 3]}), None)
                    .await
                    .map_err(|e| Box::new(e) as _)
            })
        })
        .await
        .unwrap();

    let received = Arc::new(Mutex::new(None));
    let received_clone = Arc::clone(&received);
    queue
        .open_sub_one(move |data| {
            let received = Arc::clone(&received_clone);
            async move {
                *received.lock().unwrap() = Some(data);
                Ok(())
            }
        })
        .await
        .unwrap();

    assert_eq!(*received.lock().unwrap(), Some(json!({"a": [1, 2, 3]})));
    assert_eq!(broker.acks_of("scenario-1"), vec![0]);
    assert!(broker.nacks_of("scenario-1").is_empty());
}

/// Scenario 2: order is preserved for a single producer/consumer pair.
#[tokio::test]
async fn order_is_preserved_with_a_single_consumer() {
    let (queue, _broker) = test_queue("scenario-2", true);

    let values = vec![json!("foo"), json!(1), json!(true), json!(null), json!({"k": "v"})];

    for v in &values {
        let v = v.clone();
        queue
            .open_pub(|mut pub_handle| {
                Box::pin(async move { pub_handle.send(v, None).await.map_err(|e| Box::new(e) as _) })
            })
            .await
            .unwrap();
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    queue
        .open_sub(move |iter| {
            let seen = Arc::clone(&seen_clone);
            Box::pin(async move {
                while let Some(v) = iter.next().await.map_err(|e| Box::new(e) as _)? {
                    seen.lock().unwrap().push(v);
                }
                Ok(())
            })
        })
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), values);
}

#[derive(Debug)]
struct BoomError;

impl std::fmt::Display for BoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "boom")
    }
}
impl std::error::Error for BoomError {}

/// Scenario 3: exception mid-iteration, `except_errors=true`.
#[tokio::test]
async fn exception_mid_iteration_nacks_current_and_suppresses_error() {
    let (queue, broker) = test_queue("scenario-3", true);

    for i in 1..=6i64 {
        queue
            .open_pub(move |mut pub_handle| {
                Box::pin(async move { pub_handle.send(json!(i), None).await.map_err(|e| Box::new(e) as _) })
            })
            .await
            .unwrap();
    }

    let result = queue
        .open_sub(|iter| {
            Box::pin(async move {
                let mut count = 0;
                while let Some(_v) = iter.next().await.map_err(|e| Box::new(e) as _)? {
                    count += 1;
                    if count == 3 {
                        return Err(Box::new(BoomError) as _);
                    }
                }
                Ok(())
            })
        })
        .await;

    assert!(result.is_ok(), "except_errors=true must suppress the user error");
    assert_eq!(broker.acks_of("scenario-3"), vec![0, 1]);
    assert_eq!(broker.nacks_of("scenario-3"), vec![2]);
}

/// Scenario 3b: with `except_errors=false`, the same failure propagates.
#[tokio::test]
async fn exception_mid_iteration_propagates_when_except_errors_is_false() {
    let (queue, _broker) = test_queue("scenario-3b", false);

    queue
        .open_pub(|mut pub_handle| {
            Box::pin(async move { pub_handle.send(json!(1), None).await.map_err(|e| Box::new(e) as _) })
        })
        .await
        .unwrap();

    let result = queue
        .open_sub(|iter| {
            Box::pin(async move {
                iter.next().await.map_err(|e| Box::new(e) as _)?;
                Err(Box::new(BoomError) as _)
            })
        })
        .await;

    assert!(matches!(result, Err(mqclient_core::Error::User(_))));
}

/// Scenario 4: manual acking with `ack_pending_limit=3`.
#[tokio::test]
async fn manual_acking_enforces_the_pending_limit() {
    let (queue, _broker) = test_queue("scenario-4", true);

    for i in 0..10i64 {
        queue
            .open_pub(move |mut pub_handle| {
                Box::pin(async move { pub_handle.send(json!(i), None).await.map_err(|e| Box::new(e) as _) })
            })
            .await
            .unwrap();
    }

    queue
        .open_sub_manual_acking(3, |ctx| {
            Box::pin(async move {
                let messages = ctx.iter_messages();
                for _ in 0..3 {
                    messages.next().await.map_err(|e| Box::new(e) as _)?;
                }

                let fourth = messages.next().await;
                assert!(matches!(
                    fourth,
                    Err(mqclient_core::Error::TooManyMessagesPendingAck(_))
                ));

                Ok(())
            })
        })
        .await
        .unwrap();
}

/// Scenario 6: retry exhaustion performs exactly `retries + 1` attempts.
#[tokio::test]
async fn retry_harness_bounds_attempts() {
    use mqclient_core::retry::auto_retry;

    let attempts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let reconnects = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let attempts_clone = Arc::clone(&attempts);
    let reconnects_clone = Arc::clone(&reconnects);

    let result: Result<(), BoomError> = auto_retry(
        || {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(BoomError) }
        },
        2,
        Duration::from_millis(1),
        || async { Ok(()) },
        || {
            reconnects_clone.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        },
        |_| false,
    )
    .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(reconnects.load(Ordering::SeqCst), 2);
}
