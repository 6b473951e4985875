//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了下游事件订阅者，将收到的用户名记录到已接收表中。

use crate::adapter::ReceivedSink;
use crate::backend::redis_provider::effective_url;
use crate::config::EventsConfig;
use crate::error::Result;
use crate::model::{validate_username, UserEvent};
use crate::serialization::{JsonSerializer, Serializer};
use futures::stream::StreamExt;
use secrecy::ExposeSecret;
use std::future::Future;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

/// 处理一条事件负载
///
/// 解码失败或用户名非法时返回错误，调用方应记录并跳过该消息。
/// 重复投递是幂等的。
pub async fn handle_event_payload(
    payload: &[u8],
    serializer: &JsonSerializer,
    sink: &dyn ReceivedSink,
) -> Result<UserEvent> {
    let event: UserEvent = serializer.deserialize(payload)?;
    validate_username(&event.record.username)?;
    sink.record_received(&event.record.username).await?;
    debug!(
        "Recorded event {} for {}",
        event.event_id, event.record.username
    );
    Ok(event)
}

/// Redis频道订阅者
pub struct RedisEventSubscriber {
    /// Redis客户端
    client: redis::Client,
    /// 频道名称
    topic: String,
    serializer: JsonSerializer,
}

impl RedisEventSubscriber {
    pub fn new(client: redis::Client, topic: impl Into<String>) -> Self {
        Self {
            client,
            topic: topic.into(),
            serializer: JsonSerializer::new(),
        }
    }

    pub fn from_config(config: &EventsConfig) -> Result<Self> {
        let client = redis::Client::open(effective_url(
            config.url.expose_secret(),
            config.enable_tls,
        ))?;
        Ok(Self::new(client, config.topic.clone()))
    }

    /// 持续消费频道消息，直到 `shutdown` 完成或连接断开
    ///
    /// 返回成功处理的消息数量
    #[instrument(skip(self, sink, shutdown), level = "info", fields(topic = %self.topic))]
    pub async fn run<F>(&self, sink: &dyn ReceivedSink, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        #[allow(deprecated)]
        let conn = self.client.get_async_connection().await?;
        let mut pubsub = conn.into_pubsub();
        pubsub.subscribe(&self.topic).await?;
        info!("Subscribed to {}", self.topic);

        let mut handled = 0u64;
        let mut stream = pubsub.on_message();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Subscriber shutting down after {} events", handled);
                    break;
                }
                msg = stream.next() => {
                    let Some(msg) = msg else {
                        warn!("Subscription stream closed");
                        break;
                    };
                    let payload: Vec<u8> = match msg.get_payload() {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!("Failed to read message payload: {}", e);
                            continue;
                        }
                    };
                    match handle_event_payload(&payload, &self.serializer, sink).await {
                        Ok(_) => handled += 1,
                        Err(e) => warn!("Skipping event: {}", e),
                    }
                }
            }
        }
        Ok(handled)
    }
}

/// 消费进程内广播发布者的消息，语义与 [`RedisEventSubscriber::run`] 相同
pub async fn run_broadcast<F>(
    mut receiver: broadcast::Receiver<(String, Vec<u8>)>,
    topic: &str,
    sink: &dyn ReceivedSink,
    shutdown: F,
) -> u64
where
    F: Future<Output = ()>,
{
    let serializer = JsonSerializer::new();
    let mut handled = 0u64;
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            msg = receiver.recv() => match msg {
                Ok((channel, payload)) => {
                    if channel != topic {
                        continue;
                    }
                    match handle_event_payload(&payload, &serializer, sink).await {
                        Ok(_) => handled += 1,
                        Err(e) => warn!("Skipping event: {}", e),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged, {} events lost", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    handled
}
