//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 下游订阅者测试（进程内广播）

#[path = "../common/mod.rs"]
mod common;

use common::{setup_logging, unique_username};
use oxfanout::adapter::{AdapterSet, ReceivedSink};
use oxfanout::backend::{BroadcastPublisher, MemoryReceivedSink, MemoryUserStore};
use oxfanout::coordinator::CoordinatorSettings;
use oxfanout::model::UserRecord;
use oxfanout::subscriber::run_broadcast;
use oxfanout::FanoutService;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_written_users_are_received_downstream() {
    setup_logging();
    let publisher = Arc::new(BroadcastPublisher::new(64));
    let sink = Arc::new(MemoryReceivedSink::new());
    let receiver = publisher.subscribe();

    let task_sink = sink.clone();
    let handle = tokio::spawn(async move {
        run_broadcast(
            receiver,
            "userExchange",
            task_sink.as_ref(),
            std::future::pending(),
        )
        .await
    });

    let adapters = AdapterSet::new(
        Arc::new(MemoryUserStore::new()),
        Arc::new(MemoryUserStore::new()),
    )
    .with_publisher(publisher.clone());
    let service = FanoutService::new(adapters, CoordinatorSettings::default());

    let first = unique_username("alice");
    let second = unique_username("bob");
    for name in [&first, &second, &first] {
        let result = service
            .submit_write(UserRecord::new(name.clone()))
            .await
            .unwrap();
        assert!(result.publisher.is_committed());
    }

    // 关闭所有发送端，订阅循环处理完缓冲的消息后退出
    drop(service);
    drop(publisher);
    let handled = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(handled, 3);
    assert_eq!(sink.list_received().await.unwrap(), expected);
}

#[tokio::test]
async fn test_other_topics_and_garbage_are_ignored() {
    setup_logging();
    let publisher = BroadcastPublisher::new(16);
    let sink = MemoryReceivedSink::new();
    let receiver = publisher.subscribe();

    use oxfanout::adapter::EventPublisher;
    publisher
        .publish("otherTopic", b"{}".to_vec())
        .await
        .unwrap();
    publisher
        .publish("userExchange", b"not json".to_vec())
        .await
        .unwrap();
    drop(publisher);

    // 发送端关闭后循环自行退出
    let handled = run_broadcast(receiver, "userExchange", &sink, std::future::pending()).await;
    assert_eq!(handled, 0);
    assert!(sink.list_received().await.unwrap().is_empty());
}
