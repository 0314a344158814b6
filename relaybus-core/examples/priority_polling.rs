/// 轮询处理器示例
/// 展示优先级队列 + 固定检查次序的消费行为
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use relaybus_core::consumer::EventConsumer;
use relaybus_core::descriptor::{Category, Descriptor, Priority, RoutedEvent};
use relaybus_core::eventing::{DispatchBackend, PollingConfig, PollingProcessor};
use relaybus_core::record::{EventRecord, PostedEvent};
use std::sync::Arc;
use std::time::Duration;

struct TelemetryTick(&'static str);
impl RoutedEvent for TelemetryTick {
    const DESCRIPTOR: Descriptor = Descriptor::new(Category::Generic, Priority::Irrelevant);
}

struct PayloadReady(&'static str);
impl RoutedEvent for PayloadReady {
    const DESCRIPTOR: Descriptor = Descriptor::new(Category::Data, Priority::Normal);
}

struct ConnectionLost(&'static str);
impl RoutedEvent for ConnectionLost {
    const DESCRIPTOR: Descriptor = Descriptor::new(Category::Network, Priority::Critical);
}

struct Printer;

#[async_trait]
impl EventConsumer for Printer {
    fn accepts(&self, _category: Category) -> bool {
        true
    }

    async fn consume(&self, event: &EventRecord) {
        let label = event
            .downcast_ref::<TelemetryTick>()
            .map(|e| e.0)
            .or_else(|| event.downcast_ref::<PayloadReady>().map(|e| e.0))
            .or_else(|| event.downcast_ref::<ConnectionLost>().map(|e| e.0))
            .unwrap_or("?");
        let desc = event.descriptor();
        println!(
            "consumed [{:?}/{:?}] {}",
            desc.category, desc.priority, label
        );
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== 轮询处理器示例 ===\n");

    let processor = PollingProcessor::with_config(
        PollingConfig::builder()
            .tick_interval(Duration::from_millis(20))
            .build(),
    );
    let printer: Arc<dyn EventConsumer> = Arc::new(Printer);
    processor.register(&printer);

    // 低优先级先投递，高优先级后投递：出队仍按 Network > Data > Generic
    // 的检查次序与队列内优先级
    processor.post(PostedEvent::classified(TelemetryTick("cpu sample")));
    processor.post(PostedEvent::classified(PayloadReady("user profile")));
    processor.post(PostedEvent::classified(ConnectionLost("socket #3")));

    tokio::time::sleep(Duration::from_millis(300)).await;
    processor.shutdown();
    println!("\n✅ 完成");
    Ok(())
}
