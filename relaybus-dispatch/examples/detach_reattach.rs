/// 脱离-重挂载示例
/// 演示消费者在注销前保存、重注册前恢复，期间投递的事件一条不丢
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use relaybus_core::consumer::EventConsumer;
use relaybus_core::descriptor::{Category, Descriptor, Priority, RoutedEvent};
use relaybus_core::eventing::ReplayProcessor;
use relaybus_core::record::{EventRecord, PostedEvent};
use relaybus_dispatch::Dispatcher;
use std::sync::Arc;
use std::time::Duration;

/// 数据到达事件
struct SyncCompleted {
    batch: u32,
}

impl RoutedEvent for SyncCompleted {
    const DESCRIPTOR: Descriptor = Descriptor::new(Category::Data, Priority::High);
}

/// 界面刷新事件
struct BadgeRefresh {
    count: u32,
}

impl RoutedEvent for BadgeRefresh {
    const DESCRIPTOR: Descriptor = Descriptor::new(Category::Ui, Priority::Normal);
}

/// 一个“界面”消费者：关心数据与 UI 事件
struct Screen {
    name: &'static str,
}

#[async_trait]
impl EventConsumer for Screen {
    fn accepts(&self, category: Category) -> bool {
        matches!(category, Category::Data | Category::Ui)
    }

    async fn consume(&self, event: &EventRecord) {
        if let Some(sync) = event.downcast_ref::<SyncCompleted>() {
            println!("[{}] 收到同步批次 #{}", self.name, sync.batch);
        } else if let Some(badge) = event.downcast_ref::<BadgeRefresh>() {
            println!("[{}] 刷新角标 -> {}", self.name, badge.count);
        }
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

    println!("=== 脱离-重挂载示例 ===\n");

    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.install_backend(Arc::new(ReplayProcessor::new()));

    let screen: Arc<dyn EventConsumer> = Arc::new(Screen { name: "inbox" });
    dispatcher.register(&screen);
    tokio::time::sleep(Duration::from_millis(5)).await;

    dispatcher.post(PostedEvent::classified(SyncCompleted { batch: 1 }));
    dispatcher.post(PostedEvent::classified(BadgeRefresh { count: 1 }));
    tokio::time::sleep(Duration::from_millis(50)).await;

    // 宿主生命周期事件：脱离前保存
    let key = dispatcher.save_point(&screen).expect("save point key");
    dispatcher.unregister(&screen);
    println!("\n✅ 界面已脱离，保存点: {key}\n");

    // 脱离期间照常投递
    dispatcher.post(PostedEvent::classified(SyncCompleted { batch: 2 }));
    dispatcher.post(PostedEvent::classified(BadgeRefresh { count: 2 }));
    tokio::time::sleep(Duration::from_millis(50)).await;

    // 重挂载：恢复后再注册，脱离期间的事件恰好补投一次
    dispatcher.load_point(&screen, &key);
    dispatcher.register(&screen);
    println!("✅ 界面已重挂载，补投脱离期间的事件\n");

    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("\n✅ 完成");
    Ok(())
}
