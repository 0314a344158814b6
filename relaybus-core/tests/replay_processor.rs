use async_trait::async_trait;
use relaybus_core::consumer::EventConsumer;
use relaybus_core::descriptor::{Category, Descriptor, Priority, RoutedEvent};
use relaybus_core::eventing::{DispatchBackend, ReplayConfig, ReplayProcessor};
use relaybus_core::record::{EventRecord, PostedEvent, UnroutedEvent};
use relaybus_core::sink::UnroutedSink;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct DataEvent(u32);
impl RoutedEvent for DataEvent {
    const DESCRIPTOR: Descriptor = Descriptor::new(Category::Data, Priority::Normal);
}

struct UiEvent(u32);
impl RoutedEvent for UiEvent {
    const DESCRIPTOR: Descriptor = Descriptor::new(Category::Ui, Priority::Normal);
}

struct GenEvent(u32);
impl RoutedEvent for GenEvent {
    const DESCRIPTOR: Descriptor = Descriptor::new(Category::Generic, Priority::Normal);
}

struct Recording {
    log: Mutex<Vec<u32>>,
    count: AtomicUsize,
}

impl Recording {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
        })
    }

    fn ids(&self) -> Vec<u32> {
        self.log.lock().unwrap().clone()
    }

    fn seen(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventConsumer for Recording {
    fn accepts(&self, _category: Category) -> bool {
        true
    }

    async fn consume(&self, event: &EventRecord) {
        let id = event
            .downcast_ref::<DataEvent>()
            .map(|e| e.0)
            .or_else(|| event.downcast_ref::<UiEvent>().map(|e| e.0))
            .or_else(|| event.downcast_ref::<GenEvent>().map(|e| e.0))
            .expect("unknown test event type");
        self.log.lock().unwrap().push(id);
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CountingSink {
    recorded: AtomicUsize,
}

impl UnroutedSink for CountingSink {
    fn record(&self, _event: &UnroutedEvent) {
        self.recorded.fetch_add(1, Ordering::SeqCst);
    }
}

async fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) {
    let _ = tokio::time::timeout(deadline, async {
        loop {
            if cond() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}

// 毫秒时间戳是过滤依据，跨边界的场景之间留出毫秒级间隔
async fn tick_clock() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

// 未保存过保存点的消费者只收到注册之后投递的事件
#[tokio::test(flavor = "multi_thread")]
async fn plain_registration_sees_only_future_events() {
    let processor = ReplayProcessor::new();
    let rec = Recording::new();
    let consumer: Arc<dyn EventConsumer> = rec.clone();

    processor.post(PostedEvent::classified(DataEvent(1)));
    tick_clock().await;

    processor.register(&consumer);
    tick_clock().await;
    processor.post(PostedEvent::classified(DataEvent(2)));

    wait_until(Duration::from_secs(2), || rec.seen() >= 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(rec.ids(), vec![2]);
}

// 保存点 -> 注销 -> 恢复 -> 重注册：T1 起的事件一条不少、一条不多
#[tokio::test(flavor = "multi_thread")]
async fn save_then_load_replays_without_gap_or_duplicate() {
    let processor = ReplayProcessor::new();
    let rec = Recording::new();
    let consumer: Arc<dyn EventConsumer> = rec.clone();

    processor.register(&consumer);
    tick_clock().await;
    processor.post(PostedEvent::classified(DataEvent(1)));
    wait_until(Duration::from_secs(2), || rec.seen() >= 1).await;
    tick_clock().await;

    // 脱离前保存
    let key = processor.save_point(&consumer).expect("save point key");
    processor.unregister(&consumer);

    // 脱离期间照常投递
    processor.post(PostedEvent::classified(DataEvent(2)));
    processor.post(PostedEvent::classified(DataEvent(3)));
    tick_clock().await;

    // 重挂载前恢复
    processor.load_point(&consumer, &key);
    processor.register(&consumer);

    wait_until(Duration::from_secs(2), || rec.seen() >= 3).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // 事件 1 在保存点之前，不会被重放；2、3 恰好补投一次
    assert_eq!(rec.ids(), vec![1, 2, 3]);
}

// 未知/空恢复键不改变过滤阈值
#[tokio::test(flavor = "multi_thread")]
async fn unknown_key_leaves_threshold_unchanged() {
    let processor = ReplayProcessor::new();
    let rec = Recording::new();
    let consumer: Arc<dyn EventConsumer> = rec.clone();

    processor.register(&consumer);
    tick_clock().await;
    processor.post(PostedEvent::classified(DataEvent(1)));
    wait_until(Duration::from_secs(2), || rec.seen() >= 1).await;

    processor.load_point(&consumer, "bogus-key");
    processor.load_point(&consumer, "");
    processor.post(PostedEvent::classified(DataEvent(2)));

    wait_until(Duration::from_secs(2), || rec.seen() >= 2).await;
    assert_eq!(rec.ids(), vec![1, 2]);
}

// 注销立即生效：之后投递的事件不再到达
#[tokio::test(flavor = "multi_thread")]
async fn unregister_stops_delivery() {
    let processor = ReplayProcessor::new();
    let rec = Recording::new();
    let consumer: Arc<dyn EventConsumer> = rec.clone();

    processor.register(&consumer);
    tick_clock().await;
    processor.post(PostedEvent::classified(DataEvent(1)));
    wait_until(Duration::from_secs(2), || rec.seen() >= 1).await;

    processor.unregister(&consumer);
    tick_clock().await;
    processor.post(PostedEvent::classified(DataEvent(2)));
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(rec.ids(), vec![1]);
}

// UI 事件走串行通道，保持发布次序
#[tokio::test(flavor = "multi_thread")]
async fn ui_events_keep_publish_order() {
    let processor = ReplayProcessor::new();
    let rec = Recording::new();
    let consumer: Arc<dyn EventConsumer> = rec.clone();

    processor.register(&consumer);
    tick_clock().await;
    for i in 1..=8 {
        processor.post(PostedEvent::classified(UiEvent(i)));
    }

    wait_until(Duration::from_secs(2), || rec.seen() >= 8).await;
    assert_eq!(rec.ids(), (1..=8).collect::<Vec<_>>());
}

// 每次保存生成全新键
#[tokio::test(flavor = "multi_thread")]
async fn save_point_keys_are_unique() {
    let processor = ReplayProcessor::new();
    let rec = Recording::new();
    let consumer: Arc<dyn EventConsumer> = rec.clone();
    processor.register(&consumer);

    let a = processor.save_point(&consumer).unwrap();
    let b = processor.save_point(&consumer).unwrap();
    assert_ne!(a, b);
}

// 不可分类事件进入收集器，不会投递给消费者
#[tokio::test(flavor = "multi_thread")]
async fn unclassified_event_goes_to_sink() {
    let sink = Arc::new(CountingSink::default());
    let processor = ReplayProcessor::new().with_sink(sink.clone());
    let rec = Recording::new();
    let consumer: Arc<dyn EventConsumer> = rec.clone();
    processor.register(&consumer);
    tick_clock().await;

    processor.post(PostedEvent::opaque("mystery"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(sink.recorded.load(Ordering::SeqCst), 1);
    assert_eq!(rec.seen(), 0);
}

// 多线程并发投递全部到达，且每条只到一次
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_posts_fan_out_exactly_once() {
    let processor = Arc::new(ReplayProcessor::with_config(
        ReplayConfig::builder().channel_capacity(4096).build(),
    ));
    let rec = Recording::new();
    let consumer: Arc<dyn EventConsumer> = rec.clone();
    processor.register(&consumer);
    tick_clock().await;

    let mut handles = Vec::new();
    for t in 0..4u32 {
        let processor = processor.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..25u32 {
                processor.post(PostedEvent::classified(GenEvent(t * 25 + i)));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    wait_until(Duration::from_secs(5), || rec.seen() >= 100).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut ids = rec.ids();
    assert_eq!(ids.len(), 100);
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids, (0..100).collect::<Vec<_>>());
}
