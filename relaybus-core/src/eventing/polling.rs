//! 轮询处理器（PollingProcessor）
//!
//! 将投递的事件按分类缓存进五条优先级队列，由固定周期的调度器
//! 分两条独立通道消费：
//! - 后台通道：按固定检查次序（Network > Data > Generic > Context）
//!   每拍至多取一条非 UI 事件；
//! - UI 通道：独立的同周期任务，每拍至多取一条 UI 事件，投递保证
//!   串行执行。
//!
//! 队列内始终按优先级降序排列；首次 `post` 惰性启动调度器，
//! `shutdown`/Drop 取消全部周期任务。
//!
use super::backend::DispatchBackend;
use super::registry::{self, Registry};
use crate::consumer::EventConsumer;
use crate::descriptor::Category;
use crate::lane::Lanes;
use crate::record::{EventRecord, PostedEvent, UnroutedEvent, now_millis};
use crate::sink::{LoggingSink, UnroutedSink};
use bon::Builder;
use std::cmp::Reverse;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 轮询处理器配置
#[derive(Builder, Clone, Copy, Debug)]
pub struct PollingConfig {
    /// 队列消费周期
    #[builder(default = Duration::from_millis(10))]
    pub tick_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// 五条分类队列，每条独立加锁
struct QueueState {
    queues: [Mutex<Vec<EventRecord>>; Category::COUNT],
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            queues: std::array::from_fn(|_| Mutex::new(Vec::new())),
        }
    }
}

impl QueueState {
    fn enqueue(&self, record: EventRecord) {
        let mut queue = self.queues[record.descriptor().category.index()]
            .lock()
            .expect("category queue lock poisoned");
        queue.push(record);
        // Vec::sort_by_key 是稳定排序：同优先级保持插入次序，作为契约依赖
        queue.sort_by_key(|e| Reverse(e.descriptor().priority));
    }

    fn pop(&self, category: Category) -> Option<EventRecord> {
        let mut queue = self.queues[category.index()]
            .lock()
            .expect("category queue lock poisoned");
        if queue.is_empty() {
            None
        } else {
            Some(queue.remove(0))
        }
    }

    /// 按固定检查次序取第一条非 UI 事件
    fn pop_background(&self) -> Option<EventRecord> {
        Category::BACKGROUND_PRECEDENCE
            .iter()
            .find_map(|c| self.pop(*c))
    }
}

/// 基于优先级队列与周期轮询的分发后端
///
/// 必须在 tokio 运行时内创建：构造时捕获运行时句柄，之后的
/// `post` 可以来自任意线程。
pub struct PollingProcessor {
    config: PollingConfig,
    lanes: Lanes,
    sink: Arc<dyn UnroutedSink>,
    runtime: Handle,
    queues: Arc<QueueState>,
    registry: Arc<Registry>,
    started: Once,
    token: CancellationToken,
}

impl PollingProcessor {
    pub fn new() -> Self {
        Self::with_config(PollingConfig::default())
    }

    pub fn with_config(config: PollingConfig) -> Self {
        Self {
            config,
            lanes: Lanes::current(),
            sink: Arc::new(LoggingSink::new()),
            runtime: Handle::current(),
            queues: Arc::new(QueueState::default()),
            registry: Arc::new(Registry::default()),
            started: Once::new(),
            token: CancellationToken::new(),
        }
    }

    /// 替换投递通道（测试注入）
    pub fn with_lanes(mut self, lanes: Lanes) -> Self {
        self.lanes = lanes;
        self
    }

    /// 替换未路由事件收集器
    pub fn with_sink(mut self, sink: Arc<dyn UnroutedSink>) -> Self {
        self.sink = sink;
        self
    }

    /// 停止调度器；已在投递通道上的任务不受影响
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    fn spawn_periodic<F>(&self, period: Duration, mut tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        let token = self.token.clone();
        self.runtime.spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => tick(),
                }
            }
        });
    }

    fn start_schedulers(&self) {
        info!(interval = ?self.config.tick_interval, "starting event consumption schedulers");

        // 后台通道消费（周期任务）
        {
            let queues = self.queues.clone();
            let registry = self.registry.clone();
            let lane = self.lanes.background.clone();
            let sink = self.sink.clone();

            self.spawn_periodic(self.config.tick_interval, move || {
                if let Some(record) = queues.pop_background() {
                    let desc = record.descriptor();
                    debug!(category = ?desc.category, priority = ?desc.priority, lane = "background", "draining event");
                    lane.execute(registry::classified_job(
                        registry.snapshot(),
                        record,
                        sink.clone(),
                    ));
                }
            });
        }

        // UI 通道消费（独立周期任务）
        {
            let queues = self.queues.clone();
            let registry = self.registry.clone();
            let lane = self.lanes.ui.clone();
            let sink = self.sink.clone();

            self.spawn_periodic(self.config.tick_interval, move || {
                if let Some(record) = queues.pop(Category::Ui) {
                    let desc = record.descriptor();
                    debug!(priority = ?desc.priority, lane = "ui", "draining event");
                    lane.execute(registry::classified_job(
                        registry.snapshot(),
                        record,
                        sink.clone(),
                    ));
                }
            });
        }
    }
}

impl Default for PollingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchBackend for PollingProcessor {
    fn register(&self, consumer: &Arc<dyn EventConsumer>) {
        self.registry.register(consumer);
    }

    fn unregister(&self, consumer: &Arc<dyn EventConsumer>) {
        self.registry.unregister(consumer);
    }

    fn post(&self, event: PostedEvent) {
        // 首次投递才启动调度器，且只启动一次
        self.started.call_once(|| self.start_schedulers());

        let (payload, descriptor) = event.into_parts();
        match descriptor {
            Some(desc) => {
                debug!(category = ?desc.category, priority = ?desc.priority, "queueing event");
                self.queues.enqueue(EventRecord::new(payload, desc, now_millis()));
            }
            None => {
                // 不可分类：立即、不过滤地走后台通道的未路由通知
                let event = UnroutedEvent::new(payload, None, now_millis());
                self.lanes.background.execute(registry::unrouted_job(
                    self.registry.snapshot(),
                    event,
                    self.sink.clone(),
                ));
            }
        }
    }

    fn save_point(&self, _consumer: &Arc<dyn EventConsumer>) -> Option<String> {
        // 该处理器没有回放语义
        debug!("save_point ignored: polling processor has no replay semantics");
        None
    }

    fn load_point(&self, _consumer: &Arc<dyn EventConsumer>, _key: &str) {
        debug!("load_point ignored: polling processor has no replay semantics");
    }
}

impl Drop for PollingProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
