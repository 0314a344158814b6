//! 回放过滤处理器（ReplayProcessor）
//!
//! 推动式后端：`post` 同步打点并发布到连续广播通道（后台 + UI），
//! 每个注册由一个轻量包装器表示，持有消费者的弱引用与当前保存点
//! 时间戳。包装器对观测到的每条打点事件执行过滤：
//! `posted_at >= save_point` 才投递，否则静默丢弃。
//!
//! 这使得“注销前保存、重注册前恢复”的消费者恰好收到保存时刻
//! 之后的全部事件：无缺口、无重复，与脱离时长无关。
//!
use super::backend::DispatchBackend;
use super::channel::StampedChannel;
use crate::consumer::{ConsumerId, EventConsumer};
use crate::lane::{LaneExecutor, Lanes};
use crate::record::{EventRecord, PostedEvent, StampedEvent, UnroutedEvent, now_millis};
use crate::sink::{LoggingSink, UnroutedSink};
use bon::Builder;
use dashmap::DashMap;
use futures_util::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// 回放处理器配置
#[derive(Builder, Clone, Copy, Debug)]
pub struct ReplayConfig {
    /// 单条广播通道的缓冲区容量
    #[builder(default = 1024)]
    pub channel_capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// 订阅包装器：消费者弱引用 + 保存点时间戳 + 订阅取消句柄
struct SubscriberWrapper {
    consumer: Mutex<Option<Weak<dyn EventConsumer>>>,
    /// 0 表示未设置（投递注册之后的一切）
    save_point: AtomicI64,
    subscribed: AtomicBool,
    token: CancellationToken,
}

impl SubscriberWrapper {
    fn new(consumer: &Arc<dyn EventConsumer>, token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            consumer: Mutex::new(Some(Arc::downgrade(consumer))),
            save_point: AtomicI64::new(0),
            subscribed: AtomicBool::new(false),
            token,
        })
    }

    fn upgrade(&self) -> Option<Arc<dyn EventConsumer>> {
        self.consumer
            .lock()
            .expect("wrapper back-reference lock poisoned")
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// 清除反向引用：包装器不再指向消费者
    fn clear(&self) {
        *self
            .consumer
            .lock()
            .expect("wrapper back-reference lock poisoned") = None;
    }

    fn set_save_point(&self, timestamp: i64) {
        self.save_point.store(timestamp, Ordering::Release);
    }

    /// 过滤：保存点之前投递的事件已被消费过，不再投递
    fn should_deliver(&self, stamped: &StampedEvent) -> bool {
        let saved = self.save_point.load(Ordering::Acquire);
        saved <= 0 || stamped.record.posted_at() >= saved
    }
}

/// 基于时间戳过滤与连续广播的分发后端
///
/// 必须在 tokio 运行时内创建：构造时捕获运行时句柄，之后的
/// `post` 可以来自任意线程。
pub struct ReplayProcessor {
    lanes: Lanes,
    sink: Arc<dyn UnroutedSink>,
    runtime: Handle,
    background: Arc<StampedChannel>,
    ui: Arc<StampedChannel>,
    wrappers: DashMap<ConsumerId, Arc<SubscriberWrapper>>,
    save_points: DashMap<String, i64>,
    seq: AtomicU64,
    token: CancellationToken,
}

impl ReplayProcessor {
    pub fn new() -> Self {
        Self::with_config(ReplayConfig::default())
    }

    pub fn with_config(config: ReplayConfig) -> Self {
        Self {
            lanes: Lanes::current(),
            sink: Arc::new(LoggingSink::new()),
            runtime: Handle::current(),
            background: Arc::new(StampedChannel::new(config.channel_capacity)),
            ui: Arc::new(StampedChannel::new(config.channel_capacity)),
            wrappers: DashMap::new(),
            save_points: DashMap::new(),
            seq: AtomicU64::new(0),
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

    /// 取消全部订阅任务
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// 取得（或创建）某消费者的包装器
    ///
    /// `load_point` 可能先于 `register` 调用（重注册前恢复），
    /// 此时也需要包装器来承载恢复的时间戳。
    fn wrapper_of(&self, consumer: &Arc<dyn EventConsumer>) -> Arc<SubscriberWrapper> {
        let id = ConsumerId::of(consumer);
        let entry = self
            .wrappers
            .entry(id)
            .or_insert_with(|| SubscriberWrapper::new(consumer, self.token.child_token()));
        Arc::clone(entry.value())
    }

    fn subscribe_wrapper(&self, wrapper: &Arc<SubscriberWrapper>) {
        self.spawn_subscription(wrapper.clone(), self.background.clone(), None);
        self.spawn_subscription(
            wrapper.clone(),
            self.ui.clone(),
            Some(self.lanes.ui.clone()),
        );
    }

    /// 订阅一条通道：先补投历史快照，再跟随实时流
    fn spawn_subscription(
        &self,
        wrapper: Arc<SubscriberWrapper>,
        channel: Arc<StampedChannel>,
        ui_lane: Option<Arc<dyn LaneExecutor>>,
    ) {
        let (snapshot, mut live) = channel.subscribe();
        let token = wrapper.token.clone();

        self.runtime.spawn(async move {
            for stamped in snapshot {
                if token.is_cancelled() {
                    return;
                }
                Self::offer(&wrapper, stamped, ui_lane.as_ref()).await;
            }

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    item = live.next() => match item {
                        Some(Ok(stamped)) => Self::offer(&wrapper, stamped, ui_lane.as_ref()).await,
                        Some(Err(err)) => {
                            warn!(error = %err, "subscriber fell behind the broadcast channel");
                        }
                        None => break,
                    },
                }
            }
        });
    }

    /// 包装器内的单事件投递：时间戳过滤 + 弱引用升级 + 分类匹配
    async fn offer(
        wrapper: &Arc<SubscriberWrapper>,
        stamped: StampedEvent,
        ui_lane: Option<&Arc<dyn LaneExecutor>>,
    ) {
        if !wrapper.should_deliver(&stamped) {
            return;
        }
        let Some(consumer) = wrapper.upgrade() else {
            return;
        };
        if !consumer.accepts(stamped.record.descriptor().category) {
            return;
        }

        match ui_lane {
            Some(lane) => {
                let record = stamped.record;
                lane.execute(Box::pin(async move {
                    consumer.consume(&record).await;
                }));
            }
            None => consumer.consume(&stamped.record).await,
        }
    }
}

impl Default for ReplayProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchBackend for ReplayProcessor {
    fn register(&self, consumer: &Arc<dyn EventConsumer>) {
        let wrapper = self.wrapper_of(consumer);

        // 全新注册（无保存点）：只看注册之后投递的事件
        let _ = wrapper.save_point.compare_exchange(
            0,
            now_millis(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        if !wrapper.subscribed.swap(true, Ordering::AcqRel) {
            self.subscribe_wrapper(&wrapper);
        }
    }

    fn unregister(&self, consumer: &Arc<dyn EventConsumer>) {
        if let Some((_, wrapper)) = self.wrappers.remove(&ConsumerId::of(consumer)) {
            wrapper.token.cancel();
            wrapper.clear();
            debug!("consumer unregistered from replay processor");
        }
    }

    fn post(&self, event: PostedEvent) {
        let (payload, descriptor) = event.into_parts();
        let Some(desc) = descriptor else {
            self.sink
                .record(&UnroutedEvent::new(payload, None, now_millis()));
            return;
        };

        let stamped = StampedEvent {
            record: EventRecord::new(payload, desc, now_millis()),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };

        let lane = if desc.category.is_ui() { "ui" } else { "background" };
        debug!(category = ?desc.category, priority = ?desc.priority, lane, "publishing stamped event");

        if desc.category.is_ui() {
            self.ui.publish(stamped);
        } else {
            self.background.publish(stamped);
        }
    }

    fn save_point(&self, consumer: &Arc<dyn EventConsumer>) -> Option<String> {
        let timestamp = now_millis();
        // 身份前缀 + 随机分量 + 时间戳，键的碰撞概率可忽略
        let key = format!(
            "{:x}${}${}",
            ConsumerId::of(consumer),
            Uuid::new_v4().simple(),
            timestamp
        );
        self.save_points.insert(key.clone(), timestamp);
        Some(key)
    }

    fn load_point(&self, consumer: &Arc<dyn EventConsumer>, key: &str) {
        if key.is_empty() {
            return;
        }
        let Some(timestamp) = self.save_points.get(key).map(|entry| *entry.value()) else {
            debug!(key, "load_point ignored: unknown save point key");
            return;
        };
        self.wrapper_of(consumer).set_save_point(timestamp);
    }
}

impl Drop for ReplayProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
