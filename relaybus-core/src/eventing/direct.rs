//! 直通处理器（DirectProcessor）
//!
//! 不做任何缓冲与排序的极简后端：已分类事件在 `post` 时立即按
//! 分类送上对应投递通道，UI 事件仍保证串行执行。适合测试环境与
//! 对排队语义不敏感的宿主。
//!
use super::backend::DispatchBackend;
use super::registry::{self, Registry};
use crate::consumer::EventConsumer;
use crate::lane::Lanes;
use crate::record::{EventRecord, PostedEvent, UnroutedEvent, now_millis};
use crate::sink::{LoggingSink, UnroutedSink};
use std::sync::Arc;
use tracing::debug;

/// 立即投递的分发后端
///
/// 必须在 tokio 运行时内创建（构造时捕获运行时句柄）。
pub struct DirectProcessor {
    lanes: Lanes,
    sink: Arc<dyn UnroutedSink>,
    registry: Arc<Registry>,
}

impl DirectProcessor {
    pub fn new() -> Self {
        Self {
            lanes: Lanes::current(),
            sink: Arc::new(LoggingSink::new()),
            registry: Arc::new(Registry::default()),
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
}

impl Default for DirectProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchBackend for DirectProcessor {
    fn register(&self, consumer: &Arc<dyn EventConsumer>) {
        self.registry.register(consumer);
    }

    fn unregister(&self, consumer: &Arc<dyn EventConsumer>) {
        self.registry.unregister(consumer);
    }

    fn post(&self, event: PostedEvent) {
        let (payload, descriptor) = event.into_parts();
        match descriptor {
            Some(desc) => {
                let lane = if desc.category.is_ui() {
                    &self.lanes.ui
                } else {
                    &self.lanes.background
                };
                debug!(category = ?desc.category, priority = ?desc.priority, "dispatching event directly");
                lane.execute(registry::classified_job(
                    self.registry.snapshot(),
                    EventRecord::new(payload, desc, now_millis()),
                    self.sink.clone(),
                ));
            }
            None => {
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
        // 无回放语义
        None
    }

    fn load_point(&self, _consumer: &Arc<dyn EventConsumer>, _key: &str) {}
}
