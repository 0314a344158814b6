//! 消费者注册表
//!
//! 后端持有的注册记录：对消费者只保留 `Weak` 反向引用（引擎绝不
//! 成为消费者生命周期的最后持有者），按注册次序做快照，失效引用
//! 在快照时回收。
//!
use crate::consumer::{ConsumerId, EventConsumer};
use crate::lane::DeliveryJob;
use crate::record::{EventRecord, UnroutedEvent};
use crate::sink::UnroutedSink;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

struct Registration {
    consumer: Weak<dyn EventConsumer>,
    order: u64,
}

/// 弱引用注册表：`register` 幂等，`unregister` 即时回收
#[derive(Default)]
pub(crate) struct Registry {
    entries: DashMap<ConsumerId, Registration>,
    next_order: AtomicU64,
}

impl Registry {
    pub(crate) fn register(&self, consumer: &Arc<dyn EventConsumer>) {
        let id = ConsumerId::of(consumer);
        self.entries.entry(id).or_insert_with(|| Registration {
            consumer: Arc::downgrade(consumer),
            order: self.next_order.fetch_add(1, Ordering::Relaxed),
        });
    }

    pub(crate) fn unregister(&self, consumer: &Arc<dyn EventConsumer>) {
        self.entries.remove(&ConsumerId::of(consumer));
    }

    /// 当前存活消费者，按注册次序排列；失效的弱引用顺带清理
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn EventConsumer>> {
        self.entries.retain(|_, reg| reg.consumer.strong_count() > 0);

        let mut alive: Vec<(u64, Arc<dyn EventConsumer>)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .consumer
                    .upgrade()
                    .map(|c| (entry.value().order, c))
            })
            .collect();
        alive.sort_by_key(|(order, _)| *order);
        alive.into_iter().map(|(_, c)| c).collect()
    }
}

/// 构造一次已分类事件的投递任务
///
/// 逐个询问消费者是否接收该分类；没有任何消费者接收时，事件
/// 降级进入未路由收集器。
pub(crate) fn classified_job(
    consumers: Vec<Arc<dyn EventConsumer>>,
    record: EventRecord,
    sink: Arc<dyn UnroutedSink>,
) -> DeliveryJob {
    Box::pin(async move {
        let category = record.descriptor().category;
        let mut matched = 0usize;
        for consumer in &consumers {
            if consumer.accepts(category) {
                consumer.consume(&record).await;
                matched += 1;
            }
        }
        if matched == 0 {
            debug!(category = ?category, "no consumer accepted event");
            sink.record(&record.to_unrouted());
        }
    })
}

/// 构造一次未路由事件的通知任务
///
/// 只通知声明了 `wants_unrouted` 的消费者；一个都没有时由收集器
/// 记录并丢弃。
pub(crate) fn unrouted_job(
    consumers: Vec<Arc<dyn EventConsumer>>,
    event: UnroutedEvent,
    sink: Arc<dyn UnroutedSink>,
) -> DeliveryJob {
    Box::pin(async move {
        let mut notified = 0usize;
        for consumer in &consumers {
            if consumer.wants_unrouted() {
                consumer.on_unrouted(&event).await;
                notified += 1;
            }
        }
        if notified == 0 {
            sink.record(&event);
        }
    })
}
