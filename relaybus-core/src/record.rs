//! 事件载体
//!
//! - `PostedEvent`：生产者交给 `post` 的值（载荷 + 可选描述符）；
//! - `EventRecord`：投递给消费者的已分类事件；
//! - `StampedEvent`：广播时间线上的元素（记录 + 单调序号）；
//! - `UnroutedEvent`：无法正常路由的事件，进入未路由收集器。
//!
use crate::descriptor::{Descriptor, RoutedEvent};
use chrono::Utc;
use std::any::Any;
use std::sync::Arc;

/// 当前时间戳（epoch 毫秒）
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 生产者投递的事件值
///
/// 载荷以 `Arc<dyn Any>` 承载；描述符缺失的值不会进入常规投递，
/// 而是走未路由通知路径。
#[derive(Clone)]
pub struct PostedEvent {
    payload: Arc<dyn Any + Send + Sync>,
    descriptor: Option<Descriptor>,
}

impl PostedEvent {
    /// 由可路由事件类型构造，描述符取自类型定义
    pub fn classified<E: RoutedEvent>(event: E) -> Self {
        Self {
            payload: Arc::new(event),
            descriptor: Some(E::DESCRIPTOR),
        }
    }

    /// 构造不可分类事件（将被视为未路由事件）
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            payload: Arc::new(value),
            descriptor: None,
        }
    }

    pub fn descriptor(&self) -> Option<Descriptor> {
        self.descriptor
    }

    pub fn payload(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.payload
    }

    pub(crate) fn into_parts(self) -> (Arc<dyn Any + Send + Sync>, Option<Descriptor>) {
        (self.payload, self.descriptor)
    }
}

impl std::fmt::Debug for PostedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostedEvent")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// 投递给消费者的已分类事件
#[derive(Clone)]
pub struct EventRecord {
    payload: Arc<dyn Any + Send + Sync>,
    descriptor: Descriptor,
    posted_at: i64,
}

impl EventRecord {
    pub(crate) fn new(
        payload: Arc<dyn Any + Send + Sync>,
        descriptor: Descriptor,
        posted_at: i64,
    ) -> Self {
        Self {
            payload,
            descriptor,
            posted_at,
        }
    }

    pub fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    /// 投递时间戳（epoch 毫秒，post 时打点）
    pub fn posted_at(&self) -> i64 {
        self.posted_at
    }

    /// 尝试按具体事件类型取回载荷
    pub fn downcast_ref<E: RoutedEvent>(&self) -> Option<&E> {
        self.payload.downcast_ref::<E>()
    }

    /// 降级为未路由事件（没有任何消费者接收时走收集器）
    pub(crate) fn to_unrouted(&self) -> UnroutedEvent {
        UnroutedEvent::new(self.payload.clone(), Some(self.descriptor), self.posted_at)
    }
}

impl std::fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecord")
            .field("descriptor", &self.descriptor)
            .field("posted_at", &self.posted_at)
            .finish_non_exhaustive()
    }
}

/// 广播时间线元素：事件记录 + 单调递增序号
///
/// 序号在同一毫秒内仍保持全序，作为同优先级/同时间戳事件的
/// 稳定次序契约。
#[derive(Debug, Clone)]
pub struct StampedEvent {
    pub record: EventRecord,
    pub seq: u64,
}

/// 未路由事件：缺少描述符，或没有任何消费者接收
#[derive(Clone)]
pub struct UnroutedEvent {
    payload: Arc<dyn Any + Send + Sync>,
    descriptor: Option<Descriptor>,
    posted_at: i64,
}

impl UnroutedEvent {
    pub(crate) fn new(
        payload: Arc<dyn Any + Send + Sync>,
        descriptor: Option<Descriptor>,
        posted_at: i64,
    ) -> Self {
        Self {
            payload,
            descriptor,
            posted_at,
        }
    }

    pub fn descriptor(&self) -> Option<Descriptor> {
        self.descriptor
    }

    pub fn posted_at(&self) -> i64 {
        self.posted_at
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for UnroutedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnroutedEvent")
            .field("descriptor", &self.descriptor)
            .field("posted_at", &self.posted_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Category, Priority};

    struct Ping(u32);
    impl RoutedEvent for Ping {
        const DESCRIPTOR: Descriptor = Descriptor::new(Category::Network, Priority::High);
    }

    // 描述符取自类型，downcast 取回原值
    #[test]
    fn test_classified_roundtrip() {
        let posted = PostedEvent::classified(Ping(7));
        let desc = posted.descriptor().unwrap();
        assert_eq!(desc.category, Category::Network);
        assert_eq!(desc.priority, Priority::High);

        let (payload, descriptor) = posted.into_parts();
        let record = EventRecord::new(payload, descriptor.unwrap(), now_millis());
        assert_eq!(record.downcast_ref::<Ping>().unwrap().0, 7);
    }

    // opaque 值没有描述符
    #[test]
    fn test_opaque_has_no_descriptor() {
        let posted = PostedEvent::opaque("not an event");
        assert!(posted.descriptor().is_none());
    }
}
