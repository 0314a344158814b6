//! 事件消费者契约
//!
//! 引擎不做任何反射式的处理器发现：消费者在注册时就以
//! `accepts`（是否关注某分类）+ `consume`（实际处理）两个能力
//! 对外暴露，引擎只需要“问一下、调一下”。
//!
use crate::descriptor::Category;
use crate::record::{EventRecord, UnroutedEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// 事件消费者：声明关注的分类并处理匹配事件
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// 是否关注该分类的事件
    fn accepts(&self, category: Category) -> bool;

    /// 处理一条已分类事件
    async fn consume(&self, event: &EventRecord);

    /// 是否接收未路由事件通知（默认不接收）
    fn wants_unrouted(&self) -> bool {
        false
    }

    /// 未路由事件通知（默认忽略）
    async fn on_unrouted(&self, _event: &UnroutedEvent) {}
}

/// 消费者身份：以 `Arc` 分配地址为准
///
/// 引擎内部只保存 `Weak` 反向引用，身份标识用于注册表与
/// 包装器缓存的键，不延长消费者生命周期。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(usize);

impl ConsumerId {
    pub fn of(consumer: &Arc<dyn EventConsumer>) -> Self {
        Self(Arc::as_ptr(consumer).cast::<()>() as usize)
    }
}

impl std::fmt::LowerHex for ConsumerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}
