//! 未路由事件收集器
//!
//! 捕获无法正常路由的事件（缺少描述符，或没有任何消费者接收），
//! 记录日志供诊断；不保证任何消费契约。
//!
use crate::record::UnroutedEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// 未路由事件收集契约
pub trait UnroutedSink: Send + Sync {
    fn record(&self, event: &UnroutedEvent);
}

/// 默认收集器：告警日志 + 观测计数
#[derive(Debug, Default)]
pub struct LoggingSink {
    recorded: AtomicU64,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已观测到的未路由事件数
    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }
}

impl UnroutedSink for LoggingSink {
    fn record(&self, event: &UnroutedEvent) {
        self.recorded.fetch_add(1, Ordering::Relaxed);
        match event.descriptor() {
            Some(desc) => warn!(
                category = ?desc.category,
                priority = ?desc.priority,
                posted_at = event.posted_at(),
                "event had no matching consumer"
            ),
            None => warn!(
                posted_at = event.posted_at(),
                "unclassified event dropped: payload carries no descriptor"
            ),
        }
    }
}
