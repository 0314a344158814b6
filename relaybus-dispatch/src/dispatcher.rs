//! 分发门面（Dispatcher）
//!
//! 持有进程内当前生效的唯一后端引用，转发注册/注销、投递与
//! 保存点调用。后端可在运行时整体替换；替换不迁移任何状态，
//! 期望投递连续性的调用方不应在消费中途换后端。
//!
//! 按依赖注入的方式在启动时构建并共享（`Arc<Dispatcher>`），
//! 而不是进程级静态变量，便于测试隔离。
//!
use crate::stub::StubBackend;
use relaybus_core::consumer::EventConsumer;
use relaybus_core::eventing::DispatchBackend;
use relaybus_core::record::PostedEvent;
use std::sync::{Arc, RwLock};
use tracing::info;

/// 事件分发门面
pub struct Dispatcher {
    backend: RwLock<Arc<dyn DispatchBackend>>,
}

impl Dispatcher {
    /// 以桩后端启动；真实后端通过 [`Dispatcher::install_backend`] 安装
    pub fn new() -> Self {
        Self {
            backend: RwLock::new(Arc::new(StubBackend::new())),
        }
    }

    /// 直接以指定后端启动
    pub fn with_backend(backend: Arc<dyn DispatchBackend>) -> Self {
        Self {
            backend: RwLock::new(backend),
        }
    }

    /// 安装（替换）当前生效的后端
    pub fn install_backend(&self, backend: Arc<dyn DispatchBackend>) {
        info!("installing dispatch backend");
        *self.backend.write().expect("backend lock poisoned") = backend;
    }

    fn backend(&self) -> Arc<dyn DispatchBackend> {
        self.backend.read().expect("backend lock poisoned").clone()
    }

    /// 开始向消费者投递事件
    pub fn register(&self, consumer: &Arc<dyn EventConsumer>) {
        self.backend().register(consumer);
    }

    /// 停止向消费者投递事件
    pub fn unregister(&self, consumer: &Arc<dyn EventConsumer>) {
        self.backend().unregister(consumer);
    }

    /// 投递一条事件
    pub fn post(&self, event: PostedEvent) {
        self.backend().post(event);
    }

    /// 生成保存点，返回一次性恢复键
    ///
    /// 应在 `unregister` 之前调用，返回的键与 [`Dispatcher::load_point`]
    /// 配对使用。
    pub fn save_point(&self, consumer: &Arc<dyn EventConsumer>) -> Option<String> {
        self.backend().save_point(consumer)
    }

    /// 应用保存点，恢复该消费者的回放过滤阈值
    ///
    /// 应在重新 `register` 之前调用。
    pub fn load_point(&self, consumer: &Arc<dyn EventConsumer>, key: &str) {
        self.backend().load_point(consumer, key);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
