//! 桩后端（StubBackend）
//!
//! 门面的默认后端：提醒开发者尚未安装真实后端。所有操作只记录
//! 告警日志，事件被丢弃——故意选择“可观察的数据丢失”而不是崩溃。
//!
use relaybus_core::consumer::EventConsumer;
use relaybus_core::eventing::DispatchBackend;
use relaybus_core::record::PostedEvent;
use std::sync::Arc;
use tracing::warn;

/// 记录告警并丢弃一切的后端
#[derive(Debug, Default)]
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DispatchBackend for StubBackend {
    fn register(&self, _consumer: &Arc<dyn EventConsumer>) {
        warn!("register: no dispatch backend installed, call Dispatcher::install_backend; all events will be missed");
    }

    fn unregister(&self, _consumer: &Arc<dyn EventConsumer>) {
        warn!("unregister: no dispatch backend installed, call Dispatcher::install_backend; all events will be missed");
    }

    fn post(&self, event: PostedEvent) {
        warn!(
            descriptor = ?event.descriptor(),
            "post: no dispatch backend installed, call Dispatcher::install_backend; event will be missed"
        );
    }

    fn save_point(&self, _consumer: &Arc<dyn EventConsumer>) -> Option<String> {
        warn!("save_point: no dispatch backend installed, call Dispatcher::install_backend");
        None
    }

    fn load_point(&self, _consumer: &Arc<dyn EventConsumer>, _key: &str) {
        warn!("load_point: no dispatch backend installed, call Dispatcher::install_backend");
    }
}
