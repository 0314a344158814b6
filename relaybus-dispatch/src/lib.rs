//! 事件分发门面（relaybus-dispatch）
//!
//! 应用侧的单一入口：持有当前生效的分发后端并转发全部操作。
//! 未安装后端时由桩后端兜底——所有调用降级为告警日志与空操作，
//! 以“响亮地丢数据”换取不崩溃。
//!
pub mod dispatcher;
pub mod stub;

pub use dispatcher::Dispatcher;
pub use stub::StubBackend;
