//! 进程内事件路由核心（relaybus-core）
//!
//! 以可插拔的分发后端解耦事件生产者与消费者，提供：
//! - 事件静态分类（`descriptor`）：分类 + 优先级，附着在类型上
//! - 事件载体（`record`）与消费者契约（`consumer`）
//! - 投递通道（`lane`）：后台并发与 UI 亲和的串行执行上下文
//! - 分发后端（`eventing`）：优先级队列轮询、保存点回放过滤、直通
//! - 未路由事件收集（`sink`）
//!
//! 本 crate 不做任何跨进程投递与持久化，所有状态以进程生命周期
//! 为界；消费者注销/重注册之间的投递正确性由保存点协议保证。
//!
pub mod consumer;
pub mod descriptor;
pub mod error;
pub mod eventing;
pub mod lane;
pub mod record;
pub mod sink;
