//! 分发后端（eventing）
//!
//! 提供可插拔后端的协议与三种实现：
//! - `DispatchBackend`：统一的注册/注销、投递、保存点协议；
//! - `PollingProcessor`：五条优先级队列 + 固定周期双通道消费；
//! - `ReplayProcessor`：打点广播 + 按保存点时间戳过滤的安全回放；
//! - `DirectProcessor`：无缓冲的立即投递。
//!
pub mod backend;
pub(crate) mod channel;
pub mod direct;
pub mod polling;
pub(crate) mod registry;
pub mod replay;

pub use backend::DispatchBackend;
pub use direct::DirectProcessor;
pub use polling::{PollingConfig, PollingProcessor};
pub use replay::{ReplayConfig, ReplayProcessor};
