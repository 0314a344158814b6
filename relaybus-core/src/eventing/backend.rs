//! 分发后端（DispatchBackend）协议
//!
//! 定义所有后端实现共有的能力集：注册/注销、投递、保存点/恢复点。
//! 公开操作遵循“只记录、不抛出”的策略：预期内的异常情况（未知
//! 恢复键、不可分类事件等）在后端内部记录日志并降级处理。
//!
use crate::consumer::EventConsumer;
use crate::record::PostedEvent;
use std::sync::Arc;

/// 分发后端：可插拔的事件路由实现
pub trait DispatchBackend: Send + Sync {
    /// 开始向该消费者投递事件；对同一消费者幂等，不会产生重复投递
    fn register(&self, consumer: &Arc<dyn EventConsumer>);

    /// 停止投递并释放注册资源；未注册的消费者调用无副作用
    fn unregister(&self, consumer: &Arc<dyn EventConsumer>);

    /// 投递一条事件；绝不阻塞等待消费者处理
    ///
    /// 缺少描述符的事件不会进入常规投递，而是转入未路由通知路径。
    fn post(&self, event: PostedEvent);

    /// 以“当前时刻”生成一个保存点，返回一次性恢复键
    ///
    /// 不支持回放语义的后端返回 `None`。
    fn save_point(&self, consumer: &Arc<dyn EventConsumer>) -> Option<String>;

    /// 将 `key` 对应的时间戳应用为该消费者的回放过滤阈值
    ///
    /// 键为空或未知时不做任何事。
    fn load_point(&self, consumer: &Arc<dyn EventConsumer>, key: &str);
}
