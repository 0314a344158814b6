//! 分发层统一错误定义
//!
//! 仅覆盖引擎内部可能出现的最小必要集合（广播通道、投递回调），
//! 公开操作遵循“只记录、不抛出”的策略，错误类型不会越过公共边界。
//!
use thiserror::Error;

/// 统一错误类型（引擎内部使用）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RelayError {
    // --- 广播通道 ---
    #[error("channel error: {reason}")]
    Channel { reason: String },
}

impl RelayError {
    pub fn channel(reason: impl Into<String>) -> Self {
        Self::Channel {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type RelayResult<T> = Result<T, RelayError>;
