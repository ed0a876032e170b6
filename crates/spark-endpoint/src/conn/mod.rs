//! # conn 模块说明
//!
//! ## 角色定位（Why）
//! - 定义所有协议连接必须满足的三方法契约 [`Conn`]，管理器只面向该契约编程；
//! - 通过 [`ConnRegistry`] 以协议标签选择工厂，新增协议只需注册一条工厂，无需改动分发逻辑。
//!
//! ## 契约（What）
//! - `send` 在底层会话已不可用时必须返回 [`ConnError::Expired`]，而不是其他错误类别，
//!   管理器据此区分“换新连接重试”与“投递确实失败”；
//! - `expired` 不得阻塞在网络 I/O 上，清扫任务与投递前检查都会调用它；
//! - `expire_now` 立即标记过期并尽快释放底层资源，关闭流程依赖它。
//!
//! ## 风险提示（Trade-offs）
//! - 管理器不在锁内执行 `send`，因此连接可能在被逐出或替换之后仍被调用一次；
//!   实现必须容忍这种“逻辑过期后的调用”，返回 `Expired` 而非 panic 或破坏内部状态。

mod lease;
mod local;
mod registry;

pub use lease::IdleLease;
pub use local::{LocalConn, LocalPublisher};
pub use registry::{ConnFactory, ConnRegistry};

use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

/// 连接实现可返回的任意底层错误。
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// 缓存中共享的连接句柄。
pub type SharedConn = Arc<dyn Conn>;

/// 单个目的地的活跃（或刚失效）的传输层连接。
#[async_trait]
pub trait Conn: Send + Sync + 'static {
    /// 立即标记过期，随后 [`Conn::expired`] 必须返回 `true`。
    fn expire_now(&self);

    /// 非阻塞的过期检查（TTL、健康探测结果或关闭标志）。
    fn expired(&self) -> bool;

    /// 同步投递一条消息，完成（或失败）后返回。
    async fn send(&self, message: &str) -> Result<(), ConnError>;
}

/// 连接层错误。
#[derive(Debug, Error)]
pub enum ConnError {
    /// 会话已失效，需要换新连接后重试。
    #[error("connection expired")]
    Expired,

    /// 网络或客户端库错误，原样保留。
    #[error("transport failure: {source}")]
    Transport {
        #[source]
        source: BoxError,
    },

    /// 远端明确拒绝了该消息。
    #[error("remote rejected message: {0}")]
    Rejected(String),
}

impl ConnError {
    pub fn transport(source: impl Into<BoxError>) -> Self {
        ConnError::Transport {
            source: source.into(),
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, ConnError::Expired)
    }
}
