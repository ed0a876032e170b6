use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::time::Instant;

/// 基于空闲时长的过期追踪器，供连接实现内嵌使用。
///
/// # 教案式说明
/// - **意图 (Why)**：网络连接通常在空闲一段时间后主动放弃（默认 30 秒），让缓存借助清扫任务
///   定期重建会话，顺带完成凭据轮换；各协议实现只需在成功投递后 `touch` 一次；
/// - **契约 (What)**：
///   - `expired` 一旦返回 `true` 便保持为 `true`，`touch` 无法复活已过期的租约；
///   - `expired` 只读取时钟与原子标志，不触发 I/O；
///   - 时钟取自 `tokio::time`，在暂停时间的测试中同样可控。
#[derive(Debug)]
pub struct IdleLease {
    idle_timeout: Duration,
    last_used: Mutex<Instant>,
    expired: AtomicBool,
}

impl IdleLease {
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            last_used: Mutex::new(Instant::now()),
            expired: AtomicBool::new(false),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// 记录一次使用；租约已过期时返回 `false`。
    pub fn touch(&self) -> bool {
        if self.expired() {
            return false;
        }
        *self.last_used.lock() = Instant::now();
        true
    }

    pub fn expired(&self) -> bool {
        if self.expired.load(Ordering::Acquire) {
            return true;
        }
        if self.last_used.lock().elapsed() >= self.idle_timeout {
            self.expired.store(true, Ordering::Release);
            return true;
        }
        false
    }

    pub fn expire_now(&self) {
        self.expired.store(true, Ordering::Release);
    }
}

impl Default for IdleLease {
    fn default() -> Self {
        Self::new(Self::DEFAULT_IDLE_TIMEOUT)
    }
}
