use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tracing::trace;

use crate::{
    conn::{Conn, ConnError, ConnFactory, SharedConn},
    descriptor::{Endpoint, LocalTarget, Target},
};

/// 进程内发布总线的注入能力。
///
/// - **契约 (What)**：`publish` 把消息扇出给订阅了 `channel` 的接收方，返回接收方数量；
///   没有订阅者不算失败。
pub trait LocalPublisher: Send + Sync + 'static {
    fn publish(&self, channel: &str, message: &str) -> usize;
}

/// `local://<channel>` 的连接：直接转交给 [`LocalPublisher`]。
///
/// 本地总线不会自行失效，只有 [`Conn::expire_now`] 会让后续投递返回
/// [`ConnError::Expired`]。
pub struct LocalConn {
    channel: String,
    publisher: Arc<dyn LocalPublisher>,
    expired: AtomicBool,
}

impl LocalConn {
    pub fn new(target: LocalTarget, publisher: Arc<dyn LocalPublisher>) -> Self {
        Self {
            channel: target.channel,
            publisher,
            expired: AtomicBool::new(false),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl Conn for LocalConn {
    fn expire_now(&self) {
        self.expired.store(true, Ordering::Release);
    }

    fn expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }

    async fn send(&self, message: &str) -> Result<(), ConnError> {
        if self.expired() {
            return Err(ConnError::Expired);
        }
        let receivers = self.publisher.publish(&self.channel, message);
        trace!(channel = %self.channel, receivers, "published to local channel");
        Ok(())
    }
}

pub(crate) struct LocalFactory {
    publisher: Arc<dyn LocalPublisher>,
}

impl LocalFactory {
    pub(crate) fn new(publisher: Arc<dyn LocalPublisher>) -> Self {
        Self { publisher }
    }
}

impl ConnFactory for LocalFactory {
    fn connect(&self, endpoint: Endpoint) -> Result<SharedConn, ConnError> {
        match endpoint.into_parts().1 {
            Target::Local(target) => Ok(Arc::new(LocalConn::new(
                target,
                Arc::clone(&self.publisher),
            ))),
            other => Err(ConnError::transport(format!(
                "local factory cannot serve {} endpoints",
                other.protocol()
            ))),
        }
    }
}
