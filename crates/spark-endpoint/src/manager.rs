//! # Manager：端点连接缓存与投递调度
//!
//! ## 核心意图（Why）
//! - 以端点原文为键缓存连接，首次投递时惰性建连，发现过期时原地替换；
//! - 后台清扫任务按固定周期逐出过期连接，即便没有流量也能约束缓存规模并促成定期重连。
//!
//! ## 行为契约（What）
//! - 每个端点原文在任一时刻至多对应一个缓存连接；
//! - 缓存分片锁只覆盖查找、构建与插入，从不覆盖 `Conn::send` 的 I/O；
//! - `send` 收到 [`ConnError::Expired`] 时换新连接重试，次数受
//!   [`ManagerConfig::expired_retry_limit`] 约束；其他错误原样返回；
//! - `validate` 只运行解析器，不产生连接也不触碰缓存；
//! - `shutdown` 幂等：首次调用强制过期并清空缓存、等待清扫任务退出；并发或后续的调用
//!   同样等到这一过程完成才返回。此后 `send` 返回 [`EndpointError::Closed`]。
//!
//! ## 风险提示（Trade-offs）
//! - 锁外投递意味着同一端点的两个并发调用可能同时发现过期条目并各自重建，后写入者覆盖先写入者，
//!   两者都会在自己取得的连接上完成投递；
//! - 清扫任务只持有弱引用，所有 `Manager` 句柄被丢弃后会在下一个周期自行退出。

use std::{
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::Mutex;
use tokio::{
    sync::{Notify, watch},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, trace, warn};

use crate::{
    config::ManagerConfig,
    conn::{ConnError, ConnRegistry, SharedConn},
    descriptor::parse,
    error::{ConfigError, EndpointError, ParseError},
};

/// 端点连接管理器，可廉价克隆并在任务间共享。
#[derive(Clone)]
pub struct Manager {
    inner: Arc<Inner>,
}

struct Inner {
    conns: DashMap<Arc<str>, SharedConn>,
    registry: ConnRegistry,
    config: ManagerConfig,
    closed: AtomicBool,
    shutdown: Arc<Notify>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    /// 首个 `shutdown` 完成清空与回收后置为 `true`。
    stopped: watch::Sender<bool>,
}

impl Manager {
    /// 以默认配置创建管理器并启动清扫任务。
    ///
    /// # Panics
    /// 必须在 Tokio 运行时上下文中调用（与 `tokio::spawn` 相同）。
    pub fn new(registry: ConnRegistry) -> Self {
        Self::spawn(registry, ManagerConfig::default())
    }

    /// 以给定配置创建管理器；配置非法时返回 [`ConfigError`]。
    ///
    /// # Panics
    /// 必须在 Tokio 运行时上下文中调用。
    pub fn with_config(registry: ConnRegistry, config: ManagerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::spawn(registry, config))
    }

    fn spawn(registry: ConnRegistry, config: ManagerConfig) -> Self {
        let period = config.sweep_interval;
        let shutdown = Arc::new(Notify::new());
        let inner = Arc::new(Inner {
            conns: DashMap::new(),
            registry,
            config,
            closed: AtomicBool::new(false),
            shutdown: Arc::clone(&shutdown),
            sweeper: Mutex::new(None),
            stopped: watch::Sender::new(false),
        });

        let handle = tokio::spawn(sweep_loop(Arc::downgrade(&inner), period, shutdown));
        *inner.sweeper.lock() = Some(handle);
        Self { inner }
    }

    /// 校验端点字符串，不建立连接。
    pub fn validate(&self, endpoint: &str) -> Result<(), ParseError> {
        parse(endpoint).map(drop)
    }

    /// 向端点投递一条消息。
    ///
    /// # 教案式说明
    /// - **执行 (How)**：
    ///   1. 在分片锁内查找缓存；缺失或已过期时解析端点、经注册表构建新连接并写回；
    ///   2. 释放锁后在取得的连接上调用 `send`；
    ///   3. 若返回 `Expired`，说明连接在检查与使用之间失效：摘除该连接后回到第 1 步；
    /// - **契约 (What)**：解析错误、未注册协议、工厂失败与非过期的投递错误都立即返回；
    ///   过期信号只在重试次数耗尽时以 [`EndpointError::ExpiredRetriesExhausted`] 浮出。
    pub async fn send(&self, endpoint: &str, message: &str) -> Result<(), EndpointError> {
        let mut rebuilds = 0u32;
        loop {
            let conn = self.inner.checkout(endpoint)?;
            match conn.send(message).await {
                Ok(()) => return Ok(()),
                Err(ConnError::Expired) => {
                    self.inner.evict_if_same(endpoint, &conn);
                    if rebuilds >= self.inner.config.expired_retry_limit {
                        return Err(EndpointError::ExpiredRetriesExhausted {
                            attempts: rebuilds + 1,
                        });
                    }
                    rebuilds += 1;
                    debug!(
                        endpoint = %redact(endpoint),
                        attempt = rebuilds,
                        "connection expired during send, rebuilding"
                    );
                }
                Err(err) => return Err(EndpointError::Delivery(err)),
            }
        }
    }

    /// 关闭管理器：强制过期全部缓存连接并等待清扫任务退出。
    ///
    /// 只有首个调用者执行关闭流程，其余调用者等待它完成后返回。
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            let mut stopped = self.inner.stopped.subscribe();
            // 发送端由 `Inner` 持有，与本句柄同寿命，等待不会因通道关闭而提前结束。
            let _ = stopped.wait_for(|stopped| *stopped).await;
            return;
        }

        let mut expired = 0usize;
        self.inner.conns.retain(|_, conn| {
            conn.expire_now();
            expired += 1;
            false
        });
        info!(expired, "endpoint manager shut down");

        self.inner.shutdown.notify_one();
        let handle = self.inner.sweeper.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "endpoint sweeper ended abnormally");
            }
        }
        self.inner.stopped.send_replace(true);
    }

    /// 立即执行一轮清扫，返回被逐出的连接数量。
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// 缓存中的连接数量（含尚未被清扫的过期连接）。
    pub fn len(&self) -> usize {
        self.inner.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.conns.is_empty()
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        self.inner.conns.contains_key(endpoint)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("connections", &self.inner.conns.len())
            .field("registry", &self.inner.registry)
            .field("config", &self.inner.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Inner {
    fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 取得可用连接；必要时在分片锁内解析、构建并写回缓存。
    fn checkout(&self, endpoint: &str) -> Result<SharedConn, EndpointError> {
        if self.closed() {
            return Err(EndpointError::Closed);
        }
        let cached = self.conns.get(endpoint).map(|entry| Arc::clone(entry.value()));
        if let Some(conn) = cached.filter(|conn| !conn.expired()) {
            return Ok(conn);
        }

        // 关闭标志需在分片锁内复查：`shutdown` 先置位再逐分片清空，二者经分片锁排成先后。
        match self.conns.entry(Arc::from(endpoint)) {
            Entry::Occupied(mut occupied) => {
                if self.closed() {
                    return Err(EndpointError::Closed);
                }
                if !occupied.get().expired() {
                    return Ok(Arc::clone(occupied.get()));
                }
                let conn = self.build(endpoint, true)?;
                occupied.insert(Arc::clone(&conn));
                Ok(conn)
            }
            Entry::Vacant(vacant) => {
                if self.closed() {
                    return Err(EndpointError::Closed);
                }
                let conn = self.build(endpoint, false)?;
                vacant.insert(Arc::clone(&conn));
                Ok(conn)
            }
        }
    }

    fn build(&self, endpoint: &str, replacing: bool) -> Result<SharedConn, EndpointError> {
        let descriptor = parse(endpoint)?;
        let protocol = descriptor.protocol();
        let conn = self.registry.connect(descriptor)?;
        debug!(
            %protocol,
            endpoint = %redact(endpoint),
            replacing,
            "built endpoint connection"
        );
        Ok(conn)
    }

    /// 仅当缓存中仍是同一连接时才摘除，避免误删并发调用者刚写入的新连接。
    fn evict_if_same(&self, endpoint: &str, conn: &SharedConn) {
        self.conns
            .remove_if(endpoint, |_, cached| Arc::ptr_eq(cached, conn));
    }

    fn purge_expired(&self) -> usize {
        let mut evicted = 0usize;
        self.conns.retain(|_, conn| {
            let keep = !conn.expired();
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }
}

async fn sweep_loop(inner: Weak<Inner>, period: Duration, shutdown: Arc<Notify>) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.notified() => break,
        }
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if inner.closed() {
            break;
        }
        let evicted = inner.purge_expired();
        if evicted > 0 {
            debug!(
                evicted,
                remaining = inner.conns.len(),
                "swept expired endpoint connections"
            );
        }
    }
    trace!("endpoint sweeper stopped");
}

/// 日志中使用的端点摘要：保留 scheme 与主机，去掉 userinfo、路径与查询串。
///
/// userinfo 按查询串之前的最后一个 `@` 切除，口令中夹带 `/` 时也不会泄露片段。
fn redact(endpoint: &str) -> String {
    let Some((scheme, rest)) = endpoint.split_once("://") else {
        return endpoint.split([':', ';']).next().unwrap_or_default().to_owned();
    };
    let before_query = rest.split('?').next().unwrap_or_default();
    let without_userinfo = before_query.rsplit('@').next().unwrap_or(before_query);
    let host = without_userinfo.split(['/', ';']).next().unwrap_or_default();
    format!("{scheme}://{host}")
}
