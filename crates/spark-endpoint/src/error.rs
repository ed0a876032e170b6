//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义端点解析、连接构建与投递三个阶段的错误语义；
//! - 区分“终止性错误”（解析失败、协议未注册、投递失败）与“瞬时过期”信号，
//!   后者只在 [`Manager`](crate::Manager) 内部用于触发重建，不会原样暴露给调用方。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`，满足 `Send + Sync + 'static`；
//! - [`ParseError`] 每个变体对应一条可区分的消息，并实现 `Clone + Eq` 以便表驱动测试；
//! - 投递失败保留底层 [`ConnError`] 作为 `source`，不做任何改写。

use thiserror::Error;

use crate::{conn::ConnError, protocol::Protocol};

/// 路径段所承载名称的种类，仅用于错误消息。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameKind {
    Queue,
    Topic,
    Channel,
}

impl NameKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NameKind::Queue => "queue",
            NameKind::Topic => "topic",
            NameKind::Channel => "channel",
        }
    }
}

/// 端点字符串解析失败的分类。
///
/// # 教案式说明
/// - **意图 (Why)**：配置校验与运行期投递共用同一套解析器，错误需要足够具体，
///   让运维能直接定位到字符串中的问题片段；
/// - **契约 (What)**：解析失败时不会返回任何部分填充的描述符；
/// - **风险 (Trade-offs)**：消息文本沿用既有部署的措辞（包括大小写），改动前需评估告警规则。
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown scheme")]
    UnknownScheme,

    #[error("missing the two slashes")]
    MissingSlashes,

    #[error("missing host")]
    MissingHost,

    /// `local://` 缺少频道名，与通用的缺失主机区分。
    #[error("missing channel")]
    MissingChannel,

    #[error("invalid {} url", .0.label())]
    InvalidUrl(Protocol),

    #[error("invalid {} url port", .0.label())]
    InvalidPort(Protocol),

    #[error("invalid {} {} name", .protocol.label(), .kind.as_str())]
    InvalidName { protocol: Protocol, kind: NameKind },

    #[error("missing {} {} name", .protocol.label(), .kind.as_str())]
    MissingName { protocol: Protocol, kind: NameKind },

    /// 严格解码的查询参数（如 `qos`、`replicate`）取值非法。
    #[error("invalid {} {option} value", .protocol.label())]
    InvalidOption {
        protocol: Protocol,
        option: &'static str,
    },

    #[error("invalid MQTT retained, should be [0, 1]")]
    RetainedOutOfRange,

    /// 主机段不符合协议要求的 `a:b` 结构。
    #[error("invalid {} format, should be {expected}", .protocol.label())]
    InvalidFormat {
        protocol: Protocol,
        expected: &'static str,
    },

    #[error("malformed EventHub connection string")]
    MalformedEventHub,

    /// EventHub 连接串的第 2~4 段缺少固定顺序的键。
    #[error("missing {0}")]
    MissingEventHubKey(&'static str),

    /// 必填的凭据/标识字段缺失，例如 CF Queue 的 API token。
    #[error("missing {} {field}", .protocol.label())]
    MissingField {
        protocol: Protocol,
        field: &'static str,
    },
}

/// 配置加载失败。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid endpoint manager config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,
}

/// [`Manager`](crate::Manager) 对外暴露的错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：调用方只需处理一种错误类型，同时能区分“配置写错了”与“目的地不可达”；
/// - **契约 (What)**：
///   - `Parse`：端点字符串非法，永不重试；
///   - `InvalidProtocol`：解析成功但注册表中没有对应工厂，属于装配缺陷；
///   - `Connect`：工厂拒绝构建连接；
///   - `Delivery`：连接返回的非过期错误，原样作为 `source`；
///   - `ExpiredRetriesExhausted`：连续收到过期信号，超过重试上限；
///   - `Closed`：管理器已关闭。
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid protocol `{0}`")]
    InvalidProtocol(Protocol),

    #[error("failed to build {protocol} connection")]
    Connect {
        protocol: Protocol,
        #[source]
        source: ConnError,
    },

    #[error(transparent)]
    Delivery(ConnError),

    #[error("connection kept expiring after {attempts} attempts")]
    ExpiredRetriesExhausted { attempts: u32 },

    #[error("endpoint manager is shut down")]
    Closed,
}

impl EndpointError {
    /// 是否为解析阶段的错误。
    pub fn is_parse(&self) -> bool {
        matches!(self, EndpointError::Parse(_))
    }
}
