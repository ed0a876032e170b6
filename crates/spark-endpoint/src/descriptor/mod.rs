//! # descriptor 模块说明
//!
//! ## 角色定位（Why）
//! - 把一行端点字符串（`kafka://broker:9092/orders?ssl=1`、`Endpoint=sb://...` 等）
//!   解析为强类型的 [`Endpoint`]，供连接工厂消费；
//! - 同一解析器同时服务于配置期校验（[`Manager::validate`](crate::Manager::validate)）
//!   与运行期建连，两者结论必然一致。
//!
//! ## 结构（How）
//! - [`Endpoint`] = 原始字符串 + [`Target`]；`Target` 每个变体只携带对应协议的字段，
//!   不存在“哪个子结构才有效”的歧义；
//! - `parser` 负责语法分类与逐协议提取，`query` 提供严格/宽松两类解码工具，
//!   `probe` 负责 `https:` 的 SQS 探测。
//!
//! ## 契约（What）
//! - [`parse`] 是纯函数：相同输入总得到相同结果，返回值构造后不再变化；
//! - 失败时只返回 [`ParseError`](crate::ParseError)，不会泄露部分填充的描述符。

mod parser;
mod probe;
mod query;

pub use parser::parse;
pub use probe::probe_sqs;
pub use query::{query_bool, query_int};

use crate::protocol::Protocol;

/// 解析后的端点描述符。
///
/// - **契约 (What)**：`original` 保存输入原文，连接缓存以它为键；`target` 保存协议字段；
/// - **生命周期**：每次解析构造一次，交给工厂后即可丢弃，管理器不会保留它。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoint {
    original: String,
    target: Target,
}

impl Endpoint {
    pub(crate) fn new(original: &str, target: Target) -> Self {
        Self {
            original: original.to_owned(),
            target,
        }
    }

    /// 输入原文。
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn protocol(&self) -> Protocol {
        self.target.protocol()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// 拆解为原文与协议字段，供工厂按值取走。
    pub fn into_parts(self) -> (String, Target) {
        (self.original, self.target)
    }
}

/// 按协议区分的目的地字段。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
    Local(LocalTarget),
    Http(HttpTarget),
    Disque(DisqueTarget),
    Grpc(GrpcTarget),
    Redis(RedisTarget),
    Kafka(KafkaTarget),
    Mqtt(MqttTarget),
    Amqp(AmqpTarget),
    Sqs(SqsTarget),
    PubSub(PubSubTarget),
    Nats(NatsTarget),
    EventHub(EventHubTarget),
    CfQueue(CfQueueTarget),
}

impl Target {
    pub fn protocol(&self) -> Protocol {
        match self {
            Target::Local(_) => Protocol::Local,
            Target::Http(_) => Protocol::Http,
            Target::Disque(_) => Protocol::Disque,
            Target::Grpc(_) => Protocol::Grpc,
            Target::Redis(_) => Protocol::Redis,
            Target::Kafka(_) => Protocol::Kafka,
            Target::Mqtt(_) => Protocol::Mqtt,
            Target::Amqp(_) => Protocol::Amqp,
            Target::Sqs(_) => Protocol::Sqs,
            Target::PubSub(_) => Protocol::PubSub,
            Target::Nats(_) => Protocol::Nats,
            Target::EventHub(_) => Protocol::EventHub,
            Target::CfQueue(_) => Protocol::CfQueue,
        }
    }
}

/// `local://<channel>`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalTarget {
    pub channel: String,
}

/// `http://` 或未被识别为 SQS 的 `https://`，原文即投递地址。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HttpTarget {
    pub url: String,
}

/// `disque://<host>[:port]/<queue>?replicate=<n>`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DisqueTarget {
    pub host: String,
    pub port: u16,
    pub queue_name: String,
    pub replicate: u8,
}

/// `grpc://<host>[:port]`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GrpcTarget {
    pub host: String,
    pub port: u16,
}

/// `redis://<host>[:port][/<channel>]`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RedisTarget {
    pub host: String,
    pub port: u16,
    pub channel: Option<String>,
}

/// TLS 材料的文件路径，内容由连接实现自行加载。
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TlsFiles {
    pub ca_cert: Option<String>,
    pub cert: Option<String>,
    pub key: Option<String>,
}

impl TlsFiles {
    pub fn is_empty(&self) -> bool {
        self.ca_cert.is_none() && self.cert.is_none() && self.key.is_none()
    }
}

/// `kafka://<host>[:port]/<topic>?auth=&ssl=&sha256=&sha512=&cacert=&cert=&key=`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KafkaTarget {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub auth: Option<String>,
    pub ssl: bool,
    pub sasl_sha256: bool,
    pub sasl_sha512: bool,
    pub tls: TlsFiles,
}

/// `mqtt://<host>[:port]/<topic/levels...>?qos=&retained=&cacert=&cert=&key=`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MqttTarget {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub qos: u8,
    pub retained: bool,
    pub tls: TlsFiles,
}

/// AMQP 投递模式：1 = transient，2 = persistent。
pub const AMQP_TRANSIENT: u8 = 1;

/// 未显式指定 `route` 时使用的路由键。
pub const AMQP_DEFAULT_ROUTE: &str = "tile38";

/// `amqp[s]://[user:pass@]<host>[:port][/<namespace>]/<queue>/?route=&type=...`
///
/// - `uri` 为主机段（含 userinfo），存在命名空间时折叠为 `host/namespace`；
///   连接实现按 `ssl` 选择 `amqp://` 或 `amqps://` 前缀拼回完整地址。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AmqpTarget {
    pub uri: String,
    pub ssl: bool,
    pub queue_name: String,
    pub route_key: String,
    pub exchange_type: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub no_wait: bool,
    pub mandatory: bool,
    pub immediate: bool,
    pub delivery_mode: u8,
    pub priority: u8,
}

/// SQS 队列定位方式，两种形态互斥。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SqsLocator {
    /// 通过 `https:` 探测识别的完整队列 URL。
    PlainUrl(String),
    /// `sqs://<region>:<queue_id>/<queue_name>`
    Queue {
        region: String,
        queue_id: String,
        queue_name: String,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SqsTarget {
    pub locator: SqsLocator,
    pub cred_path: Option<String>,
    pub cred_profile: Option<String>,
    pub create_queue: bool,
}

/// `pubsub://<project>:<topic>?credpath=`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PubSubTarget {
    pub project: String,
    pub topic: String,
    pub cred_path: Option<String>,
}

/// NATS 默认端口，端口缺失或无法解析时使用。
pub const NATS_DEFAULT_PORT: u16 = 4222;

/// `nats://<host>[:port][/<topic>]?user=&pass=&token=&secure=&credential=&jetstream=&tls=&tlscert=&tlskey=`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NatsTarget {
    pub host: String,
    pub port: u16,
    pub topic: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub token: Option<String>,
    pub secure: bool,
    pub credential_path: Option<String>,
    /// 通过 JetStream 发布并等待确认。
    pub jetstream: bool,
    pub tls: bool,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
}

/// `Endpoint=sb://...;SharedAccessKeyName=...;SharedAccessKey=...;EntityPath=...`
///
/// 下游客户端自行解析连接串，这里只保存原文。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EventHubTarget {
    pub connection_string: String,
}

/// `cf-queue://<account_id>/<queue_id>?token=<api_token>`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CfQueueTarget {
    pub account_id: String,
    pub queue_id: String,
    pub api_token: String,
}
