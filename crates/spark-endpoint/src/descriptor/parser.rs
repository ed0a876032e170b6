//! 端点字符串解析器。
//!
//! # 教案式说明
//! - **意图 (Why)**：十三种协议共享同一个 URL 外形
//!   `scheme://host[:port][/segment...][?key=value&...]`，差异只在“主机段如何拆分、
//!   第几个路径段是名称、认哪些查询键”；把外形拆分做成一次，逐协议提取各自成函数；
//! - **执行 (How)**：
//!   1. 按固定顺序匹配字面前缀完成协议分类（`https:` 额外做 SQS 探测）；
//!   2. EventHub 不走 URL 外形，直接校验 `;` 分段；
//!   3. 其余协议拆出主机段、路径段与查询串，再交给对应的 `parse_*` 函数；
//! - **契约 (What)**：严格字段（端口、`qos`、`replicate`、`retained`）非法即失败，
//!   宽松字段（布尔开关、`delivery_mode`、`priority`）从不失败；未知查询键被忽略。

use crate::{
    descriptor::{
        AMQP_DEFAULT_ROUTE, AMQP_TRANSIENT, AmqpTarget, CfQueueTarget, DisqueTarget, Endpoint,
        EventHubTarget, GrpcTarget, HttpTarget, KafkaTarget, LocalTarget, MqttTarget,
        NATS_DEFAULT_PORT, NatsTarget, PubSubTarget, RedisTarget, SqsLocator, SqsTarget, Target,
        TlsFiles,
        probe::probe_sqs,
        query::{QueryParams, parse_decimal, query_bool, query_int, unescape},
    },
    error::{NameKind, ParseError},
    protocol::Protocol,
};

/// 字面前缀与协议的对应表，匹配顺序即声明顺序。
const SCHEMES: &[(&str, Protocol)] = &[
    ("local:", Protocol::Local),
    ("http:", Protocol::Http),
    ("https:", Protocol::Http),
    ("disque:", Protocol::Disque),
    ("grpc:", Protocol::Grpc),
    ("redis:", Protocol::Redis),
    ("kafka:", Protocol::Kafka),
    ("amqp:", Protocol::Amqp),
    ("amqps:", Protocol::Amqp),
    ("mqtt:", Protocol::Mqtt),
    ("pubsub:", Protocol::PubSub),
    ("sqs:", Protocol::Sqs),
    ("nats:", Protocol::Nats),
    ("Endpoint=", Protocol::EventHub),
    ("cf-queue:", Protocol::CfQueue),
];

const GRPC_DEFAULT_PORT: u16 = 80;
const REDIS_DEFAULT_PORT: u16 = 6379;
const DISQUE_DEFAULT_PORT: u16 = 7711;
const KAFKA_DEFAULT_PORT: u16 = 9092;
const MQTT_DEFAULT_PORT: u16 = 1883;

const EVENT_HUB_KEYS: [&str; 3] = ["SharedAccessKeyName", "SharedAccessKey", "EntityPath"];

/// 解析端点字符串。
///
/// ```
/// use spark_endpoint::{Protocol, Target, parse};
///
/// let endpoint = parse("kafka://broker/orders?ssl=1").unwrap();
/// assert_eq!(endpoint.protocol(), Protocol::Kafka);
/// let Target::Kafka(kafka) = endpoint.target() else { unreachable!() };
/// assert_eq!((kafka.port, kafka.topic.as_str(), kafka.ssl), (9092, "orders", true));
/// ```
pub fn parse(input: &str) -> Result<Endpoint, ParseError> {
    let scheme = Scheme::classify(input)?;
    if scheme.protocol == Protocol::EventHub {
        return parse_event_hub(input).map(|target| Endpoint::new(input, target));
    }

    let url = UrlShape::split(input, scheme.protocol)?;
    let target = match scheme.protocol {
        Protocol::Local => Target::Local(LocalTarget {
            channel: url.host.to_owned(),
        }),
        Protocol::Http => Target::Http(HttpTarget {
            url: input.to_owned(),
        }),
        Protocol::Grpc => {
            let (host, port) = host_port(url.host, Protocol::Grpc, GRPC_DEFAULT_PORT)?;
            Target::Grpc(GrpcTarget { host, port })
        }
        Protocol::Redis => parse_redis(&url)?,
        Protocol::Disque => parse_disque(&url)?,
        Protocol::Kafka => parse_kafka(&url)?,
        Protocol::Mqtt => parse_mqtt(&url)?,
        Protocol::Sqs => parse_sqs(&url, scheme.sqs_plain_url.then_some(input))?,
        Protocol::PubSub => parse_pubsub(&url)?,
        Protocol::Amqp => parse_amqp(&url, scheme.tls)?,
        Protocol::Nats => parse_nats(&url)?,
        Protocol::CfQueue => parse_cf_queue(&url)?,
        Protocol::EventHub => parse_event_hub(input)?,
    };
    Ok(Endpoint::new(input, target))
}

/// 前缀分类的结果。
#[derive(Clone, Copy, Debug)]
struct Scheme {
    protocol: Protocol,
    /// `https:` 被探测为 SQS 队列地址。
    sqs_plain_url: bool,
    /// `amqps:`
    tls: bool,
}

impl Scheme {
    fn classify(input: &str) -> Result<Self, ParseError> {
        let (prefix, protocol) = SCHEMES
            .iter()
            .copied()
            .find(|(prefix, _)| input.starts_with(prefix))
            .ok_or(ParseError::UnknownScheme)?;

        let sqs_plain_url = prefix == "https:" && probe_sqs(input);
        Ok(Self {
            protocol: if sqs_plain_url { Protocol::Sqs } else { protocol },
            sqs_plain_url,
            tls: prefix == "amqps:",
        })
    }
}

/// 通用 URL 外形：`//host/seg1/seg2?query`。
struct UrlShape<'a> {
    protocol: Protocol,
    /// 第一个路径段，非空。
    host: &'a str,
    /// 全部路径段，下标 0 即 `host`。
    segments: Vec<&'a str>,
    query: Option<&'a str>,
}

impl<'a> UrlShape<'a> {
    fn split(input: &'a str, protocol: Protocol) -> Result<Self, ParseError> {
        let rest = input
            .split_once(':')
            .map(|(_, rest)| rest)
            .ok_or(ParseError::UnknownScheme)?;
        let rest = rest.strip_prefix("//").ok_or(ParseError::MissingSlashes)?;
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        let segments: Vec<&str> = path.split('/').collect();
        let host = segments.first().copied().unwrap_or_default();
        if host.is_empty() {
            return Err(match protocol {
                Protocol::Local => ParseError::MissingChannel,
                Protocol::CfQueue => ParseError::MissingField {
                    protocol,
                    field: "account ID",
                },
                _ => ParseError::MissingHost,
            });
        }

        Ok(Self {
            protocol,
            host,
            segments,
            query,
        })
    }

    /// 解码查询串；失败统一归类为 `invalid <protocol> url`。
    fn params(&self) -> Result<QueryParams, ParseError> {
        match self.query {
            Some(raw) => QueryParams::parse(raw).map_err(|_| ParseError::InvalidUrl(self.protocol)),
            None => Ok(QueryParams::default()),
        }
    }

    /// 反转义第 `idx` 个路径段；缺失或为空时返回 `None`。
    fn name(&self, idx: usize, kind: NameKind) -> Result<Option<String>, ParseError> {
        let Some(raw) = self.segments.get(idx) else {
            return Ok(None);
        };
        let decoded = unescape(raw).map_err(|_| ParseError::InvalidName {
            protocol: self.protocol,
            kind,
        })?;
        Ok((!decoded.is_empty()).then(|| decoded.into_owned()))
    }

    fn required_name(&self, idx: usize, kind: NameKind) -> Result<String, ParseError> {
        self.name(idx, kind)?.ok_or(ParseError::MissingName {
            protocol: self.protocol,
            kind,
        })
    }
}

/// 拆分 `host[:port]`，端口为严格的 16 位无符号十进制数。
fn host_port(host: &str, protocol: Protocol, default_port: u16) -> Result<(String, u16), ParseError> {
    let mut parts = host.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(host), None, _) => Ok((host.to_owned(), default_port)),
        (Some(host), Some(port), None) => parse_decimal(port)
            .map(|port| (host.to_owned(), port))
            .ok_or(ParseError::InvalidPort(protocol)),
        _ => Err(ParseError::InvalidUrl(protocol)),
    }
}

/// 拆分恰好两段的 `a:b` 主机段。
fn host_pair<'a>(
    host: &'a str,
    protocol: Protocol,
    expected: &'static str,
) -> Result<(&'a str, &'a str), ParseError> {
    let mut parts = host.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(second), None) => Ok((first, second)),
        _ => Err(ParseError::InvalidFormat { protocol, expected }),
    }
}

fn tls_files(params: &QueryParams) -> TlsFiles {
    TlsFiles {
        ca_cert: owned(params, "cacert"),
        cert: owned(params, "cert"),
        key: owned(params, "key"),
    }
}

fn owned(params: &QueryParams, key: &str) -> Option<String> {
    params.first(key).map(str::to_owned)
}

fn parse_redis(url: &UrlShape<'_>) -> Result<Target, ParseError> {
    let (host, port) = host_port(url.host, Protocol::Redis, REDIS_DEFAULT_PORT)?;
    let channel = url.name(1, NameKind::Channel)?;
    Ok(Target::Redis(RedisTarget {
        host,
        port,
        channel,
    }))
}

fn parse_disque(url: &UrlShape<'_>) -> Result<Target, ParseError> {
    let (host, port) = host_port(url.host, Protocol::Disque, DISQUE_DEFAULT_PORT)?;
    let queue_name = url.name(1, NameKind::Queue)?;

    let params = url.params()?;
    let replicate = match params.first("replicate") {
        Some(raw) => parse_decimal(raw).ok_or(ParseError::InvalidOption {
            protocol: Protocol::Disque,
            option: "replicate",
        })?,
        None => 0,
    };

    let queue_name = queue_name.ok_or(ParseError::MissingName {
        protocol: Protocol::Disque,
        kind: NameKind::Queue,
    })?;
    Ok(Target::Disque(DisqueTarget {
        host,
        port,
        queue_name,
        replicate,
    }))
}

fn parse_kafka(url: &UrlShape<'_>) -> Result<Target, ParseError> {
    let (host, port) = host_port(url.host, Protocol::Kafka, KAFKA_DEFAULT_PORT)?;
    let topic = url.required_name(1, NameKind::Topic)?;

    let params = url.params()?;
    Ok(Target::Kafka(KafkaTarget {
        host,
        port,
        topic,
        auth: owned(&params, "auth"),
        ssl: params.first("ssl").is_some_and(query_bool),
        sasl_sha256: params.first("sha256").is_some_and(query_bool),
        sasl_sha512: params.first("sha512").is_some_and(query_bool),
        tls: tls_files(&params),
    }))
}

fn parse_mqtt(url: &UrlShape<'_>) -> Result<Target, ParseError> {
    let (host, port) = host_port(url.host, Protocol::Mqtt, MQTT_DEFAULT_PORT)?;

    // 多级主题：剩余路径段逐一反转义后以 `/` 重新拼接。
    let mut levels = Vec::with_capacity(url.segments.len().saturating_sub(1));
    for raw in url.segments.iter().skip(1) {
        let level = unescape(raw).map_err(|_| ParseError::InvalidName {
            protocol: Protocol::Mqtt,
            kind: NameKind::Topic,
        })?;
        levels.push(level);
    }
    let topic = levels.join("/");

    let params = url.params()?;
    let qos = match params.first("qos") {
        Some(raw) => parse_decimal(raw).ok_or(ParseError::InvalidOption {
            protocol: Protocol::Mqtt,
            option: "qos",
        })?,
        None => 0,
    };
    let retained = match params.first("retained") {
        Some(raw) => match parse_decimal::<u8>(raw) {
            Some(0) => false,
            Some(1) => true,
            Some(_) => return Err(ParseError::RetainedOutOfRange),
            None => {
                return Err(ParseError::InvalidOption {
                    protocol: Protocol::Mqtt,
                    option: "retained",
                });
            }
        },
        None => false,
    };

    if topic.is_empty() {
        return Err(ParseError::MissingName {
            protocol: Protocol::Mqtt,
            kind: NameKind::Topic,
        });
    }
    Ok(Target::Mqtt(MqttTarget {
        host,
        port,
        topic,
        qos,
        retained,
        tls: tls_files(&params),
    }))
}

fn parse_sqs(url: &UrlShape<'_>, plain_url: Option<&str>) -> Result<Target, ParseError> {
    let locator = match plain_url {
        Some(plain) => SqsLocator::PlainUrl(plain.to_owned()),
        None => {
            let (region, queue_id) = host_pair(url.host, Protocol::Sqs, "region:queue_id")?;
            SqsLocator::Queue {
                region: region.to_owned(),
                queue_id: queue_id.to_owned(),
                queue_name: url.required_name(1, NameKind::Queue)?,
            }
        }
    };

    let params = url.params()?;
    // `0` 与 `false`（不区分大小写）之外的任何非空取值都表示需要自动建队列。
    let create_queue = params
        .first("createqueue")
        .is_some_and(|raw| !(raw == "0" || raw.eq_ignore_ascii_case("false")));
    Ok(Target::Sqs(SqsTarget {
        locator,
        cred_path: owned(&params, "credpath"),
        cred_profile: owned(&params, "credprofile"),
        create_queue,
    }))
}

fn parse_pubsub(url: &UrlShape<'_>) -> Result<Target, ParseError> {
    let (project, topic) = host_pair(url.host, Protocol::PubSub, "project:topic")?;
    let params = url.params()?;
    Ok(Target::PubSub(PubSubTarget {
        project: project.to_owned(),
        topic: topic.to_owned(),
        cred_path: owned(&params, "credpath"),
    }))
}

fn parse_amqp(url: &UrlShape<'_>, tls: bool) -> Result<Target, ParseError> {
    // `host/namespace/queue` 折叠命名空间；`host/queue/`（末尾斜杠）不折叠。
    let (uri, queue_idx) = match url.segments.get(2) {
        Some(next) if !next.is_empty() => (format!("{}/{}", url.host, url.segments[1]), 2),
        _ => (url.host.to_owned(), 1),
    };
    let queue_name = url.name(queue_idx, NameKind::Queue)?;

    let params = url.params()?;
    let flag = |key: &str, default: bool| params.first(key).map_or(default, query_bool);
    let byte = |key: &str, default: u8| params.first(key).map_or(default, |raw| query_int(raw) as u8);

    let queue_name = queue_name.ok_or(ParseError::MissingName {
        protocol: Protocol::Amqp,
        kind: NameKind::Queue,
    })?;
    Ok(Target::Amqp(AmqpTarget {
        uri,
        ssl: tls,
        queue_name,
        route_key: params.first("route").unwrap_or(AMQP_DEFAULT_ROUTE).to_owned(),
        exchange_type: params.first("type").unwrap_or("direct").to_owned(),
        durable: flag("durable", true),
        auto_delete: flag("auto_delete", false),
        internal: flag("internal", false),
        no_wait: flag("no_wait", false),
        mandatory: flag("mandatory", false),
        immediate: flag("immediate", false),
        delivery_mode: byte("delivery_mode", AMQP_TRANSIENT),
        priority: byte("priority", 0),
    }))
}

fn parse_nats(url: &UrlShape<'_>) -> Result<Target, ParseError> {
    let mut parts = url.host.split(':');
    let (host, port) = match (parts.next(), parts.next(), parts.next()) {
        (Some(host), None, _) => (host, NATS_DEFAULT_PORT),
        // 端口无法解析时回落到默认端口，而不是报错。
        (Some(host), Some(port), None) => (host, port.parse().unwrap_or(NATS_DEFAULT_PORT)),
        _ => return Err(ParseError::InvalidUrl(Protocol::Nats)),
    };
    let topic = url.name(1, NameKind::Topic)?;

    let params = url.params()?;
    Ok(Target::Nats(NatsTarget {
        host: host.to_owned(),
        port,
        topic,
        user: owned(&params, "user"),
        pass: owned(&params, "pass"),
        token: owned(&params, "token"),
        secure: params.first("secure").is_some_and(query_bool),
        credential_path: owned(&params, "credential"),
        jetstream: params.first("jetstream").is_some_and(query_bool),
        tls: params.first("tls").is_some_and(query_bool),
        tls_cert: owned(&params, "tlscert"),
        tls_key: owned(&params, "tlskey"),
    }))
}

fn parse_cf_queue(url: &UrlShape<'_>) -> Result<Target, ParseError> {
    let Some(queue_id) = url.segments.get(1) else {
        return Err(ParseError::InvalidFormat {
            protocol: Protocol::CfQueue,
            expected: "account_id/queue_id",
        });
    };
    let params = url.params()?;

    let missing = |field| ParseError::MissingField {
        protocol: Protocol::CfQueue,
        field,
    };
    if queue_id.is_empty() {
        return Err(missing("queue ID"));
    }
    let api_token = params.first("token").ok_or_else(|| missing("API token"))?;
    Ok(Target::CfQueue(CfQueueTarget {
        account_id: url.host.to_owned(),
        queue_id: (*queue_id).to_owned(),
        api_token: api_token.to_owned(),
    }))
}

/// EventHub 连接串：恰好 4 个 `;` 分段，第 2~4 段的键按固定顺序出现。
fn parse_event_hub(input: &str) -> Result<Target, ParseError> {
    let segments: Vec<&str> = input.split(';').collect();
    let [_, rest @ ..] = segments.as_slice() else {
        return Err(ParseError::MalformedEventHub);
    };
    if rest.len() != EVENT_HUB_KEYS.len() {
        return Err(ParseError::MalformedEventHub);
    }
    for (segment, expected) in rest.iter().zip(EVENT_HUB_KEYS) {
        match segment.split_once('=') {
            Some((key, _)) if key == expected => {}
            _ => return Err(ParseError::MissingEventHubKey(expected)),
        }
    }
    Ok(Target::EventHub(EventHubTarget {
        connection_string: input.to_owned(),
    }))
}
