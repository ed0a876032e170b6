//! # protocol 模块说明
//!
//! ## 角色定位（Why）
//! - 为端点描述符、连接工厂注册表与错误信息提供统一的协议标签，避免各处散落字符串常量；
//! - 标签与 [`Target`](crate::descriptor::Target) 的变体一一对应，注册表以它为键完成分发。
//!
//! ## 契约（What）
//! - [`Protocol::as_str`] 返回稳定的线上名称（EventHub 沿用历史值 `sb`）；
//! - [`Protocol::label`] 返回面向人类的名称，仅用于错误消息拼装。

use core::fmt;

use serde::{Deserialize, Serialize};

/// 端点所使用的传输协议。
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// 进程内发布总线。
    Local,
    Http,
    Disque,
    Grpc,
    Redis,
    Kafka,
    Mqtt,
    Amqp,
    Sqs,
    #[serde(rename = "pubsub")]
    PubSub,
    Nats,
    /// Azure EventHub，历史标签为 `sb`（Service Bus）。
    #[serde(rename = "sb")]
    EventHub,
    /// Cloudflare Queues。
    CfQueue,
}

impl Protocol {
    /// 全部协议标签，顺序与描述符变体声明顺序一致。
    pub const ALL: [Protocol; 13] = [
        Protocol::Local,
        Protocol::Http,
        Protocol::Disque,
        Protocol::Grpc,
        Protocol::Redis,
        Protocol::Kafka,
        Protocol::Mqtt,
        Protocol::Amqp,
        Protocol::Sqs,
        Protocol::PubSub,
        Protocol::Nats,
        Protocol::EventHub,
        Protocol::CfQueue,
    ];

    /// 稳定的线上名称。
    pub const fn as_str(self) -> &'static str {
        match self {
            Protocol::Local => "local",
            Protocol::Http => "http",
            Protocol::Disque => "disque",
            Protocol::Grpc => "grpc",
            Protocol::Redis => "redis",
            Protocol::Kafka => "kafka",
            Protocol::Mqtt => "mqtt",
            Protocol::Amqp => "amqp",
            Protocol::Sqs => "sqs",
            Protocol::PubSub => "pubsub",
            Protocol::Nats => "nats",
            Protocol::EventHub => "sb",
            Protocol::CfQueue => "cf-queue",
        }
    }

    /// 错误消息中使用的人类可读名称。
    ///
    /// - **契约 (What)**：与既有部署中的告警文本保持一致，例如 `invalid MQTT url port`、
    ///   `missing CF Queue API token`；调用方不应据此做程序化分支。
    pub const fn label(self) -> &'static str {
        match self {
            Protocol::Local => "local",
            Protocol::Http => "http",
            Protocol::Disque => "disque",
            Protocol::Grpc => "grpc",
            Protocol::Redis => "redis",
            Protocol::Kafka => "kafka",
            Protocol::Mqtt => "MQTT",
            Protocol::Amqp => "AMQP",
            Protocol::Sqs => "SQS",
            Protocol::PubSub => "PubSub",
            Protocol::Nats => "NATS",
            Protocol::EventHub => "EventHub",
            Protocol::CfQueue => "CF Queue",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
