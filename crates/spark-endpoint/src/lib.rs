//! # spark-endpoint
//!
//! ## 定位与职责（Why）
//! - 作为通知/Webhook 投递层的端点分发核心：把一行描述目的地的字符串
//!   （十三种传输协议之一）解析为强类型描述符，按端点原文惰性建立并缓存连接，
//!   并在缓存连接失效时自动换新后投递；
//! - 各协议的网络客户端不在本 crate 内，它们通过 [`ConnFactory`] 接入，
//!   本 crate 只约定三方法的 [`Conn`] 契约。
//!
//! ## 架构嵌入（Where）
//! - `descriptor`：端点语法与逐协议字段提取，含宽松解码工具 [`query_bool`] / [`query_int`]；
//! - `conn`：连接契约、协议分发表、`local` 连接与空闲租约；
//! - `manager`：连接缓存、后台清扫与投递重试；
//! - `config` / `error`：运行参数与错误域。
//!
//! ## 使用示例（How）
//!
//! ```no_run
//! use std::sync::Arc;
//! use spark_endpoint::{ConnRegistry, LocalPublisher, Manager};
//!
//! struct Bus;
//! impl LocalPublisher for Bus {
//!     fn publish(&self, _channel: &str, _message: &str) -> usize { 0 }
//! }
//!
//! # async fn demo() -> Result<(), spark_endpoint::EndpointError> {
//! let manager = Manager::new(ConnRegistry::with_local_publisher(Arc::new(Bus)));
//! manager.validate("kafka://broker:9092/orders?ssl=1")?;
//! manager.send("local://alerts", r#"{"id":1}"#).await?;
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conn;
pub mod descriptor;
pub mod error;
pub mod manager;
pub mod protocol;

pub use config::ManagerConfig;
pub use conn::{
    BoxError, Conn, ConnError, ConnFactory, ConnRegistry, IdleLease, LocalConn, LocalPublisher,
    SharedConn,
};
pub use descriptor::{Endpoint, Target, parse, query_bool, query_int};
pub use error::{ConfigError, EndpointError, NameKind, ParseError};
pub use manager::Manager;
pub use protocol::Protocol;
