//! # config 模块说明
//!
//! [`ManagerConfig`] 描述连接管理器的运行参数，可由宿主从 TOML 片段加载：
//!
//! ```toml
//! sweep_interval_ms = 1000
//! expired_retry_limit = 1
//! ```
//!
//! 缺省字段取默认值；配置文件的定位与热更新由宿主负责。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 清扫任务的默认周期。
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// 单次 `send` 收到过期信号后允许重建的默认次数。
pub const DEFAULT_EXPIRED_RETRY_LIMIT: u32 = 1;

/// 连接管理器配置。
///
/// # 教案式说明
/// - **契约 (What)**：
///   - `sweep_interval`：后台清扫过期连接的周期，必须大于零；
///   - `expired_retry_limit`：一次投递中因 [`ConnError::Expired`](crate::ConnError::Expired)
///     换新连接的最大次数，耗尽后返回
///     [`EndpointError::ExpiredRetriesExhausted`](crate::EndpointError::ExpiredRetriesExhausted)；
///     取 0 表示不重建。
/// - **风险 (Trade-offs)**：过短的清扫周期会频繁争用缓存分片；过大的重试上限在连接持续
///   过期时会放大对目的地的建连压力。
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    #[serde(rename = "sweep_interval_ms", with = "millis")]
    pub sweep_interval: Duration,
    pub expired_retry_limit: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            expired_retry_limit: DEFAULT_EXPIRED_RETRY_LIMIT,
        }
    }
}

impl ManagerConfig {
    /// 从 TOML 文本加载并校验。
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    #[must_use]
    pub fn with_expired_retry_limit(mut self, limit: u32) -> Self {
        self.expired_retry_limit = limit;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
