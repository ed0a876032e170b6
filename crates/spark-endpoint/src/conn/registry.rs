use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    conn::{ConnError, LocalPublisher, SharedConn, local::LocalFactory},
    descriptor::Endpoint,
    error::EndpointError,
    protocol::Protocol,
};

/// 按协议构建连接的工厂。
///
/// # 教案式说明
/// - **意图 (Why)**：各协议的客户端库（HTTP、Kafka、AMQP……）位于这一接缝之外，
///   本 crate 只负责在需要时调用对应工厂；
/// - **契约 (What)**：
///   - 入参为按值传入的 [`Endpoint`]，其协议必定与注册时的标签一致；
///   - 构建应当廉价且不阻塞：常见做法是只保存目的地参数，首次 `send` 时再建立会话；
///   - 失败时返回 [`ConnError`]，管理器包装为 [`EndpointError::Connect`]。
/// - **风险 (Trade-offs)**：工厂在缓存分片的独占区内被调用，耗时构建会阻塞同分片的其他端点。
pub trait ConnFactory: Send + Sync + 'static {
    fn connect(&self, endpoint: Endpoint) -> Result<SharedConn, ConnError>;
}

impl<F> ConnFactory for F
where
    F: Fn(Endpoint) -> Result<SharedConn, ConnError> + Send + Sync + 'static,
{
    fn connect(&self, endpoint: Endpoint) -> Result<SharedConn, ConnError> {
        self(endpoint)
    }
}

/// 协议标签到连接工厂的分发表。
///
/// - **契约 (What)**：每个协议至多一个工厂，重复注册以后者为准并返回被替换的旧工厂；
///   未注册的协议在分发时得到 [`EndpointError::InvalidProtocol`]。
#[derive(Clone, Default)]
pub struct ConnRegistry {
    factories: HashMap<Protocol, Arc<dyn ConnFactory>>,
}

impl ConnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预先注册 `local` 协议，连接把消息转交给注入的进程内发布器。
    pub fn with_local_publisher(publisher: Arc<dyn LocalPublisher>) -> Self {
        let mut registry = Self::new();
        registry.register(Protocol::Local, LocalFactory::new(publisher));
        registry
    }

    pub fn register(
        &mut self,
        protocol: Protocol,
        factory: impl ConnFactory,
    ) -> Option<Arc<dyn ConnFactory>> {
        self.factories.insert(protocol, Arc::new(factory))
    }

    /// 链式注册，便于装配阶段一次性写完整张表。
    #[must_use]
    pub fn with(mut self, protocol: Protocol, factory: impl ConnFactory) -> Self {
        self.register(protocol, factory);
        self
    }

    pub fn contains(&self, protocol: Protocol) -> bool {
        self.factories.contains_key(&protocol)
    }

    pub fn protocols(&self) -> impl Iterator<Item = Protocol> + '_ {
        self.factories.keys().copied()
    }

    /// 按描述符的协议选择工厂并构建连接。
    pub(crate) fn connect(&self, endpoint: Endpoint) -> Result<SharedConn, EndpointError> {
        let protocol = endpoint.protocol();
        let factory = self
            .factories
            .get(&protocol)
            .ok_or(EndpointError::InvalidProtocol(protocol))?;
        factory
            .connect(endpoint)
            .map_err(|source| EndpointError::Connect { protocol, source })
    }
}

impl fmt::Debug for ConnRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut protocols: Vec<_> = self.protocols().map(Protocol::as_str).collect();
        protocols.sort_unstable();
        f.debug_struct("ConnRegistry")
            .field("protocols", &protocols)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::parse;

    #[test]
    fn unregistered_protocol_is_invalid() {
        let registry = ConnRegistry::new();
        let endpoint = parse("redis://cache:6379/events").expect("合法端点");
        assert!(matches!(
            registry.connect(endpoint),
            Err(EndpointError::InvalidProtocol(Protocol::Redis))
        ));
    }

    #[test]
    fn factory_failure_is_wrapped() {
        let registry = ConnRegistry::new().with(Protocol::Grpc, |_endpoint: Endpoint| {
            Err::<SharedConn, _>(ConnError::Rejected("no route".into()))
        });
        let endpoint = parse("grpc://svc:50051").expect("合法端点");
        match registry.connect(endpoint) {
            Err(EndpointError::Connect { protocol, source }) => {
                assert_eq!(protocol, Protocol::Grpc);
                assert!(matches!(source, ConnError::Rejected(_)));
            }
            Err(other) => panic!("应包装为 Connect 错误: {other:?}"),
            Ok(_) => panic!("工厂失败不应产出连接"),
        }
    }

    #[test]
    fn register_replaces_previous_factory() {
        let mut registry = ConnRegistry::new();
        let reject = |_endpoint: Endpoint| Err::<SharedConn, _>(ConnError::Expired);
        assert!(registry.register(Protocol::Http, reject).is_none());
        assert!(registry.register(Protocol::Http, reject).is_some());
        assert_eq!(registry.protocols().count(), 1);
        assert!(format!("{registry:?}").contains("http"));
    }
}
