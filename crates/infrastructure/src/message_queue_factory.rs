use std::sync::Arc;

use ingest_core::{
    config::{BrokerConfig, BrokerType},
    ConnectionErrorSender, IngestError, IngestResult, TaskQueue,
};
use tracing::{debug, info};

use crate::{RabbitMQTaskQueue, RedisStreamTaskQueue};

/// 根据配置创建消息代理客户端
pub struct TaskQueueFactory;

impl TaskQueueFactory {
    /// 按URL scheme选择后端并建立连接
    ///
    /// 未配置URL、scheme不受支持或连接失败都返回错误，调用方据此以Fallback模式启动。
    pub async fn create(
        config: &BrokerConfig,
        connection_errors: ConnectionErrorSender,
    ) -> IngestResult<Arc<dyn TaskQueue>> {
        let broker_type = Self::resolve_type(config)?;
        let url = config.url.as_deref().unwrap_or_default();
        debug!("创建消息代理客户端，类型: {:?}", broker_type);

        match broker_type {
            BrokerType::RedisStream => {
                info!("初始化Redis Stream任务队列");
                let queue = RedisStreamTaskQueue::new(url, config).await?;
                Ok(Arc::new(queue))
            }
            BrokerType::Rabbitmq => {
                info!("初始化RabbitMQ任务队列");
                let queue = RabbitMQTaskQueue::new(url, config, connection_errors).await?;
                Ok(Arc::new(queue))
            }
        }
    }

    /// 解析后端类型，不建立连接
    pub fn resolve_type(config: &BrokerConfig) -> IngestResult<BrokerType> {
        match config.broker_type() {
            Ok(Some(broker_type)) => Ok(broker_type),
            Ok(None) => Err(IngestError::config_error("未配置消息代理URL")),
            Err(e) => Err(IngestError::config_error(e.to_string())),
        }
    }

    /// 脱敏后的URL，用于日志
    pub fn redacted_url(config: &BrokerConfig) -> Option<String> {
        let raw = config.url.as_deref()?;
        match url::Url::parse(raw) {
            Ok(mut parsed) => {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                Some(parsed.to_string())
            }
            Err(_) => Some(raw.to_string()),
        }
    }
}
