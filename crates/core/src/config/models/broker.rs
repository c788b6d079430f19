use serde::{Deserialize, Serialize};

/// 消息代理后端类型，由连接URL的scheme决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerType {
    RedisStream,
    Rabbitmq,
}

/// 消息代理配置
///
/// `url` 缺省时进程从启动起即为Fallback模式，这不是错误。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub url: Option<String>,
    pub queue_name: String,
    pub consumer_group: String,
    pub consumer_name: String,
    pub connection_timeout_seconds: u64,
    pub health_check_interval_seconds: u64,
    pub poll_interval_ms: u64,
    pub block_timeout_ms: u64,
    pub batch_size: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        let consumer_name = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "ingest-worker".to_string());

        Self {
            url: None,
            queue_name: "song_ingest_tasks".to_string(),
            consumer_group: "ingest_workers".to_string(),
            consumer_name,
            connection_timeout_seconds: 5,
            health_check_interval_seconds: 15,
            poll_interval_ms: 500,
            block_timeout_ms: 1000,
            batch_size: 8,
        }
    }
}

impl BrokerConfig {
    /// 是否配置了消息代理
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }

    /// 根据URL scheme判断后端类型
    pub fn broker_type(&self) -> anyhow::Result<Option<BrokerType>> {
        let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Ok(None);
        };

        if url.starts_with("redis://") || url.starts_with("rediss://") {
            Ok(Some(BrokerType::RedisStream))
        } else if url.starts_with("amqp://") || url.starts_with("amqps://") {
            Ok(Some(BrokerType::Rabbitmq))
        } else {
            Err(anyhow::anyhow!(
                "不支持的消息代理URL: {url}，支持的scheme: redis, rediss, amqp, amqps"
            ))
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.broker_type()?;

        if self.queue_name.is_empty() {
            return Err(anyhow::anyhow!("任务队列名称不能为空"));
        }

        if self.consumer_group.is_empty() {
            return Err(anyhow::anyhow!("消费者组名称不能为空"));
        }

        if self.connection_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("连接超时时间必须大于0"));
        }

        if self.health_check_interval_seconds == 0 {
            return Err(anyhow::anyhow!("健康检查间隔必须大于0"));
        }

        if self.batch_size == 0 {
            return Err(anyhow::anyhow!("批量拉取数量必须大于0"));
        }

        Ok(())
    }
}
