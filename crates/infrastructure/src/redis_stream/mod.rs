//! Redis Stream任务队列
//!
//! 任务以JSON写入stream的 `task` 字段，消费方通过消费者组读取并确认。

mod stream_operations;

use std::time::Duration;

use async_trait::async_trait;
use ingest_core::{config::BrokerConfig, IngestError, IngestResult, QueuedTask, Task, TaskQueue};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tracing::{debug, info};

pub use stream_operations::{parse_read_reply, TASK_FIELD};

/// Redis Stream任务队列实现
pub struct RedisStreamTaskQueue {
    connection: ConnectionManager,
    stream: String,
    group: String,
    consumer: String,
    block_timeout_ms: u64,
}

impl RedisStreamTaskQueue {
    /// 连接Redis并确保消费者组存在
    pub async fn new(url: &str, config: &BrokerConfig) -> IngestResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| IngestError::broker(format!("创建Redis客户端失败: {e}")))?;

        let connection_timeout = Duration::from_secs(config.connection_timeout_seconds);
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(connection_timeout)
            // 阻塞读取需要比BLOCK更长的响应超时
            .set_response_timeout(
                Duration::from_millis(config.block_timeout_ms) + connection_timeout,
            );

        let connection = tokio::time::timeout(
            connection_timeout,
            client.get_connection_manager_with_config(manager_config),
        )
        .await
        .map_err(|_| IngestError::broker(format!("连接Redis超时（{connection_timeout:?}）")))?
        .map_err(|e| IngestError::broker(format!("连接Redis失败: {e}")))?;

        let queue = Self {
            connection,
            stream: config.queue_name.clone(),
            group: config.consumer_group.clone(),
            consumer: config.consumer_name.clone(),
            block_timeout_ms: config.block_timeout_ms,
        };
        queue.health_check().await?;
        queue.ensure_consumer_group().await?;

        info!(
            "成功连接到Redis，stream: {}，消费者组: {}",
            queue.stream, queue.group
        );
        Ok(queue)
    }

    async fn ensure_consumer_group(&self) -> IngestResult<()> {
        let mut conn = self.connection.clone();
        stream_operations::ensure_consumer_group(&mut conn, &self.stream, &self.group).await
    }
}

#[async_trait]
impl TaskQueue for RedisStreamTaskQueue {
    async fn publish_task(&self, task: &Task) -> IngestResult<String> {
        let payload = task.to_json()?;
        let mut conn = self.connection.clone();

        let entry_id: String = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("*")
            .arg(TASK_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| IngestError::broker(format!("XADD到 {} 失败: {e}", self.stream)))?;

        debug!(stream = %self.stream, entry_id = %entry_id, "任务已写入stream");
        Ok(entry_id)
    }

    async fn consume_tasks(&self, max: usize) -> IngestResult<Vec<QueuedTask>> {
        let mut conn = self.connection.clone();

        let reply: Option<redis::streams::StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer)
            .arg("COUNT")
            .arg(max)
            .arg("BLOCK")
            .arg(self.block_timeout_ms)
            .arg("STREAMS")
            .arg(&self.stream)
            .arg(">")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                IngestError::broker(format!("XREADGROUP读取 {} 失败: {e}", self.stream))
            })?;

        let Some(reply) = reply else {
            return Ok(vec![]);
        };

        let (tasks, malformed) = parse_read_reply(reply);
        // 无法解析的条目直接确认，避免一直停留在待处理列表
        stream_operations::ack_malformed(malformed, move |entry_id| async move {
            self.ack_task(&entry_id).await
        })
        .await;
        Ok(tasks)
    }

    async fn ack_task(&self, delivery_id: &str) -> IngestResult<()> {
        let mut conn = self.connection.clone();
        let acked: i64 = redis::cmd("XACK")
            .arg(&self.stream)
            .arg(&self.group)
            .arg(delivery_id)
            .query_async(&mut conn)
            .await
            .map_err(|e| IngestError::broker(format!("XACK失败: {e}")))?;

        if acked == 0 {
            debug!(entry_id = %delivery_id, "条目已被确认过");
        }
        Ok(())
    }

    async fn health_check(&self) -> IngestResult<()> {
        let mut conn = self.connection.clone();
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| IngestError::broker(format!("Redis PING失败: {e}")))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(IngestError::broker(format!("意外的PING响应: {response}")))
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis_stream"
    }
}
