use async_trait::async_trait;
use ingest_core::{
    config::BrokerConfig, ConnectionErrorSender, IngestError, IngestResult, QueuedTask, Task,
    TaskQueue,
};
use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// RabbitMQ任务队列实现
///
/// 投递ID即RabbitMQ的delivery tag，确认时按tag执行 `basic_ack`。
pub struct RabbitMQTaskQueue {
    connection: Connection,
    channel: Channel,
    queue_name: String,
}

impl RabbitMQTaskQueue {
    /// 连接RabbitMQ并声明持久化任务队列
    ///
    /// 连接错误通过 `on_error` 回调转发到 `connection_errors`，由连接监视器处理。
    pub async fn new(
        url: &str,
        config: &BrokerConfig,
        connection_errors: ConnectionErrorSender,
    ) -> IngestResult<Self> {
        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let connection = tokio::time::timeout(
            timeout,
            Connection::connect(url, ConnectionProperties::default()),
        )
        .await
        .map_err(|_| IngestError::broker(format!("连接RabbitMQ超时（{timeout:?}）")))?
        .map_err(|e| IngestError::broker(format!("连接RabbitMQ失败: {e}")))?;

        connection.on_error(move |err| {
            // 接收端已关闭说明监视器已退出
            let _ = connection_errors.send(format!("RabbitMQ连接错误: {err}"));
        });

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| IngestError::broker(format!("创建通道失败: {e}")))?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| IngestError::broker(format!("开启发布确认失败: {e}")))?;

        channel
            .queue_declare(
                &config.queue_name,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                IngestError::broker(format!("声明队列 {} 失败: {e}", config.queue_name))
            })?;

        info!("成功连接到RabbitMQ，任务队列: {}", config.queue_name);

        Ok(Self {
            connection,
            channel,
            queue_name: config.queue_name.clone(),
        })
    }
}

#[async_trait]
impl TaskQueue for RabbitMQTaskQueue {
    async fn publish_task(&self, task: &Task) -> IngestResult<String> {
        let payload = serde_json::to_vec(task)?;

        let confirm = self
            .channel
            .basic_publish(
                "",
                &self.queue_name,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_delivery_mode(2)
                    .with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| {
                IngestError::broker(format!("发布任务到队列 {} 失败: {e}", self.queue_name))
            })?;

        let confirmation = confirm
            .await
            .map_err(|e| IngestError::broker(format!("任务发布确认失败: {e}")))?;
        if confirmation.is_nack() {
            return Err(IngestError::broker("RabbitMQ拒绝了发布的任务"));
        }

        debug!("任务已发布到队列: {}", self.queue_name);
        // 发布端拿不到delivery tag，用任务主体标识
        Ok(format!("{}:{}", task.kind(), task.subject()))
    }

    async fn consume_tasks(&self, max: usize) -> IngestResult<Vec<QueuedTask>> {
        let mut tasks = Vec::new();

        while tasks.len() < max {
            let message = self
                .channel
                .basic_get(&self.queue_name, BasicGetOptions { no_ack: false })
                .await
                .map_err(|e| {
                    IngestError::broker(format!("从队列 {} 获取任务失败: {e}", self.queue_name))
                })?;

            let Some(message) = message else {
                break;
            };

            let delivery_tag = message.delivery.delivery_tag;
            match serde_json::from_slice::<Task>(&message.delivery.data) {
                Ok(task) => tasks.push(QueuedTask {
                    delivery_id: delivery_tag.to_string(),
                    task,
                }),
                Err(e) => {
                    // 无法解析的消息直接确认丢弃，避免反复投递
                    warn!(delivery_tag, "丢弃无法解析的任务消息: {}", e);
                    if let Err(e) = self.ack_task(&delivery_tag.to_string()).await {
                        warn!(delivery_tag, "确认无法解析的任务消息失败: {}", e);
                    }
                }
            }
        }

        Ok(tasks)
    }

    async fn ack_task(&self, delivery_id: &str) -> IngestResult<()> {
        let delivery_tag: u64 = delivery_id
            .parse()
            .map_err(|_| IngestError::Internal(format!("无效的delivery tag: {delivery_id}")))?;

        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| IngestError::broker(format!("确认任务失败: {e}")))?;

        debug!(delivery_tag, "任务已确认");
        Ok(())
    }

    async fn health_check(&self) -> IngestResult<()> {
        if !self.connection.status().connected() {
            return Err(IngestError::broker("RabbitMQ连接已断开"));
        }
        if !self.channel.status().connected() {
            return Err(IngestError::broker("RabbitMQ通道已关闭"));
        }
        Ok(())
    }

    async fn close(&self) -> IngestResult<()> {
        self.connection
            .close(200, "正常关闭")
            .await
            .map_err(|e| IngestError::broker(format!("关闭连接失败: {e}")))?;

        info!("RabbitMQ连接已关闭");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "rabbitmq"
    }
}
