use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    models::{QueuedTask, Task},
    IngestResult,
};

/// 消息代理客户端抽象接口
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// 发布任务，返回Broker分配的投递ID
    async fn publish_task(&self, task: &Task) -> IngestResult<String>;

    /// 拉取最多 `max` 个待处理任务
    async fn consume_tasks(&self, max: usize) -> IngestResult<Vec<QueuedTask>>;

    /// 确认任务已处理（无论成功失败，只投递一次）
    async fn ack_task(&self, delivery_id: &str) -> IngestResult<()>;

    /// 连接健康检查
    async fn health_check(&self) -> IngestResult<()>;

    /// 关闭连接，进程退出前调用
    async fn close(&self) -> IngestResult<()> {
        Ok(())
    }

    /// 后端名称，用于日志
    fn backend_name(&self) -> &'static str;
}

/// 连接错误事件发送端，由Broker适配器持有（例如RabbitMQ连接的 `on_error` 回调）
pub type ConnectionErrorSender = mpsc::UnboundedSender<String>;

/// 连接错误事件接收端，由连接监视器持有
pub type ConnectionErrorReceiver = mpsc::UnboundedReceiver<String>;

/// 创建连接错误事件通道
pub fn connection_error_channel() -> (ConnectionErrorSender, ConnectionErrorReceiver) {
    mpsc::unbounded_channel()
}
