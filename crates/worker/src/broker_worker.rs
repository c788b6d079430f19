use std::sync::Arc;
use std::time::Duration;

use ingest_core::{IngestError, IngestResult, QueuedTask, TaskHandler, TaskQueue, TaskSubmitter};
use ingest_dispatcher::{best_effort, BestEffort, FailurePolicy};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Semaphore;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Broker Worker配置
#[derive(Debug, Clone)]
pub struct BrokerWorkerConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub max_concurrent_tasks: usize,
}

impl Default for BrokerWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            batch_size: 8,
            max_concurrent_tasks: 4,
        }
    }
}

/// Broker模式下的远程Worker
///
/// 从消息代理拉取任务并交给处理器执行，处理器扇出的任务经 `submitter` 回到调度器。
/// 每个投递只执行一次：无论成败都会确认，失败由 [`FailurePolicy`] 记录。
pub struct BrokerWorker {
    queue: Arc<dyn TaskQueue>,
    handler: Arc<dyn TaskHandler>,
    submitter: Arc<dyn TaskSubmitter>,
    failure_policy: Arc<dyn FailurePolicy>,
    config: BrokerWorkerConfig,
    permits: Arc<Semaphore>,
}

impl BrokerWorker {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        handler: Arc<dyn TaskHandler>,
        submitter: Arc<dyn TaskSubmitter>,
        config: BrokerWorkerConfig,
    ) -> Self {
        let max_concurrent = config.max_concurrent_tasks.max(1);
        Self {
            queue,
            handler,
            submitter,
            failure_policy: Arc::new(BestEffort),
            config,
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    pub fn with_failure_policy(mut self, policy: Arc<dyn FailurePolicy>) -> Self {
        self.failure_policy = policy;
        self
    }

    /// 运行拉取循环，直到收到停止信号或代理连接丢失，然后等待进行中的任务完成
    pub async fn run(
        &self,
        mut shutdown: broadcast::Receiver<()>,
        mut broker_lost: broadcast::Receiver<()>,
    ) {
        info!(
            backend = self.queue.backend_name(),
            "Broker Worker启动，最大并发 {}，拉取间隔 {:?}",
            self.max_concurrent(),
            self.config.poll_interval
        );

        let mut poll_interval = interval(self.config.poll_interval);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut lost_open = true;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Broker Worker收到停止信号");
                    break;
                }
                result = broker_lost.recv(), if lost_open => match result {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        warn!("消息代理连接丢失，Broker Worker停止拉取任务");
                        break;
                    }
                    Err(RecvError::Closed) => lost_open = false,
                },
                _ = poll_interval.tick() => {
                    match self.poll_once().await {
                        Ok(0) => {}
                        Ok(count) => debug!("本轮拉取 {} 个任务", count),
                        Err(e) => error!("拉取任务失败: {}", e),
                    }
                }
            }
        }

        self.drain().await;
        info!("Broker Worker已停止");
    }

    /// 拉取一批任务并启动执行，返回启动的任务数
    pub async fn poll_once(&self) -> IngestResult<usize> {
        let capacity = self.permits.available_permits().min(self.config.batch_size);
        if capacity == 0 {
            return Ok(0);
        }

        let deliveries = self.queue.consume_tasks(capacity).await?;
        let count = deliveries.len();
        for delivery in deliveries {
            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|e| IngestError::Internal(format!("并发许可已关闭: {e}")))?;

            let queue = Arc::clone(&self.queue);
            let handler = Arc::clone(&self.handler);
            let submitter = Arc::clone(&self.submitter);
            let policy = Arc::clone(&self.failure_policy);
            tokio::spawn(async move {
                let _permit = permit;
                Self::execute(queue, handler, submitter, policy.as_ref(), delivery).await;
            });
        }
        Ok(count)
    }

    async fn execute(
        queue: Arc<dyn TaskQueue>,
        handler: Arc<dyn TaskHandler>,
        submitter: Arc<dyn TaskSubmitter>,
        policy: &dyn FailurePolicy,
        delivery: QueuedTask,
    ) {
        let QueuedTask { delivery_id, task } = delivery;
        debug!(
            kind = %task.kind(),
            subject = %task.subject(),
            delivery_id = %delivery_id,
            "执行Broker任务"
        );
        metrics::counter!("ingest_broker_tasks_consumed_total", "kind" => task.kind().as_str())
            .increment(1);

        best_effort(&task, policy, handler.handle(&task, submitter)).await;

        if let Err(e) = queue.ack_task(&delivery_id).await {
            warn!(delivery_id = %delivery_id, "确认任务失败: {}", e);
        }
    }

    /// 等待所有进行中的任务释放并发许可
    async fn drain(&self) {
        let max = self.max_concurrent() as u32;
        if self.permits.available_permits() < max as usize {
            info!("等待进行中的Broker任务完成");
        }
        if let Ok(all) = self.permits.acquire_many(max).await {
            drop(all);
        }
    }

    fn max_concurrent(&self) -> usize {
        self.config.max_concurrent_tasks.max(1)
    }
}
