use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use ingest_core::{
    config::AppConfig, connection_error_channel, ArrangementGenerator, ConnectionErrorReceiver,
    ExecutionMode, MetadataLookup, Task, TaskQueue, WorkRepository,
};
use ingest_dispatcher::{BrokerConnectionMonitor, ConnectionMonitorConfig, Dispatcher, ModeState};
use ingest_infrastructure::{
    DatabaseManager, HttpArrangementClient, MusicBrainzClient, SqliteWorkRepository,
    TaskQueueFactory,
};
use ingest_worker::{BrokerWorker, BrokerWorkerConfig, HandlerConfig, IngestHandlers};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 处理器依赖的外部协作方
#[derive(Clone)]
pub struct Collaborators {
    pub metadata: Arc<dyn MetadataLookup>,
    pub generator: Arc<dyn ArrangementGenerator>,
    pub repository: Arc<dyn WorkRepository>,
}

/// 已建立连接的消息代理及其连接错误事件
pub struct BrokerConnection {
    pub queue: Arc<dyn TaskQueue>,
    pub events: ConnectionErrorReceiver,
}

/// 采集管道
///
/// 应用其他部分只通过 [`IngestPipeline::submit`] 提交任务，不关心任务在哪里执行。
///
/// ```rust,no_run
/// # async fn example(config: ingest_core::config::AppConfig) -> anyhow::Result<()> {
/// use ingest_pipeline::{IngestPipeline, Task};
///
/// let pipeline = IngestPipeline::from_config(&config).await?;
/// pipeline.submit(Task::artist_ingest("Test Artist", "user-1"));
/// # Ok(())
/// # }
/// ```
pub struct IngestPipeline {
    dispatcher: Dispatcher,
    handlers: Arc<IngestHandlers>,
    queue: Option<Arc<dyn TaskQueue>>,
    worker_config: BrokerWorkerConfig,
    broker_lost: Mutex<Option<broadcast::Receiver<()>>>,
    monitor_shutdown: broadcast::Sender<()>,
    monitor_handle: Mutex<Option<JoinHandle<()>>>,
}

impl IngestPipeline {
    /// 根据配置创建全部具体适配器（MusicBrainz、编曲服务、SQLite）并组装管道
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let metadata = MusicBrainzClient::new(&config.metadata).context("创建元数据客户端失败")?;
        let generator =
            HttpArrangementClient::new(&config.generation).context("创建编曲服务客户端失败")?;

        let database = DatabaseManager::new(&config.database).await?;
        database.migrate().await?;
        let repository = SqliteWorkRepository::new(database.pool().clone());

        Self::build(
            config,
            Collaborators {
                metadata: Arc::new(metadata),
                generator: Arc::new(generator),
                repository: Arc::new(repository),
            },
        )
        .await
    }

    /// 组装管道，配置了消息代理时尝试连接
    ///
    /// 未配置代理或启动时连接失败都不是错误：进程从启动起即使用Fallback模式。
    pub async fn build(config: &AppConfig, collaborators: Collaborators) -> Result<Self> {
        let broker = if config.broker.is_configured() {
            let (errors_tx, errors_rx) = connection_error_channel();
            match TaskQueueFactory::create(&config.broker, errors_tx).await {
                Ok(queue) => {
                    info!(
                        url = TaskQueueFactory::redacted_url(&config.broker).as_deref(),
                        backend = queue.backend_name(),
                        "已连接消息代理"
                    );
                    Some(BrokerConnection {
                        queue,
                        events: errors_rx,
                    })
                }
                Err(e) => {
                    warn!("连接消息代理失败，从启动起使用进程内Fallback模式: {}", e);
                    None
                }
            }
        } else {
            info!("未配置消息代理，使用进程内Fallback模式");
            None
        };

        Self::assemble(config, collaborators, broker)
    }

    /// 使用给定的消息代理组装管道
    pub fn with_broker(
        config: &AppConfig,
        collaborators: Collaborators,
        broker: BrokerConnection,
    ) -> Result<Self> {
        Self::assemble(config, collaborators, Some(broker))
    }

    /// 不使用消息代理，所有任务在本进程内执行
    pub fn fallback_only(config: &AppConfig, collaborators: Collaborators) -> Result<Self> {
        Self::assemble(config, collaborators, None)
    }

    fn assemble(
        config: &AppConfig,
        collaborators: Collaborators,
        broker: Option<BrokerConnection>,
    ) -> Result<Self> {
        let handlers = Arc::new(IngestHandlers::new(
            collaborators.metadata,
            collaborators.generator,
            collaborators.repository,
            HandlerConfig {
                artist_search_limit: config.ingest.artist_search_limit,
                fallback_fanout_delay: config.ingest.fallback_fanout_delay(),
            },
        ));

        let initial = if broker.is_some() {
            ExecutionMode::Broker
        } else {
            ExecutionMode::Fallback
        };
        let mode = Arc::new(ModeState::new(initial));

        let mut builder = Dispatcher::builder(handlers.clone()).mode(Arc::clone(&mode));
        if let Some(broker) = &broker {
            builder = builder.queue(Arc::clone(&broker.queue));
        }
        let dispatcher = builder.build().context("创建调度器失败")?;

        let (monitor_shutdown, _) = broadcast::channel(1);
        let mut broker_lost = None;
        let mut monitor_handle = None;
        let mut queue = None;

        if let Some(BrokerConnection {
            queue: broker_queue,
            events,
        }) = broker
        {
            let monitor = BrokerConnectionMonitor::new(
                mode,
                Arc::clone(&broker_queue),
                events,
                ConnectionMonitorConfig {
                    health_check_interval: Duration::from_secs(
                        config.broker.health_check_interval_seconds,
                    ),
                    health_check_timeout: Duration::from_secs(config.broker.connection_timeout_seconds),
                },
            );
            broker_lost = Some(monitor.subscribe_broker_lost());
            monitor_handle = Some(monitor.start(monitor_shutdown.subscribe()));
            queue = Some(broker_queue);
        }

        info!("采集管道已就绪，执行模式: {}", dispatcher.mode());

        Ok(Self {
            dispatcher,
            handlers,
            queue,
            worker_config: BrokerWorkerConfig {
                poll_interval: Duration::from_millis(config.broker.poll_interval_ms),
                batch_size: config.broker.batch_size,
                max_concurrent_tasks: config.worker.max_concurrent_tasks,
            },
            broker_lost: Mutex::new(broker_lost),
            monitor_shutdown,
            monitor_handle: Mutex::new(monitor_handle),
        })
    }

    /// 提交任务，立即返回
    pub fn submit(&self, task: Task) {
        self.dispatcher.submit(task);
    }

    pub fn mode(&self) -> ExecutionMode {
        self.dispatcher.mode()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// 等待本进程内的任务（及其扇出任务）全部完成
    pub async fn wait_idle(&self) {
        self.dispatcher.wait_idle().await;
    }

    /// 作为Broker Worker运行，直到收到停止信号或代理连接丢失
    pub async fn run_worker(&self, shutdown: broadcast::Receiver<()>) -> Result<()> {
        let queue = match (&self.queue, self.mode()) {
            (Some(queue), ExecutionMode::Broker) => Arc::clone(queue),
            _ => return Err(anyhow!("消息代理不可用，无法以Worker角色运行")),
        };

        let broker_lost = self
            .broker_lost
            .lock()
            .map_err(|_| anyhow!("Worker状态锁已损坏"))?
            .take()
            .ok_or_else(|| anyhow!("Worker已经在运行"))?;

        let worker = BrokerWorker::new(
            queue,
            self.handlers.clone(),
            Arc::new(self.dispatcher.clone()),
            self.worker_config.clone(),
        );
        worker.run(shutdown, broker_lost).await;
        Ok(())
    }

    /// 停止连接监视，在超时时间内等待进程内任务完成，然后关闭消息代理连接
    ///
    /// 返回 `false` 表示超时时仍有任务未完成。
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let _ = self.monitor_shutdown.send(());
        let handle = self
            .monitor_handle
            .lock()
            .ok()
            .and_then(|mut handle| handle.take());
        if let Some(handle) = handle {
            if tokio::time::timeout(timeout, handle).await.is_err() {
                warn!("等待连接监视器退出超时");
            }
        }

        let drained = self.dispatcher.shutdown(timeout).await;

        if let Some(queue) = &self.queue {
            if let Err(e) = queue.close().await {
                warn!(backend = queue.backend_name(), "关闭消息代理连接失败: {}", e);
            }
        }

        drained
    }
}
