use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ingest_pipeline::{AppConfig, IngestPipeline, Task};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// 应用运行模式
#[derive(Debug, Clone)]
pub enum AppMode {
    /// 作为Broker Worker持续运行
    Worker,
    /// 提交一个任务，等待本进程内的任务执行完后退出
    Submit(Task),
}

/// 主应用程序
pub struct Application {
    pipeline: Arc<IngestPipeline>,
    mode: AppMode,
    drain_timeout: Duration,
}

impl Application {
    pub async fn new(config: AppConfig, mode: AppMode, drain_timeout: Duration) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);
        let pipeline = IngestPipeline::from_config(&config).await?;

        Ok(Self {
            pipeline: Arc::new(pipeline),
            mode,
            drain_timeout,
        })
    }

    /// 运行应用，返回时所有组件已停止
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        match &self.mode {
            AppMode::Worker => {
                let result = self.pipeline.run_worker(shutdown_rx).await;
                self.pipeline.shutdown(self.drain_timeout).await;
                result
            }
            AppMode::Submit(task) => {
                info!(
                    kind = %task.kind(),
                    subject = %task.subject(),
                    mode = %self.pipeline.mode(),
                    "提交任务"
                );
                self.pipeline.submit(task.clone());

                tokio::select! {
                    drained = self.pipeline.shutdown(self.drain_timeout) => {
                        if drained {
                            info!("所有进程内任务已完成");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        warn!("收到关闭信号，未完成的进程内任务将被放弃");
                    }
                }
                Ok(())
            }
        }
    }
}
