use std::sync::Arc;
use std::time::Duration;

use ingest_core::{ConnectionErrorReceiver, TaskQueue};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::mode::ModeState;

/// 连接监视器配置
#[derive(Debug, Clone)]
pub struct ConnectionMonitorConfig {
    /// 健康检查间隔
    pub health_check_interval: Duration,
    /// 单次健康检查超时
    pub health_check_timeout: Duration,
}

impl Default for ConnectionMonitorConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(15),
            health_check_timeout: Duration::from_secs(5),
        }
    }
}

/// 消息代理连接监视器
///
/// 监听适配器上报的连接错误事件，并定期探测代理健康状态。
/// 第一次发现连接丢失时把执行模式切换到Fallback，通知Worker停止消费，然后退出。
/// 模式切换不可逆，因此监视器的工作到此结束。
pub struct BrokerConnectionMonitor {
    mode: Arc<ModeState>,
    queue: Arc<dyn TaskQueue>,
    events: ConnectionErrorReceiver,
    config: ConnectionMonitorConfig,
    broker_lost: broadcast::Sender<()>,
}

impl BrokerConnectionMonitor {
    pub fn new(
        mode: Arc<ModeState>,
        queue: Arc<dyn TaskQueue>,
        events: ConnectionErrorReceiver,
        config: ConnectionMonitorConfig,
    ) -> Self {
        let (broker_lost, _) = broadcast::channel(1);
        Self {
            mode,
            queue,
            events,
            config,
            broker_lost,
        }
    }

    /// 订阅“代理连接丢失”通知，Worker据此停止拉取任务
    pub fn subscribe_broker_lost(&self) -> broadcast::Receiver<()> {
        self.broker_lost.subscribe()
    }

    /// 在后台运行监视循环
    pub fn start(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        if self.mode.is_fallback() {
            debug!("已处于Fallback模式，无需监视消息代理连接");
            self.notify_broker_lost();
            return;
        }

        info!(
            backend = self.queue.backend_name(),
            "启动消息代理连接监视，健康检查间隔 {:?}", self.config.health_check_interval
        );

        let mut ticker = tokio::time::interval(self.config.health_check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次tick立即完成，跳过
        ticker.tick().await;

        let mut events_open = true;
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("收到停止信号，退出消息代理连接监视");
                    return;
                }
                event = self.events.recv(), if events_open => match event {
                    Some(reason) => {
                        self.connection_lost(&format!("连接错误事件: {reason}"));
                        return;
                    }
                    None => {
                        debug!("连接错误事件通道已关闭，仅依靠健康检查");
                        events_open = false;
                    }
                },
                _ = ticker.tick() => {
                    if self.mode.is_fallback() {
                        debug!("调度器已切换到Fallback模式，停止连接监视");
                        self.notify_broker_lost();
                        return;
                    }
                    if let Err(reason) = self.check_health().await {
                        self.connection_lost(&reason);
                        return;
                    }
                }
            }
        }
    }

    async fn check_health(&self) -> Result<(), String> {
        match tokio::time::timeout(self.config.health_check_timeout, self.queue.health_check()).await {
            Ok(Ok(())) => {
                debug!(backend = self.queue.backend_name(), "消息代理健康检查通过");
                Ok(())
            }
            Ok(Err(e)) => Err(format!("健康检查失败: {e}")),
            Err(_) => Err(format!(
                "健康检查超时（{:?}）",
                self.config.health_check_timeout
            )),
        }
    }

    fn connection_lost(&self, reason: &str) {
        if !self.mode.trip(reason) {
            debug!(reason = %reason, "模式已由其他组件切换");
        }
        self.notify_broker_lost();
    }

    fn notify_broker_lost(&self) {
        // 没有订阅者时发送失败，可以忽略
        let _ = self.broker_lost.send(());
    }
}
