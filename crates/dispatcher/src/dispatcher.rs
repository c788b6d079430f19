use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ingest_core::{
    ExecutionMode, IngestError, IngestResult, Task, TaskHandler, TaskQueue, TaskSubmitter,
};
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn, Instrument};

use crate::mode::ModeState;
use crate::strategies::{best_effort, BestEffort, FailurePolicy};

/// 任务调度器
///
/// 把“入队”和“立即执行”合并为一次 `submit` 调用：
///
/// 1. Broker模式：任务发布到消息代理，成功即结束
/// 2. 发布失败（包括代理不可达）：切换到Fallback模式，当前任务落到第3步
/// 3. Fallback模式：在本进程内异步执行对应处理器，失败由 [`FailurePolicy`] 记录并丢弃
///
/// 处理器扇出的后续任务同样经由 `submit` 提交，因此总是使用扇出时刻的模式。
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    mode: Arc<ModeState>,
    queue: Option<Arc<dyn TaskQueue>>,
    handler: Arc<dyn TaskHandler>,
    failure_policy: Arc<dyn FailurePolicy>,
    runtime: Handle,
    tracker: TaskTracker,
    lifecycle: Mutex<Lifecycle>,
}

/// 跟踪器的关闭状态
///
/// `wait_idle` 需要临时关闭跟踪器，只有最后一个等待者退出且调度器未关闭时才重新打开。
#[derive(Default)]
struct Lifecycle {
    shut_down: bool,
    idle_waiters: usize,
}

impl Dispatcher {
    pub fn builder(handler: Arc<dyn TaskHandler>) -> DispatcherBuilder {
        DispatcherBuilder::new(handler)
    }

    /// 提交任务，立即返回，从不向调用方报告错误
    pub fn submit(&self, task: Task) {
        let mode = self.inner.mode.current();
        metrics::counter!("ingest_tasks_submitted_total", "mode" => mode.as_str()).increment(1);
        debug!(
            kind = %task.kind(),
            subject = %task.subject(),
            mode = %mode,
            "提交任务"
        );

        match (mode, self.inner.queue.clone()) {
            (ExecutionMode::Broker, Some(queue)) => {
                let this = self.clone();
                self.inner.tracker.spawn_on(
                    async move { this.enqueue_or_run_locally(queue, task).await }
                        .in_current_span(),
                    &self.inner.runtime,
                );
            }
            _ => self.spawn_local(task),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.inner.mode.current()
    }

    pub fn mode_state(&self) -> Arc<ModeState> {
        Arc::clone(&self.inner.mode)
    }

    /// 等待当前所有进程内任务（包括它们扇出的任务）执行完毕
    ///
    /// 可以与 `shutdown` 并发调用，`shutdown` 之后跟踪器保持关闭。
    pub async fn wait_idle(&self) {
        {
            let mut lifecycle = self.lifecycle();
            lifecycle.idle_waiters += 1;
            self.inner.tracker.close();
        }

        self.inner.tracker.wait().await;

        let mut lifecycle = self.lifecycle();
        lifecycle.idle_waiters -= 1;
        if lifecycle.idle_waiters == 0 && !lifecycle.shut_down {
            self.inner.tracker.reopen();
        }
    }

    /// 关闭调度器，在超时时间内等待进程内任务收尾
    ///
    /// 返回 `false` 表示超时时仍有任务未完成。
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        {
            let mut lifecycle = self.lifecycle();
            lifecycle.shut_down = true;
            self.inner.tracker.close();
        }
        let pending = self.inner.tracker.len();
        if pending > 0 {
            info!("等待 {} 个进程内任务完成", pending);
        }

        match tokio::time::timeout(timeout, self.inner.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    "等待进程内任务超时（{:?}），仍有 {} 个任务未完成",
                    timeout,
                    self.inner.tracker.len()
                );
                false
            }
        }
    }

    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn enqueue_or_run_locally(&self, queue: Arc<dyn TaskQueue>, task: Task) {
        match queue.publish_task(&task).await {
            Ok(delivery_id) => {
                debug!(
                    kind = %task.kind(),
                    subject = %task.subject(),
                    delivery_id = %delivery_id,
                    backend = queue.backend_name(),
                    "任务已发布到消息代理"
                );
            }
            Err(e) => {
                metrics::counter!("ingest_broker_enqueue_failures_total").increment(1);
                debug!(
                    kind = %task.kind(),
                    subject = %task.subject(),
                    "发布任务失败，改为进程内执行: {}",
                    e
                );
                self.inner
                    .mode
                    .trip(&format!("{} 发布失败: {e}", queue.backend_name()));
                self.run_locally(task).await;
            }
        }
    }

    fn spawn_local(&self, task: Task) {
        let this = self.clone();
        self.inner
            .tracker
            .spawn_on(
                async move { this.run_locally(task).await }.in_current_span(),
                &self.inner.runtime,
            );
    }

    async fn run_locally(&self, task: Task) {
        let submitter: Arc<dyn TaskSubmitter> = Arc::new(self.clone());
        let handler = Arc::clone(&self.inner.handler);
        best_effort(
            &task,
            self.inner.failure_policy.as_ref(),
            handler.handle(&task, submitter),
        )
        .await;
    }
}

impl TaskSubmitter for Dispatcher {
    fn submit(&self, task: Task) {
        Dispatcher::submit(self, task)
    }

    fn mode(&self) -> ExecutionMode {
        Dispatcher::mode(self)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("mode", &self.inner.mode.current())
            .field(
                "backend",
                &self.inner.queue.as_ref().map(|q| q.backend_name()),
            )
            .field("failure_policy", &self.inner.failure_policy.name())
            .finish()
    }
}

/// 调度器构建器
pub struct DispatcherBuilder {
    handler: Arc<dyn TaskHandler>,
    mode: Option<Arc<ModeState>>,
    queue: Option<Arc<dyn TaskQueue>>,
    failure_policy: Arc<dyn FailurePolicy>,
    runtime: Option<Handle>,
}

impl DispatcherBuilder {
    pub fn new(handler: Arc<dyn TaskHandler>) -> Self {
        Self {
            handler,
            mode: None,
            queue: None,
            failure_policy: Arc::new(BestEffort),
            runtime: None,
        }
    }

    /// 共享的执行模式状态，未设置时根据是否提供消息代理决定初始模式
    pub fn mode(mut self, mode: Arc<ModeState>) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn queue(mut self, queue: Arc<dyn TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn failure_policy(mut self, policy: Arc<dyn FailurePolicy>) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> IngestResult<Dispatcher> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| {
                IngestError::Internal(format!("创建调度器需要Tokio运行时: {e}"))
            })?,
        };

        let mode = self.mode.unwrap_or_else(|| {
            let initial = if self.queue.is_some() {
                ExecutionMode::Broker
            } else {
                ExecutionMode::Fallback
            };
            Arc::new(ModeState::new(initial))
        });

        if mode.current() == ExecutionMode::Broker && self.queue.is_none() {
            return Err(IngestError::config_error("Broker模式需要提供消息代理客户端"));
        }

        info!(
            "调度器已创建，初始模式: {}，失败策略: {}",
            mode.current(),
            self.failure_policy.name()
        );

        Ok(Dispatcher {
            inner: Arc::new(DispatcherInner {
                mode,
                queue: self.queue,
                handler: self.handler,
                failure_policy: self.failure_policy,
                runtime,
                tracker: TaskTracker::new(),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        })
    }
}
