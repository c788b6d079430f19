//! 调度器测试使用的内存Mock实现

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ingest_core::{
    IngestError, IngestResult, QueuedTask, SongIngestOutcome, Task, TaskHandler, TaskOutcome,
    TaskQueue, TaskSubmitter,
};

/// 可控制发布成败与健康状态的消息代理Mock
#[derive(Default)]
pub struct MockTaskQueue {
    pub published: Mutex<Vec<Task>>,
    pub publish_calls: AtomicUsize,
    pub fail_publish: AtomicBool,
    pub unhealthy: AtomicBool,
    pub health_checks: AtomicUsize,
}

impl MockTaskQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let queue = Self::default();
        queue.fail_publish.store(true, Ordering::SeqCst);
        Arc::new(queue)
    }

    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl TaskQueue for MockTaskQueue {
    async fn publish_task(&self, task: &Task) -> IngestResult<String> {
        let call = self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(IngestError::broker("connection refused"));
        }
        self.published.lock().unwrap().push(task.clone());
        Ok(format!("mock-{call}"))
    }

    async fn consume_tasks(&self, _max: usize) -> IngestResult<Vec<QueuedTask>> {
        Ok(vec![])
    }

    async fn ack_task(&self, _delivery_id: &str) -> IngestResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> IngestResult<()> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        if self.unhealthy.load(Ordering::SeqCst) {
            Err(IngestError::broker("PING timed out"))
        } else {
            Ok(())
        }
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// 记录处理过的任务的处理器Mock
#[derive(Default)]
pub struct RecordingHandler {
    pub completed: Mutex<Vec<Task>>,
    pub started: AtomicUsize,
    pub delay: Duration,
    pub failing_subjects: HashSet<String>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn failing_on(subjects: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing_subjects: subjects.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        })
    }

    pub fn completed_subjects(&self) -> Vec<String> {
        self.completed
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.subject().to_string())
            .collect()
    }
}

#[async_trait]
impl TaskHandler for RecordingHandler {
    async fn handle(
        &self,
        task: &Task,
        _submitter: Arc<dyn TaskSubmitter>,
    ) -> IngestResult<TaskOutcome> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing_subjects.contains(task.subject()) {
            return Err(IngestError::recording_not_found(task.subject()));
        }

        self.completed.lock().unwrap().push(task.clone());
        Ok(TaskOutcome::SongIngest(SongIngestOutcome {
            recording_id: task.subject().to_string(),
            success: true,
        }))
    }
}
