use std::future::Future;

use ingest_core::{IngestError, IngestResult, Task, TaskOutcome};
use tracing::{debug, error};

/// 任务失败处理策略
///
/// 失败不会越过调度器边界，由策略决定如何记录和收尾。
/// 默认策略为 [`BestEffort`]，可替换为死信队列等实现而无需改动处理器。
pub trait FailurePolicy: Send + Sync {
    fn on_failure(&self, task: &Task, error: &IngestError);

    fn name(&self) -> &str;
}

/// 尽力而为：记录日志后丢弃任务，不重试
#[derive(Debug, Default, Clone, Copy)]
pub struct BestEffort;

impl FailurePolicy for BestEffort {
    fn on_failure(&self, task: &Task, error: &IngestError) {
        error!(
            kind = %task.kind(),
            subject = %task.subject(),
            submitter_id = %task.submitter_id(),
            "任务执行失败，已丢弃（可重新提交以手动重试）: {}",
            error
        );
        metrics::counter!("ingest_tasks_failed_total", "kind" => task.kind().as_str())
            .increment(1);
    }

    fn name(&self) -> &str {
        "best_effort"
    }
}

/// 执行任务并按策略吞掉失败（捕获、记录、丢弃）
pub async fn best_effort<F>(task: &Task, policy: &dyn FailurePolicy, work: F) -> Option<TaskOutcome>
where
    F: Future<Output = IngestResult<TaskOutcome>>,
{
    match work.await {
        Ok(outcome) => {
            debug!(kind = %task.kind(), subject = %task.subject(), "任务执行完成");
            Some(outcome)
        }
        Err(e) => {
            policy.on_failure(task, &e);
            None
        }
    }
}
