use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    models::{ExecutionMode, Task, TaskOutcome},
    IngestResult,
};

/// 任务提交入口
///
/// `submit` 立即返回，从不向调用方报告错误。
pub trait TaskSubmitter: Send + Sync {
    fn submit(&self, task: Task);

    /// 当前执行模式
    fn mode(&self) -> ExecutionMode;
}

/// 任务处理器
///
/// 扇出产生的后续任务必须通过 `submitter` 重新提交，
/// 这样后续任务会使用扇出时刻的执行模式。
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(
        &self,
        task: &Task,
        submitter: Arc<dyn TaskSubmitter>,
    ) -> IngestResult<TaskOutcome>;
}
