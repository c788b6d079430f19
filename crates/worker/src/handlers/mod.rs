use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ingest_core::{
    ArrangementGenerator, IngestResult, MetadataLookup, Task, TaskHandler, TaskOutcome,
    TaskPayload, TaskSubmitter, WorkRepository,
};

mod artist_ingest;
mod song_ingest;

/// 处理器参数
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// 按艺人搜索录音的数量上限
    pub artist_search_limit: usize,
    /// Fallback模式下相邻两次扇出提交之间的间隔
    pub fallback_fanout_delay: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            artist_search_limit: 10,
            fallback_fanout_delay: Duration::from_secs(1),
        }
    }
}

/// 采集任务处理器
///
/// 按任务类型分发到艺人采集或单曲采集。两种执行模式共用同一份处理器。
pub struct IngestHandlers {
    metadata: Arc<dyn MetadataLookup>,
    generator: Arc<dyn ArrangementGenerator>,
    repository: Arc<dyn WorkRepository>,
    config: HandlerConfig,
}

impl IngestHandlers {
    pub fn new(
        metadata: Arc<dyn MetadataLookup>,
        generator: Arc<dyn ArrangementGenerator>,
        repository: Arc<dyn WorkRepository>,
        config: HandlerConfig,
    ) -> Self {
        Self {
            metadata,
            generator,
            repository,
            config,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }
}

#[async_trait]
impl TaskHandler for IngestHandlers {
    async fn handle(
        &self,
        task: &Task,
        submitter: Arc<dyn TaskSubmitter>,
    ) -> IngestResult<TaskOutcome> {
        match task.payload() {
            TaskPayload::ArtistIngest { artist_name } => self
                .handle_artist_ingest(artist_name, task.submitter_id(), submitter.as_ref())
                .await
                .map(TaskOutcome::ArtistIngest),
            TaskPayload::SongIngest { recording_id } => self
                .handle_song_ingest(recording_id, task.submitter_id())
                .await
                .map(TaskOutcome::SongIngest),
        }
    }
}
