use ingest_core::{ArtistIngestSummary, ExecutionMode, IngestResult, Task, TaskSubmitter};
use tracing::{error, info};

use super::IngestHandlers;

impl IngestHandlers {
    /// 查询艺人的录音，并为每个录音提交一个单曲采集任务
    ///
    /// 扇出任务总是经由 `submitter` 提交，由调度器决定去向。
    /// Fallback模式下每次提交之间间隔 `fallback_fanout_delay`，
    /// 对外部元数据服务限流；Broker模式下由Worker自身节奏决定，不做延迟。
    pub async fn handle_artist_ingest(
        &self,
        artist_name: &str,
        submitter_id: &str,
        submitter: &dyn TaskSubmitter,
    ) -> IngestResult<ArtistIngestSummary> {
        info!(artist = %artist_name, "开始艺人采集");

        let recordings = self
            .metadata
            .search_by_artist(artist_name, self.config.artist_search_limit)
            .await
            .inspect_err(|e| error!(artist = %artist_name, "艺人录音搜索失败: {}", e))?;

        let mut queued_count = 0;
        for recording in recordings.iter().filter(|r| r.has_usable_id()) {
            if queued_count > 0 && submitter.mode() == ExecutionMode::Fallback {
                tokio::time::sleep(self.config.fallback_fanout_delay).await;
            }
            submitter.submit(Task::song_ingest(recording.id.clone(), submitter_id));
            queued_count += 1;
        }

        let skipped = recordings.len() - queued_count;
        if skipped > 0 {
            info!(artist = %artist_name, "跳过 {} 个没有录音ID的结果", skipped);
        }
        info!(
            artist = %artist_name,
            "艺人采集完成，已提交 {} 个单曲采集任务", queued_count
        );

        Ok(ArtistIngestSummary {
            artist_name: artist_name.to_string(),
            queued_count,
        })
    }
}
