use ingest_core::{IngestError, IngestResult, NewWork, SongIngestOutcome};
use tracing::{error, info};

use super::IngestHandlers;

impl IngestHandlers {
    /// 采集单个录音：查询元数据、创建或复用作品、生成编曲并追加一个新版本
    pub async fn handle_song_ingest(
        &self,
        recording_id: &str,
        submitter_id: &str,
    ) -> IngestResult<SongIngestOutcome> {
        self.ingest_song(recording_id, submitter_id)
            .await
            .inspect_err(|e| error!(recording_id = %recording_id, "单曲采集失败: {}", e))
    }

    async fn ingest_song(
        &self,
        recording_id: &str,
        submitter_id: &str,
    ) -> IngestResult<SongIngestOutcome> {
        let details = self
            .metadata
            .get_details_by_id(recording_id)
            .await?
            .ok_or_else(|| IngestError::recording_not_found(recording_id))?;

        let work = self
            .repository
            .create_or_find_work(&NewWork {
                title: details.title,
                artist: details.artist,
                external_id: recording_id.to_string(),
            })
            .await?;

        let draft = self.generator.generate(recording_id).await?;
        let arrangement = self
            .repository
            .append_arrangement(work.id, submitter_id, &draft)
            .await?;

        info!(
            recording_id = %recording_id,
            work_id = work.id,
            version = arrangement.version,
            "单曲采集完成"
        );

        Ok(SongIngestOutcome {
            recording_id: recording_id.to_string(),
            success: true,
        })
    }
}
