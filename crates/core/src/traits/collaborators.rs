use async_trait::async_trait;

use crate::{
    models::{
        Arrangement, ArrangementDraft, NewWork, RecordingDetails, RecordingSummary, Work,
    },
    IngestResult,
};

/// 元数据查询协作方
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// 按艺人名搜索录音，最多返回 `limit` 条
    async fn search_by_artist(
        &self,
        artist_name: &str,
        limit: usize,
    ) -> IngestResult<Vec<RecordingSummary>>;

    /// 按录音ID获取详情，未找到时返回 `None`
    async fn get_details_by_id(&self, recording_id: &str)
        -> IngestResult<Option<RecordingDetails>>;
}

/// 编曲生成协作方
#[async_trait]
pub trait ArrangementGenerator: Send + Sync {
    async fn generate(&self, recording_id: &str) -> IngestResult<ArrangementDraft>;
}

/// 作品与编曲的持久化协作方
///
/// 作品按 `external_id` 去重，编曲版本在同一作品下单调递增，均由实现方保证。
#[async_trait]
pub trait WorkRepository: Send + Sync {
    async fn create_or_find_work(&self, work: &NewWork) -> IngestResult<Work>;

    async fn append_arrangement(
        &self,
        work_id: i64,
        submitter_id: &str,
        draft: &ArrangementDraft,
    ) -> IngestResult<Arrangement>;
}
