use serde::{Deserialize, Serialize};

/// 艺人采集的汇总结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistIngestSummary {
    pub artist_name: String,
    pub queued_count: usize,
}

/// 单曲采集结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongIngestOutcome {
    pub recording_id: String,
    pub success: bool,
}

/// 任务处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutcome {
    ArtistIngest(ArtistIngestSummary),
    SongIngest(SongIngestOutcome),
}
