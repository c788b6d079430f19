use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 按艺人搜索得到的录音摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_ms: Option<u64>,
}

impl RecordingSummary {
    /// 录音ID非空才可用于后续采集
    pub fn has_usable_id(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

/// 单个录音的完整元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDetails {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_sec: Option<u64>,
}

/// 创建作品所需字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWork {
    pub title: String,
    pub artist: String,
    pub external_id: String,
}

/// 规范作品记录，每个外部录音ID对应一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub external_id: String,
    pub created_at: DateTime<Utc>,
}

/// 编曲段落
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangementSection {
    pub name: String,
    #[serde(default)]
    pub bars: Option<u32>,
    #[serde(default)]
    pub chords: Vec<String>,
}

/// 生成服务返回的结构化编曲
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangementDraft {
    pub sections: Vec<ArrangementSection>,
    pub key: Option<String>,
    pub bpm: Option<f64>,
}

/// 作品下的某一版本编曲
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrangement {
    pub id: i64,
    pub work_id: i64,
    pub version: i64,
    pub submitter_id: String,
    pub sections: Vec<ArrangementSection>,
    pub key: Option<String>,
    pub bpm: Option<f64>,
    pub created_at: DateTime<Utc>,
}
