use serde::{Deserialize, Serialize};

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    ArtistIngest,
    SongIngest,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ArtistIngest => "artist_ingest",
            TaskKind::SongIngest => "song_ingest",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任务负载，按任务类型区分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    ArtistIngest { artist_name: String },
    SongIngest { recording_id: String },
}

/// 采集任务
///
/// 构造后不可变；任务本身不携带ID，进入Broker时由Broker分配投递ID。
///
/// # 使用示例
///
/// ```rust
/// use ingest_core::models::{Task, TaskKind};
///
/// let task = Task::artist_ingest("Test Artist", "user-1");
/// assert_eq!(task.kind(), TaskKind::ArtistIngest);
/// assert_eq!(task.subject(), "Test Artist");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(flatten)]
    payload: TaskPayload,
    submitter_id: String,
}

impl Task {
    pub fn artist_ingest(artist_name: impl Into<String>, submitter_id: impl Into<String>) -> Self {
        Self {
            payload: TaskPayload::ArtistIngest {
                artist_name: artist_name.into(),
            },
            submitter_id: submitter_id.into(),
        }
    }

    pub fn song_ingest(recording_id: impl Into<String>, submitter_id: impl Into<String>) -> Self {
        Self {
            payload: TaskPayload::SongIngest {
                recording_id: recording_id.into(),
            },
            submitter_id: submitter_id.into(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self.payload {
            TaskPayload::ArtistIngest { .. } => TaskKind::ArtistIngest,
            TaskPayload::SongIngest { .. } => TaskKind::SongIngest,
        }
    }

    pub fn payload(&self) -> &TaskPayload {
        &self.payload
    }

    pub fn submitter_id(&self) -> &str {
        &self.submitter_id
    }

    /// 日志中使用的任务主体：艺人名或录音ID
    pub fn subject(&self) -> &str {
        match &self.payload {
            TaskPayload::ArtistIngest { artist_name } => artist_name,
            TaskPayload::SongIngest { recording_id } => recording_id,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// 从Broker取出的任务及其投递ID
#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub delivery_id: String,
    pub task: Task,
}
