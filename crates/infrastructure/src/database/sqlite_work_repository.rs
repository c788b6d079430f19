use async_trait::async_trait;
use chrono::Utc;
use ingest_core::{
    Arrangement, ArrangementDraft, ArrangementSection, IngestError, IngestResult, NewWork, Work,
    WorkRepository,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

/// 基于SQLite的作品与编曲持久化
///
/// `works.external_id` 唯一约束保证一个录音只有一条作品；
/// 编曲版本由单条 `INSERT … SELECT MAX(version) + 1` 语句分配，并由 `(work_id, version)` 唯一约束兜底。
pub struct SqliteWorkRepository {
    pool: SqlitePool,
}

impl SqliteWorkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_work(row: &SqliteRow) -> IngestResult<Work> {
        Ok(Work {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            artist: row.try_get("artist")?,
            external_id: row.try_get("external_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// 查询作品的全部编曲，按版本升序
    pub async fn list_arrangements(&self, work_id: i64) -> IngestResult<Vec<Arrangement>> {
        let rows = sqlx::query(
            "SELECT id, work_id, version, submitter_id, sections, music_key, bpm, created_at FROM arrangements WHERE work_id = $1 ORDER BY version",
        )
        .bind(work_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> IngestResult<Arrangement> {
                let sections: String = row.try_get("sections")?;
                Ok(Arrangement {
                    id: row.try_get("id")?,
                    work_id: row.try_get("work_id")?,
                    version: row.try_get("version")?,
                    submitter_id: row.try_get("submitter_id")?,
                    sections: serde_json::from_str::<Vec<ArrangementSection>>(&sections)?,
                    key: row.try_get("music_key")?,
                    bpm: row.try_get("bpm")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    pub async fn find_work_by_external_id(&self, external_id: &str) -> IngestResult<Option<Work>> {
        let row = sqlx::query(
            "SELECT id, title, artist, external_id, created_at FROM works WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_work).transpose()
    }
}

#[async_trait]
impl WorkRepository for SqliteWorkRepository {
    async fn create_or_find_work(&self, work: &NewWork) -> IngestResult<Work> {
        let result = sqlx::query(
            r#"
            INSERT INTO works (title, artist, external_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(external_id) DO NOTHING
            "#,
        )
        .bind(&work.title)
        .bind(&work.artist)
        .bind(&work.external_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            debug!("创建作品: {}", work.external_id);
        }

        self.find_work_by_external_id(&work.external_id)
            .await?
            .ok_or_else(|| {
                IngestError::Persistence(format!("作品写入后未找到: {}", work.external_id))
            })
    }

    async fn append_arrangement(
        &self,
        work_id: i64,
        submitter_id: &str,
        draft: &ArrangementDraft,
    ) -> IngestResult<Arrangement> {
        let sections = serde_json::to_string(&draft.sections)?;
        let created_at = Utc::now();

        // 版本号在同一条写语句内计算，写锁在语句开始时获取
        let row = sqlx::query(
            r#"
            INSERT INTO arrangements (work_id, version, submitter_id, sections, music_key, bpm, created_at)
            SELECT $1, COALESCE(MAX(version), 0) + 1, $2, $3, $4, $5, $6
            FROM arrangements WHERE work_id = $1
            RETURNING id, version
            "#,
        )
        .bind(work_id)
        .bind(submitter_id)
        .bind(&sections)
        .bind(&draft.key)
        .bind(draft.bpm)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.try_get("id")?;
        let version: i64 = row.try_get("version")?;
        debug!("作品 {} 新增编曲版本 {}", work_id, version);

        Ok(Arrangement {
            id,
            work_id,
            version,
            submitter_id: submitter_id.to_string(),
            sections: draft.sections.clone(),
            key: draft.key.clone(),
            bpm: draft.bpm,
            created_at,
        })
    }
}
