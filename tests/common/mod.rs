//! 端到端测试共用的内存协作方

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use ingest_core::{
    Arrangement, ArrangementDraft, ArrangementGenerator, IngestError, IngestResult,
    MetadataLookup, NewWork, QueuedTask, RecordingDetails, RecordingSummary, Task, TaskQueue,
    Work, WorkRepository,
};
use ingest_pipeline::Collaborators;

/// 一位艺人和若干录音的元数据服务
pub struct FakeMetadata {
    artist: String,
    recordings: Vec<String>,
}

impl FakeMetadata {
    pub fn new(artist: &str, recordings: &[&str]) -> Self {
        Self {
            artist: artist.to_string(),
            recordings: recordings.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[async_trait]
impl MetadataLookup for FakeMetadata {
    async fn search_by_artist(
        &self,
        artist_name: &str,
        limit: usize,
    ) -> IngestResult<Vec<RecordingSummary>> {
        if artist_name != self.artist {
            return Ok(vec![]);
        }
        Ok(self
            .recordings
            .iter()
            .take(limit)
            .map(|id| RecordingSummary {
                id: id.clone(),
                title: format!("Song {id}"),
                artist: self.artist.clone(),
                duration_ms: Some(180_000),
            })
            .collect())
    }

    async fn get_details_by_id(&self, recording_id: &str) -> IngestResult<Option<RecordingDetails>> {
        Ok(self
            .recordings
            .iter()
            .find(|id| *id == recording_id)
            .map(|id| RecordingDetails {
                id: id.clone(),
                title: format!("Song {id}"),
                artist: self.artist.clone(),
                duration_sec: Some(180),
            }))
    }
}

pub struct FakeGenerator;

#[async_trait]
impl ArrangementGenerator for FakeGenerator {
    async fn generate(&self, _recording_id: &str) -> IngestResult<ArrangementDraft> {
        Ok(ArrangementDraft {
            sections: vec![],
            key: Some("G".to_string()),
            bpm: Some(100.0),
        })
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    works: Mutex<HashMap<String, Work>>,
    arrangements: Mutex<Vec<Arrangement>>,
}

impl MemoryRepository {
    pub fn work_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.works.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn arrangement_count(&self) -> usize {
        self.arrangements.lock().unwrap().len()
    }

    pub fn versions_for(&self, external_id: &str) -> Vec<i64> {
        let Some(work_id) = self.works.lock().unwrap().get(external_id).map(|w| w.id) else {
            return vec![];
        };
        self.arrangements
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.work_id == work_id)
            .map(|a| a.version)
            .collect()
    }
}

#[async_trait]
impl WorkRepository for MemoryRepository {
    async fn create_or_find_work(&self, work: &NewWork) -> IngestResult<Work> {
        let mut works = self.works.lock().unwrap();
        let next_id = works.len() as i64 + 1;
        Ok(works
            .entry(work.external_id.clone())
            .or_insert_with(|| Work {
                id: next_id,
                title: work.title.clone(),
                artist: work.artist.clone(),
                external_id: work.external_id.clone(),
                created_at: Utc::now(),
            })
            .clone())
    }

    async fn append_arrangement(
        &self,
        work_id: i64,
        submitter_id: &str,
        draft: &ArrangementDraft,
    ) -> IngestResult<Arrangement> {
        let mut arrangements = self.arrangements.lock().unwrap();
        let version = arrangements.iter().filter(|a| a.work_id == work_id).count() as i64 + 1;
        let arrangement = Arrangement {
            id: arrangements.len() as i64 + 1,
            work_id,
            version,
            submitter_id: submitter_id.to_string(),
            sections: draft.sections.clone(),
            key: draft.key.clone(),
            bpm: draft.bpm,
            created_at: Utc::now(),
        };
        arrangements.push(arrangement.clone());
        Ok(arrangement)
    }
}

/// 进程内的消息代理，可模拟不可达
#[derive(Default)]
pub struct MemoryQueue {
    pending: Mutex<VecDeque<QueuedTask>>,
    next_id: AtomicUsize,
    pub published: Mutex<Vec<Task>>,
    pub acked: Mutex<Vec<String>>,
    pub unreachable: AtomicBool,
    pub closed: AtomicBool,
}

impl MemoryQueue {
    pub fn unreachable() -> Arc<Self> {
        let queue = Self::default();
        queue.unreachable.store(true, Ordering::SeqCst);
        Arc::new(queue)
    }

    fn check_reachable(&self) -> IngestResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(IngestError::broker("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn publish_task(&self, task: &Task) -> IngestResult<String> {
        self.check_reachable()?;
        let delivery_id = format!("{}-0", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.published.lock().unwrap().push(task.clone());
        self.pending.lock().unwrap().push_back(QueuedTask {
            delivery_id: delivery_id.clone(),
            task: task.clone(),
        });
        Ok(delivery_id)
    }

    async fn consume_tasks(&self, max: usize) -> IngestResult<Vec<QueuedTask>> {
        self.check_reachable()?;
        let mut pending = self.pending.lock().unwrap();
        let count = max.min(pending.len());
        Ok(pending.drain(..count).collect())
    }

    async fn ack_task(&self, delivery_id: &str) -> IngestResult<()> {
        self.acked.lock().unwrap().push(delivery_id.to_string());
        Ok(())
    }

    async fn health_check(&self) -> IngestResult<()> {
        self.check_reachable()
    }

    async fn close(&self) -> IngestResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

pub fn collaborators(
    metadata: FakeMetadata,
    repository: Arc<MemoryRepository>,
) -> Collaborators {
    Collaborators {
        metadata: Arc::new(metadata),
        generator: Arc::new(FakeGenerator),
        repository,
    }
}
