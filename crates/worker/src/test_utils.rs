//! 处理器测试使用的协作方Mock

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ingest_core::{
    Arrangement, ArrangementDraft, ArrangementGenerator, ArrangementSection, ExecutionMode,
    IngestError, IngestResult, MetadataLookup, NewWork, RecordingDetails, RecordingSummary, Task,
    TaskSubmitter, Work, WorkRepository,
};
use tokio::time::Instant;

use crate::handlers::{HandlerConfig, IngestHandlers};

pub fn recording(id: &str) -> RecordingSummary {
    RecordingSummary {
        id: id.to_string(),
        title: format!("Title {id}"),
        artist: "Test Artist".to_string(),
        duration_ms: Some(200_000),
    }
}

pub fn details(id: &str, title: &str) -> RecordingDetails {
    RecordingDetails {
        id: id.to_string(),
        title: title.to_string(),
        artist: "Test Artist".to_string(),
        duration_sec: Some(200),
    }
}

#[derive(Default)]
pub struct MockMetadata {
    pub recordings: Vec<RecordingSummary>,
    pub details: HashMap<String, RecordingDetails>,
    pub search_error: Option<String>,
    pub searches: Mutex<Vec<(String, usize)>>,
}

impl MockMetadata {
    pub fn with_recordings(recordings: Vec<RecordingSummary>) -> Arc<Self> {
        Arc::new(Self {
            recordings,
            ..Self::default()
        })
    }

    pub fn with_details(details: Vec<RecordingDetails>) -> Arc<Self> {
        Arc::new(Self {
            details: details.into_iter().map(|d| (d.id.clone(), d)).collect(),
            ..Self::default()
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            search_error: Some(message.to_string()),
            ..Self::default()
        })
    }
}

#[async_trait]
impl MetadataLookup for MockMetadata {
    async fn search_by_artist(
        &self,
        artist_name: &str,
        limit: usize,
    ) -> IngestResult<Vec<RecordingSummary>> {
        self.searches
            .lock()
            .unwrap()
            .push((artist_name.to_string(), limit));
        if let Some(message) = &self.search_error {
            return Err(IngestError::Metadata(message.clone()));
        }
        Ok(self.recordings.iter().take(limit).cloned().collect())
    }

    async fn get_details_by_id(&self, recording_id: &str) -> IngestResult<Option<RecordingDetails>> {
        Ok(self.details.get(recording_id).cloned())
    }
}

#[derive(Default)]
pub struct MockGenerator {
    pub requests: Mutex<Vec<String>>,
    pub fail: bool,
}

impl MockGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl ArrangementGenerator for MockGenerator {
    async fn generate(&self, recording_id: &str) -> IngestResult<ArrangementDraft> {
        self.requests.lock().unwrap().push(recording_id.to_string());
        if self.fail {
            return Err(IngestError::Generation("model unavailable".to_string()));
        }
        Ok(ArrangementDraft {
            sections: vec![ArrangementSection {
                name: "Verse".to_string(),
                bars: Some(8),
                chords: vec!["C".to_string(), "G".to_string()],
            }],
            key: Some("C".to_string()),
            bpm: Some(120.0),
        })
    }
}

/// 内存持久化：按外部ID去重，编曲版本按作品递增
#[derive(Default)]
pub struct MockRepository {
    pub works: Mutex<Vec<Work>>,
    pub created: Mutex<Vec<NewWork>>,
    pub appended: Mutex<Vec<Arrangement>>,
}

impl MockRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn work_count(&self) -> usize {
        self.works.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkRepository for MockRepository {
    async fn create_or_find_work(&self, work: &NewWork) -> IngestResult<Work> {
        self.created.lock().unwrap().push(work.clone());
        let mut works = self.works.lock().unwrap();
        if let Some(existing) = works.iter().find(|w| w.external_id == work.external_id) {
            return Ok(existing.clone());
        }
        let created = Work {
            id: works.len() as i64 + 1,
            title: work.title.clone(),
            artist: work.artist.clone(),
            external_id: work.external_id.clone(),
            created_at: Utc::now(),
        };
        works.push(created.clone());
        Ok(created)
    }

    async fn append_arrangement(
        &self,
        work_id: i64,
        submitter_id: &str,
        draft: &ArrangementDraft,
    ) -> IngestResult<Arrangement> {
        let mut appended = self.appended.lock().unwrap();
        let version = appended.iter().filter(|a| a.work_id == work_id).count() as i64 + 1;
        let arrangement = Arrangement {
            id: appended.len() as i64 + 1,
            work_id,
            version,
            submitter_id: submitter_id.to_string(),
            sections: draft.sections.clone(),
            key: draft.key.clone(),
            bpm: draft.bpm,
            created_at: Utc::now(),
        };
        appended.push(arrangement.clone());
        Ok(arrangement)
    }
}

/// 记录扇出提交的Submitter，可在若干次提交后切换为Fallback
pub struct RecordingSubmitter {
    initial: ExecutionMode,
    pub fallback_after: AtomicUsize,
    submitted: Mutex<Vec<(Task, Instant)>>,
}

impl RecordingSubmitter {
    pub fn new(mode: ExecutionMode) -> Arc<Self> {
        Arc::new(Self {
            initial: mode,
            fallback_after: AtomicUsize::new(usize::MAX),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn submitted(&self) -> Vec<Task> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|(task, _)| task.clone())
            .collect()
    }

    pub fn submitted_at(&self) -> Vec<Instant> {
        self.submitted.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

impl TaskSubmitter for RecordingSubmitter {
    fn submit(&self, task: Task) {
        self.submitted.lock().unwrap().push((task, Instant::now()));
    }

    fn mode(&self) -> ExecutionMode {
        let count = self.submitted.lock().unwrap().len();
        if count >= self.fallback_after.load(Ordering::SeqCst) {
            ExecutionMode::Fallback
        } else {
            self.initial
        }
    }
}

pub fn handlers_with(
    metadata: Arc<MockMetadata>,
    fanout_delay: Duration,
) -> (IngestHandlers, Arc<MockGenerator>, Arc<MockRepository>) {
    let generator = MockGenerator::new();
    let repository = MockRepository::new();
    let handlers = handlers_with_parts(metadata, generator.clone(), repository.clone(), fanout_delay);
    (handlers, generator, repository)
}

pub fn handlers_with_parts(
    metadata: Arc<MockMetadata>,
    generator: Arc<MockGenerator>,
    repository: Arc<MockRepository>,
    fanout_delay: Duration,
) -> IngestHandlers {
    IngestHandlers::new(
        metadata,
        generator,
        repository,
        HandlerConfig {
            fallback_fanout_delay: fanout_delay,
            ..HandlerConfig::default()
        },
    )
}

/// 预置了若干投递的消息代理Mock
#[derive(Default)]
pub struct MockBrokerQueue {
    pending: Mutex<std::collections::VecDeque<ingest_core::QueuedTask>>,
    pub acked: Mutex<Vec<String>>,
}

impl MockBrokerQueue {
    pub fn with_tasks(tasks: Vec<Task>) -> Arc<Self> {
        let pending = tasks
            .into_iter()
            .enumerate()
            .map(|(i, task)| ingest_core::QueuedTask {
                delivery_id: format!("delivery-{i}"),
                task,
            })
            .collect();
        Arc::new(Self {
            pending: Mutex::new(pending),
            acked: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ingest_core::TaskQueue for MockBrokerQueue {
    async fn publish_task(&self, _task: &Task) -> IngestResult<String> {
        Ok("unused".to_string())
    }

    async fn consume_tasks(&self, max: usize) -> IngestResult<Vec<ingest_core::QueuedTask>> {
        let mut pending = self.pending.lock().unwrap();
        let count = max.min(pending.len());
        Ok(pending.drain(..count).collect())
    }

    async fn ack_task(&self, delivery_id: &str) -> IngestResult<()> {
        self.acked.lock().unwrap().push(delivery_id.to_string());
        Ok(())
    }

    async fn health_check(&self) -> IngestResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// 带执行耗时的处理器，统计最大并发数
#[derive(Default)]
pub struct SlowHandler {
    delay: Duration,
    failing: Vec<String>,
    in_flight: AtomicUsize,
    pub handled: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl SlowHandler {
    pub fn failing_on(delay: Duration, subjects: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            delay,
            failing: subjects.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        })
    }
}

#[async_trait]
impl ingest_core::TaskHandler for SlowHandler {
    async fn handle(
        &self,
        task: &Task,
        _submitter: Arc<dyn TaskSubmitter>,
    ) -> IngestResult<ingest_core::TaskOutcome> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.handled.fetch_add(1, Ordering::SeqCst);

        if self.failing.iter().any(|s| s == task.subject()) {
            return Err(IngestError::recording_not_found(task.subject()));
        }
        Ok(ingest_core::TaskOutcome::SongIngest(
            ingest_core::SongIngestOutcome {
                recording_id: task.subject().to_string(),
                success: true,
            },
        ))
    }
}
