//! MusicBrainz元数据客户端
//!
//! MusicBrainz要求每个客户端每秒不超过一次请求，并携带可识别的User-Agent。

use std::time::Duration;

use async_trait::async_trait;
use ingest_core::{
    config::MetadataConfig, IngestError, IngestResult, MetadataLookup, RecordingDetails,
    RecordingSummary,
};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    recordings: Vec<MbRecording>,
}

#[derive(Debug, Deserialize)]
struct MbRecording {
    id: String,
    title: String,
    length: Option<u64>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<MbArtistCredit>,
}

#[derive(Debug, Deserialize)]
struct MbArtistCredit {
    name: String,
    #[serde(default)]
    joinphrase: String,
}

impl MbRecording {
    fn artist(&self) -> String {
        self.artist_credit
            .iter()
            .map(|credit| format!("{}{}", credit.name, credit.joinphrase))
            .collect()
    }

    fn into_summary(self) -> RecordingSummary {
        RecordingSummary {
            artist: self.artist(),
            id: self.id,
            title: self.title,
            duration_ms: self.length,
        }
    }

    fn into_details(self) -> RecordingDetails {
        RecordingDetails {
            artist: self.artist(),
            duration_sec: self.length.map(|ms| ms / 1000),
            id: self.id,
            title: self.title,
        }
    }
}

/// 保证相邻请求之间至少间隔 `min_interval`
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("MusicBrainz限流，等待 {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    recording_url: Url,
    rate_limiter: RateLimiter,
}

impl MusicBrainzClient {
    pub fn new(config: &MetadataConfig) -> IngestResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| IngestError::Network(format!("创建HTTP客户端失败: {e}")))?;

        let base_url = config.base_url.trim_end_matches('/');
        let recording_url = Url::parse(&format!("{base_url}/recording"))
            .map_err(|e| IngestError::config_error(format!("无效的MusicBrainz地址 {base_url}: {e}")))?;

        Ok(Self {
            http_client,
            recording_url,
            rate_limiter: RateLimiter::new(Duration::from_millis(config.min_request_interval_ms)),
        })
    }

    async fn get(&self, url: Url, query: &[(&str, String)]) -> IngestResult<reqwest::Response> {
        self.rate_limiter.wait().await;
        metrics::counter!("ingest_metadata_requests_total").increment(1);

        self.http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| IngestError::Network(format!("请求MusicBrainz失败: {e}")))
    }
}

async fn error_body(response: reqwest::Response) -> IngestError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    IngestError::Metadata(format!("MusicBrainz返回 {status}: {body}"))
}

#[async_trait]
impl MetadataLookup for MusicBrainzClient {
    async fn search_by_artist(
        &self,
        artist_name: &str,
        limit: usize,
    ) -> IngestResult<Vec<RecordingSummary>> {
        let escaped = artist_name.replace('"', "\\\"");
        debug!(artist = %artist_name, limit, "搜索艺人录音");

        let response = self
            .get(
                self.recording_url.clone(),
                &[
                    ("query", format!("artist:\"{escaped}\"")),
                    ("limit", limit.to_string()),
                    ("fmt", "json".to_string()),
                ],
            )
            .await?;

        if !response.status().is_success() {
            return Err(error_body(response).await);
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| IngestError::Metadata(format!("解析搜索结果失败: {e}")))?;

        Ok(search
            .recordings
            .into_iter()
            .take(limit)
            .map(MbRecording::into_summary)
            .collect())
    }

    async fn get_details_by_id(&self, recording_id: &str) -> IngestResult<Option<RecordingDetails>> {
        // ID作为单个路径段编码，其中的 `/` 与 `?` 不会改变请求路径
        let mut url = self.recording_url.clone();
        url.path_segments_mut()
            .map_err(|_| IngestError::config_error("MusicBrainz地址不能作为路径前缀"))?
            .push(recording_id);
        debug!(recording_id = %recording_id, "查询录音详情");

        let response = self
            .get(
                url,
                &[
                    ("inc", "artist-credits".to_string()),
                    ("fmt", "json".to_string()),
                ],
            )
            .await?;

        match response.status() {
            // MusicBrainz对格式错误的MBID返回400
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => return Ok(None),
            status if !status.is_success() => return Err(error_body(response).await),
            _ => {}
        }

        let recording: MbRecording = response
            .json()
            .await
            .map_err(|e| IngestError::Metadata(format!("解析录音详情失败: {e}")))?;

        Ok(Some(recording.into_details()))
    }
}
